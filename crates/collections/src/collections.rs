//! Hash collections used across SSH-UI.
//!
//! Session ids are small `Copy` keys, so the registry uses FxHash instead of
//! the DoS-resistant default hasher.

pub use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
