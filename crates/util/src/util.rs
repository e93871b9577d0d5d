//! Shared utilities for SSH-UI.

/// Panic in debug builds, log error with backtrace in release.
///
/// For invariants such as "a session id is registered twice" that should
/// fail loudly in tests but never take the application down in production.
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!("{}\n{:?}", format_args!($($fmt_arg)*), backtrace);
        }
    };
}
