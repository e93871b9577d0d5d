//! Where a new session window goes on screen.

use settings::constants::window;

/// A screen-space rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Center a `width` x `height` window on `screen`. A window larger than the
/// screen is pinned to the screen origin on that axis.
pub fn centered_in(screen: Bounds, width: u32, height: u32) -> Bounds {
    let x = screen
        .x
        .saturating_add((screen.width.saturating_sub(width) / 2) as i32);
    let y = screen
        .y
        .saturating_add((screen.height.saturating_sub(height) / 2) as i32);
    Bounds::new(x, y, width, height)
}

/// Bounds for a new session window, centered on the parent's screen when
/// it is known.
pub fn place(parent_screen: Option<Bounds>, width: u32, height: u32) -> Bounds {
    match parent_screen {
        Some(screen) => centered_in(screen, width, height),
        None => Bounds::new(window::DEFAULT_X, window::DEFAULT_Y, width, height),
    }
}
