//! Hints Module
//!
//! WM_NORMAL_HINTS (XSizeHints) decoding and window gravity.

use tracing::debug;

// XSizeHints flag bits
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;

/// Reference point a client asks to be kept fixed when its border changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    /// Decode the X11 `win_gravity` value. Unknown values act as NorthWest.
    pub fn from_x11(value: u32) -> Self {
        match value {
            1 => Gravity::NorthWest,
            2 => Gravity::North,
            3 => Gravity::NorthEast,
            4 => Gravity::West,
            5 => Gravity::Center,
            6 => Gravity::East,
            7 => Gravity::SouthWest,
            8 => Gravity::South,
            9 => Gravity::SouthEast,
            10 => Gravity::Static,
            _ => Gravity::NorthWest,
        }
    }

    /// Direction (per axis, -1/0/1) a positive border change shifts the
    /// client to keep the reference point in place.
    pub fn border_shift(self) -> (i32, i32) {
        match self {
            Gravity::NorthWest | Gravity::Static => (1, 1),
            Gravity::North => (0, 1),
            Gravity::NorthEast => (-1, 1),
            Gravity::West => (1, 0),
            Gravity::Center => (0, 0),
            Gravity::East => (-1, 0),
            Gravity::SouthWest => (1, -1),
            Gravity::South => (0, -1),
            Gravity::SouthEast => (-1, -1),
        }
    }
}

/// The subset of XSizeHints the window manager honours.
///
/// Zero min/max means "no constraint". Increments are never below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            min_width: 0,
            min_height: 0,
            max_width: 0,
            max_height: 0,
            width_inc: 1,
            height_inc: 1,
            base_width: 0,
            base_height: 0,
            win_gravity: Gravity::NorthWest,
        }
    }
}

impl SizeHints {
    /// Decode the 18 CARDINALs of a WM_NORMAL_HINTS property.
    ///
    /// Short or missing properties give the defaults.
    pub fn from_wm_normal_hints(values: &[u32]) -> Self {
        let mut hints = Self::default();
        if values.len() < 18 {
            debug!("WM_NORMAL_HINTS too short ({} values), using defaults", values.len());
            return hints;
        }
        let flags = values[0];
        let field = |i: usize| values[i] as i32;

        if flags & P_MIN_SIZE != 0 {
            hints.min_width = field(5).max(0);
            hints.min_height = field(6).max(0);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_width = field(7).max(0);
            hints.max_height = field(8).max(0);
        }
        if flags & P_RESIZE_INC != 0 {
            hints.width_inc = field(9).max(1);
            hints.height_inc = field(10).max(1);
        }
        if flags & P_BASE_SIZE != 0 {
            hints.base_width = field(15).max(0);
            hints.base_height = field(16).max(0);
        } else if flags & P_MIN_SIZE != 0 {
            // ICCCM: base size defaults to the minimum size
            hints.base_width = hints.min_width;
            hints.base_height = hints.min_height;
        }
        if flags & P_WIN_GRAVITY != 0 {
            hints.win_gravity = Gravity::from_x11(values[17]);
        }
        hints
    }

    /// Size in resize increments above the base size, as shown to the user.
    pub fn logical_size(&self, width: i32, height: i32) -> (i32, i32) {
        (
            (width - self.base_width) / self.width_inc,
            (height - self.base_height) / self.height_inc,
        )
    }
}
