//! Geometry primitives shared by every part of the window manager.
//!
//! Client geometry is always kept in the frame of the output the client sits
//! on; conversion to logical-screen coordinates happens at the edges (drawing,
//! configure notifications, pointer input).

/// Position, size and border thickness of a client window.
///
/// `x`/`y` locate the client area (inside the border) relative to the origin
/// of the owning output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub border_width: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32, border_width: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            border_width,
        }
    }

    /// Centre of gravity, relative to the top-left of the client area.
    pub fn centre(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }

    /// Width including both borders.
    pub fn outer_width(&self) -> i32 {
        self.width + 2 * self.border_width
    }

    /// Height including both borders.
    pub fn outer_height(&self) -> i32 {
        self.height + 2 * self.border_width
    }
}

/// A point in some coordinate frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Plain rectangle, used for output regions reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges belong to the
    /// neighbouring region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// True when `self` lies entirely inside `other` (edges may touch).
    pub fn is_within(&self, other: &Rect) -> bool {
        self.x >= other.x
            && self.y >= other.y
            && self.x + self.width <= other.x + other.width
            && self.y + self.height <= other.y + other.height
    }

    pub fn centre(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// True when the spans `[a, a+alen)` and `[b, b+blen)` share at least one
/// pixel, or are identical.
pub fn spans_overlap(a: i32, alen: i32, b: i32, blen: i32) -> bool {
    (a == b && alen == blen) || (a + alen).min(b + blen) - a.max(b) > 0
}
