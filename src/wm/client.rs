//! Client Module
//!
//! A client is one managed top-level window together with the frame the
//! window manager wraps it in.

use x11rb::protocol::xproto::Window;

use crate::shared::{Geometry, Point};
use crate::wm::hints::SizeHints;
use crate::wm::screen::{Desktop, Output};

/// Stable handle for a client in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Window Manager client state
#[derive(Debug, Clone)]
pub struct Client {
    /// Application window
    pub window: Window,

    /// Frame window carrying the border
    pub frame: Window,

    /// Index of the logical screen
    pub screen: usize,

    /// Index of the governing output within the screen
    pub output: usize,

    pub vdesk: Desktop,

    /// Geometry relative to the governing output
    pub current: Geometry,

    /// Pre-maximise position and size. A non-zero width (height) means the
    /// client is maximised horizontally (vertically).
    pub prev: Geometry,

    /// Cached centre of gravity, relative to the client's top-left
    pub cog: Point,

    pub hints: SizeHints,

    /// Border width saved while fullscreen
    pub old_border: i32,

    /// Fullscreen: border taken away on top of both axes maximised
    pub fullscreen: bool,

    /// Border width the window had before it was managed
    pub orig_border: i32,

    pub is_dock: bool,

    /// Unmap notifications to swallow (caused by our own hiding)
    pub ignore_unmap: u32,

    /// Flagged for removal by the error path; swept by the next tidy
    pub remove: bool,
}

impl Client {
    pub fn new(window: Window, frame: Window, screen: usize, geometry: Geometry) -> Self {
        let mut client = Self {
            window,
            frame,
            screen,
            output: 0,
            vdesk: Desktop::Index(0),
            current: geometry,
            prev: Geometry::default(),
            cog: Point::default(),
            hints: SizeHints::default(),
            old_border: geometry.border_width,
            fullscreen: false,
            orig_border: 0,
            is_dock: false,
            ignore_unmap: 0,
            remove: false,
        };
        client.recompute_cog();
        client
    }

    /// Recalculate the centre of gravity from the current geometry.
    pub fn recompute_cog(&mut self) {
        self.cog = self.current.centre();
    }

    /// Client position in logical-screen coordinates.
    pub fn screen_pos(&self, output: &Output) -> Point {
        Point::new(output.x + self.current.x, output.y + self.current.y)
    }

    pub fn is_fixed(&self) -> bool {
        self.vdesk.is_fixed()
    }

    pub fn is_maximised_horz(&self) -> bool {
        self.prev.width != 0
    }

    pub fn is_maximised_vert(&self) -> bool {
        self.prev.height != 0
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}
