//! Client Flags
//!
//! Maximise axis flags and the ternary state action used by `_NET_WM_STATE`.

use bitflags::bitflags;

bitflags! {
    /// Axes a maximise request applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaximiseFlags: u32 {
        const HORZ       = 1 << 0;
        const VERT       = 1 << 1;
        /// Both axes, border removed
        const FULLSCREEN = 1 << 2;
    }
}

/// `_NET_WM_STATE` action, as carried in `data[0]` of the client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_x11(value: u32) -> Option<Self> {
        match value {
            0 => Some(StateAction::Remove),
            1 => Some(StateAction::Add),
            2 => Some(StateAction::Toggle),
            _ => None,
        }
    }
}
