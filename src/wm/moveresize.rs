//! MoveResize Module
//!
//! Interactive drag (move), sweep (resize) and the info display. Each is a
//! small state machine advanced one event at a time by the event loop,
//! never a blocking loop of its own.

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::shared::{Geometry, Point, Rect};
use crate::wm::annotations::{ContextKind, Phase};
use crate::wm::client::ClientId;
use crate::wm::display::{DisplayServer, PointerCursor};
use crate::wm::hints::SizeHints;
use crate::wm::WindowManager;

/// Interactive operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabKind {
    /// Moving the client
    Drag,
    /// Resizing the client
    Sweep,
}

/// A pointer grab in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grab {
    pub client: ClientId,
    pub kind: GrabKind,
    /// Client screen position when the grab began
    pub anchor: Point,
    /// Pointer screen position when the grab began
    pub pointer: Point,
}

/// What the user is doing to a client right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interaction {
    #[default]
    Idle,
    /// Pointer grabbed, no motion seen yet
    Armed(Grab),
    /// Following the pointer
    Previewing(Grab),
    /// Info shown until the key is released
    Inspecting {
        client: ClientId,
        keycode: u8,
        /// Auto-repeat setting to restore afterwards
        auto_repeat: bool,
        /// Time of a release that may still turn out to be auto-repeat
        release: Option<Timestamp>,
    },
}

impl Interaction {
    pub fn client(&self) -> Option<ClientId> {
        match *self {
            Interaction::Idle => None,
            Interaction::Armed(grab) | Interaction::Previewing(grab) => Some(grab.client),
            Interaction::Inspecting { client, .. } => Some(client),
        }
    }

    pub fn grab(&self) -> Option<Grab> {
        match *self {
            Interaction::Armed(grab) | Interaction::Previewing(grab) => Some(grab),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Interaction::Idle
    }
}

/// Resize `g` so one corner stays at `anchor` and the opposite one follows
/// `pointer`. Everything is in logical-screen coordinates.
///
/// Sizes honour the increment, minimum and maximum hints. A maximised axis
/// (non-zero `prev` size) is left alone unless `force` is set, in which
/// case it is resized and stops counting as maximised.
pub fn recalculate_sweep(
    g: &mut Geometry,
    prev: &mut Geometry,
    hints: &SizeHints,
    anchor: Point,
    pointer: Point,
    force: bool,
) {
    fn axis(anchor: i32, pointer: i32, base: i32, inc: i32, min: i32, max: i32) -> (i32, i32) {
        let mut size = (anchor - pointer).abs();
        size -= (size - base) % inc;
        if min != 0 && size < min {
            size = min;
        }
        if max != 0 && size > max {
            size = max;
        }
        let pos = if anchor <= pointer { anchor } else { anchor - size };
        (pos, size)
    }

    if force || prev.width == 0 {
        prev.width = 0;
        (g.x, g.width) = axis(
            anchor.x,
            pointer.x,
            hints.base_width,
            hints.width_inc,
            hints.min_width,
            hints.max_width,
        );
    }
    if force || prev.height == 0 {
        prev.height = 0;
        (g.y, g.height) = axis(
            anchor.y,
            pointer.y,
            hints.base_height,
            hints.height_inc,
            hints.min_height,
            hints.max_height,
        );
    }
}

impl<D: DisplayServer> WindowManager<D> {
    fn client_root(&self, id: ClientId) -> Option<Window> {
        let client = self.clients.get(id)?;
        self.screens.get(client.screen).map(|s| s.root)
    }

    /// Start moving a client with the pointer.
    pub fn drag(&mut self, id: ClientId) -> Result<()> {
        if !self.interaction.is_idle() {
            return Ok(());
        }
        let (Some(root), Some(anchor)) = (self.client_root(id), self.screen_position(id)) else {
            return Ok(());
        };
        if !self.display.grab_pointer(root, PointerCursor::Move)? {
            debug!("Pointer grab refused, not dragging");
            return Ok(());
        }
        self.client_raise(id)?;
        let pointer = self.display.query_pointer(root)?.position;
        self.annotate(id, ContextKind::Drag, Phase::Create)?;
        debug!("Drag started at {:?}", anchor);
        self.interaction = Interaction::Armed(Grab {
            client: id,
            kind: GrabKind::Drag,
            anchor,
            pointer,
        });
        Ok(())
    }

    /// Start resizing a client with the pointer. The pointer is warped to
    /// the client's bottom-right corner.
    pub fn sweep(&mut self, id: ClientId) -> Result<()> {
        if !self.interaction.is_idle() {
            return Ok(());
        }
        let (Some(root), Some(anchor)) = (self.client_root(id), self.screen_position(id)) else {
            return Ok(());
        };
        if !self.display.grab_pointer(root, PointerCursor::Resize)? {
            debug!("Pointer grab refused, not sweeping");
            return Ok(());
        }
        self.client_raise(id)?;
        self.annotate(id, ContextKind::Sweep, Phase::Create)?;
        if let Some(client) = self.clients.get(id) {
            let (window, g) = (client.window, client.current);
            self.display.warp_pointer(window, g.width, g.height)?;
        }
        debug!("Sweep started at {:?}", anchor);
        self.interaction = Interaction::Armed(Grab {
            client: id,
            kind: GrabKind::Sweep,
            anchor,
            pointer: anchor,
        });
        Ok(())
    }

    /// Pointer motion on `root` while a grab is active.
    pub fn handle_motion(&mut self, root: Window, pointer: Point, state: u16) -> Result<()> {
        let Some(grab) = self.interaction.grab() else {
            return Ok(());
        };
        if self.client_root(grab.client) != Some(root) {
            return Ok(());
        }
        self.interaction = Interaction::Previewing(grab);
        let force = state & self.bindings.alt_mask != 0;
        match grab.kind {
            GrabKind::Drag => self.drag_motion(grab, pointer, force),
            GrabKind::Sweep => self.sweep_motion(grab, pointer, force),
        }
    }

    fn drag_motion(&mut self, grab: Grab, pointer: Point, no_snap: bool) -> Result<()> {
        let id = grab.client;
        self.annotate(id, ContextKind::Drag, Phase::Preupdate)?;
        let target = Point::new(
            grab.anchor.x + (pointer.x - grab.pointer.x),
            grab.anchor.y + (pointer.y - grab.pointer.y),
        );
        self.update_screen_position(id, target);
        self.client_calc_phy(id)?;
        if self.config.snap > 0 && !no_snap {
            self.snap_client(id);
        }

        if self.config.solid_drag {
            if let (Some(client), Some(pos)) = (self.clients.get(id), self.screen_position(id)) {
                let g = client.current;
                let b = g.border_width;
                let frame = client.frame;
                self.display
                    .move_resize_window(frame, Rect::new(pos.x - b, pos.y - b, g.width, g.height))?;
                self.send_config(id)?;
            }
        }
        self.annotate(id, ContextKind::Drag, Phase::Update)
    }

    fn sweep_motion(&mut self, grab: Grab, pointer: Point, force: bool) -> Result<()> {
        let id = grab.client;
        self.annotate(id, ContextKind::Sweep, Phase::Preupdate)?;
        let Some(output) = self.client_output(id) else {
            return Ok(());
        };
        if let Some(client) = self.clients.get_mut(id) {
            let mut g = client.current;
            g.x += output.x;
            g.y += output.y;
            let hints = client.hints;
            recalculate_sweep(&mut g, &mut client.prev, &hints, grab.anchor, pointer, force);
            g.x -= output.x;
            g.y -= output.y;
            client.current = g;
            client.recompute_cog();
        }
        self.client_calc_phy(id)?;
        self.annotate(id, ContextKind::Sweep, Phase::Update)
    }

    /// Button release ends a grab and commits the result.
    pub fn handle_button_release(&mut self) -> Result<()> {
        let Some(grab) = self.interaction.grab() else {
            return Ok(());
        };
        self.interaction = Interaction::Idle;
        let id = grab.client;
        match grab.kind {
            GrabKind::Drag => {
                self.annotate(id, ContextKind::Drag, Phase::Remove)?;
                self.display.ungrab_pointer()?;
                if !self.config.solid_drag {
                    self.moveresize_raise(id)?;
                }
            }
            GrabKind::Sweep => {
                self.annotate(id, ContextKind::Sweep, Phase::Remove)?;
                self.client_calc_phy(id)?;
                self.display.ungrab_pointer()?;
                self.moveresize_raise(id)?;
                // A forced sweep may have ended a maximise
                self.set_net_wm_state(id)?;
            }
        }
        if let Some(g) = self.clients.get(id).map(|c| c.current) {
            info!(
                "{:?} finished: {}x{}+{}+{}",
                grab.kind, g.width, g.height, g.x, g.y
            );
        }
        Ok(())
    }

    /// Show the info annotation until `keycode` is released.
    pub fn show_info(&mut self, id: ClientId, keycode: u8) -> Result<()> {
        if !self.interaction.is_idle() {
            return Ok(());
        }
        let Some(root) = self.client_root(id) else {
            return Ok(());
        };
        if !self.display.grab_keyboard(root)? {
            return Ok(());
        }
        // Newer servers may only apply this once every key is up
        let auto_repeat = self.display.auto_repeat()?;
        self.display.set_auto_repeat(false)?;
        self.annotate(id, ContextKind::Info, Phase::Create)?;
        self.interaction = Interaction::Inspecting {
            client: id,
            keycode,
            auto_repeat,
            release: None,
        };
        Ok(())
    }

    /// Key release while inspecting. The release only counts once no
    /// auto-repeat press with the same timestamp follows it in the batch.
    pub fn handle_key_release(&mut self, keycode: u8, time: Timestamp) {
        if let Interaction::Inspecting {
            keycode: held,
            ref mut release,
            ..
        } = self.interaction
        {
            if held == keycode {
                *release = Some(time);
            }
        }
    }

    /// Key press while inspecting. Returns true when the press was consumed.
    pub fn handle_inspect_key_press(&mut self, keycode: u8, time: Timestamp) -> bool {
        let Interaction::Inspecting {
            keycode: held,
            ref mut release,
            ..
        } = self.interaction
        else {
            return false;
        };
        if held == keycode && *release == Some(time) {
            debug!("Ignoring auto-repeat of key {}", keycode);
            *release = None;
        }
        true
    }

    /// End the info display if its key has really been released.
    pub fn finish_inspect(&mut self) -> Result<()> {
        if let Interaction::Inspecting {
            client,
            auto_repeat,
            release: Some(_),
            ..
        } = self.interaction
        {
            self.interaction = Interaction::Idle;
            self.end_inspect(client, auto_repeat)?;
        }
        Ok(())
    }

    fn end_inspect(&mut self, id: ClientId, auto_repeat: bool) -> Result<()> {
        self.annotate(id, ContextKind::Info, Phase::Remove)?;
        self.display.set_auto_repeat(auto_repeat)?;
        self.display.ungrab_keyboard()
    }

    /// Drop an operation on a client that is going away, without
    /// committing anything.
    pub(crate) fn abort_interaction(&mut self, id: ClientId) -> Result<()> {
        if self.interaction.client() != Some(id) {
            return Ok(());
        }
        let interaction = std::mem::take(&mut self.interaction);
        debug!("Aborting {:?}", interaction);
        match interaction {
            Interaction::Armed(grab) | Interaction::Previewing(grab) => {
                let kind = match grab.kind {
                    GrabKind::Drag => ContextKind::Drag,
                    GrabKind::Sweep => ContextKind::Sweep,
                };
                self.annotate(id, kind, Phase::Remove)?;
                self.display.ungrab_pointer()
            }
            Interaction::Inspecting { auto_repeat, .. } => self.end_inspect(id, auto_repeat),
            Interaction::Idle => Ok(()),
        }
    }
}
