//! Events Module
//!
//! Routes X11 events to window manager operations. Handlers never fail the
//! event loop: errors are logged and the next event is processed.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::randr::{self, ScreenChangeNotifyEvent};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;

use crate::shared::Point;
use crate::wm::client::ClientId;
use crate::wm::client_flags::{MaximiseFlags, StateAction};
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::hints::SizeHints;
use crate::wm::keyboard::{ButtonAction, KeyAction};
use crate::wm::placement::frame_extents;
use crate::wm::screen::Desktop;
use crate::wm::WindowManager;

/// Window an event is about, for logging
pub fn event_window(event: &Event) -> Option<Window> {
    match event {
        Event::MapRequest(e) => Some(e.window),
        Event::UnmapNotify(e) => Some(e.window),
        Event::DestroyNotify(e) => Some(e.window),
        Event::ConfigureRequest(e) => Some(e.window),
        Event::EnterNotify(e) => Some(e.event),
        Event::ButtonPress(e) => Some(e.event),
        Event::ClientMessage(e) => Some(e.window),
        Event::PropertyNotify(e) => Some(e.window),
        Event::ShapeNotify(e) => Some(e.affected_window),
        _ => None,
    }
}

fn has_bits(mask: u16, bits: u16) -> bool {
    mask & bits != 0
}

/// EWMH source indication for requests made on the user's behalf
const SOURCE_USER: u32 = 2;

impl<D: DisplayServer> WindowManager<D> {
    /// Handle one event, logging rather than propagating failures.
    pub fn handle_event(&mut self, event: &Event) {
        if let Err(e) = self.dispatch(event) {
            warn!(
                "Error handling event for window {:?}: {:#}",
                event_window(event),
                e
            );
        }
    }

    /// Work deferred to the end of an event batch.
    pub fn after_events(&mut self) {
        if let Err(e) = self.finish_inspect() {
            warn!("Error ending info display: {:#}", e);
        }
        if let Err(e) = self.tidy() {
            warn!("Error removing clients: {:#}", e);
        }
    }

    fn dispatch(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::MapRequest(e) => self.handle_map_request(e),
            Event::UnmapNotify(e) => self.handle_unmap(e.window),
            Event::DestroyNotify(e) => self.handle_destroy(e.window),
            Event::ConfigureRequest(e) => self.handle_configure_request(e),
            Event::EnterNotify(e) => self.handle_enter(e.event),
            Event::ButtonPress(e) => self.handle_button_press(e),
            Event::MotionNotify(e) => self.handle_motion(
                e.root,
                Point::new(e.root_x as i32, e.root_y as i32),
                u16::from(e.state),
            ),
            Event::ButtonRelease(_) => self.handle_button_release(),
            Event::KeyPress(e) => self.handle_key_press(e),
            Event::KeyRelease(e) => {
                self.handle_key_release(e.detail, e.time);
                Ok(())
            }
            Event::ClientMessage(e) => self.handle_client_message(e),
            Event::PropertyNotify(e) => self.handle_property(e),
            Event::MappingNotify(e) => self.handle_mapping(e),
            Event::RandrScreenChangeNotify(e) => self.handle_randr(e),
            Event::ShapeNotify(e) => self.handle_shape(e.affected_window),
            Event::Error(e) => {
                debug!("X error {:?} on resource 0x{:x}", e.error_kind, e.bad_value);
                self.handle_window_error(e.bad_value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_map_request(&mut self, e: &MapRequestEvent) -> Result<()> {
        let Some(id) = self.clients.find_by_window(e.window) else {
            self.manage(e.parent, e.window)?;
            return Ok(());
        };
        // A client on a hidden desktop asking to be shown brings the
        // desktop along
        let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
            return Ok(());
        };
        if !client.is_fixed() && client.vdesk != output.vdesk {
            let (screen, index, vdesk) = (client.screen, client.output, client.vdesk);
            if !self.switch_desktop(screen, index, vdesk)? {
                return Ok(());
            }
        }
        self.client_show(id)?;
        self.client_raise(id)
    }

    fn handle_unmap(&mut self, window: Window) -> Result<()> {
        let Some(id) = self.clients.find_by_window(window) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if client.ignore_unmap > 0 {
            client.ignore_unmap -= 1;
            return Ok(());
        }
        client.remove = true;
        self.remove_client(id)
    }

    fn handle_destroy(&mut self, window: Window) -> Result<()> {
        let Some(id) = self.clients.find_by_window(window) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if client.window != window {
            return Ok(());
        }
        client.remove = true;
        self.remove_client(id)
    }

    /// Managed clients get their request applied and committed; anything
    /// else is passed through untouched.
    fn handle_configure_request(&mut self, e: &ConfigureRequestEvent) -> Result<()> {
        let Some(id) = self.clients.find_by_window(e.window) else {
            return self.display.forward_configure_request(e);
        };
        let mask = u16::from(e.value_mask);
        let pos = Point::new(e.x as i32, e.y as i32);
        self.configure_client(id, mask, pos, e.width as i32, e.height as i32)?;
        if has_bits(mask, u16::from(ConfigWindow::STACK_MODE)) {
            let sibling = has_bits(mask, u16::from(ConfigWindow::SIBLING)).then_some(e.sibling);
            self.restack_request(id, sibling, e.stack_mode)?;
        }
        self.moveresize(id)
    }

    /// Apply the position and size parts of a configure: the X, Y, WIDTH
    /// and HEIGHT bits of `mask`. `pos` is in logical-screen coordinates.
    /// The result is not pushed to the server.
    fn configure_client(&mut self, id: ClientId, mask: u16, pos: Point, width: i32, height: i32) -> Result<()> {
        let Some(mut target) = self.screen_position(id) else {
            return Ok(());
        };
        if has_bits(mask, u16::from(ConfigWindow::X)) {
            target.x = pos.x;
        }
        if has_bits(mask, u16::from(ConfigWindow::Y)) {
            target.y = pos.y;
        }
        if let Some(client) = self.clients.get_mut(id) {
            if has_bits(mask, u16::from(ConfigWindow::WIDTH)) {
                client.current.width = width;
            }
            if has_bits(mask, u16::from(ConfigWindow::HEIGHT)) {
                client.current.height = height;
            }
            client.recompute_cog();
        }
        self.update_screen_position(id, target);
        self.client_calc_phy(id)
    }

    /// Restack relative to the client owning `sibling`. A sibling we do not
    /// manage turns the request into a no-op.
    fn restack_request(&mut self, id: ClientId, sibling: Option<Window>, mode: StackMode) -> Result<()> {
        let sibling = match sibling {
            Some(window) => match self.clients.find_by_window(window) {
                Some(other) => Some(other),
                None => {
                    debug!("Restack relative to unmanaged 0x{:x} ignored", window);
                    return Ok(());
                }
            },
            None => None,
        };
        self.restack(id, sibling, mode)
    }

    fn handle_enter(&mut self, window: Window) -> Result<()> {
        if !self.interaction.is_idle() {
            return Ok(());
        }
        let Some(id) = self.clients.find_by_window(window) else {
            return Ok(());
        };
        if self.current == Some(id) {
            return Ok(());
        }
        self.select_client(Some(id))
    }

    fn handle_button_press(&mut self, e: &ButtonPressEvent) -> Result<()> {
        if !self.interaction.is_idle() {
            return Ok(());
        }
        let Some(id) = self.clients.find_by_window(e.event) else {
            return Ok(());
        };
        match ButtonAction::from_button(e.detail) {
            Some(ButtonAction::Drag) => self.drag(id),
            Some(ButtonAction::Sweep) => self.sweep(id),
            Some(ButtonAction::Lower) => self.client_lower(id),
            None => Ok(()),
        }
    }

    fn handle_key_press(&mut self, e: &KeyPressEvent) -> Result<()> {
        if self.handle_inspect_key_press(e.detail, e.time) {
            return Ok(());
        }
        if self.interaction.grab().is_some() {
            return Ok(());
        }
        let keysym = self.display.keycode_to_keysym(e.detail);
        let numlock = self.display.numlock_mask();
        let Some(action) = self.bindings.lookup(keysym, u16::from(e.state), numlock) else {
            return Ok(());
        };
        debug!("Key action {:?}", action);
        self.key_action(action, e.detail)
    }

    /// Carry out a bound key action. Desktop actions apply to the output
    /// under the pointer, client actions to the current client.
    pub fn key_action(&mut self, action: KeyAction, keycode: u8) -> Result<()> {
        match action {
            KeyAction::SwitchDesktop(n) => {
                if let Some((screen, output)) = self.pointer_output()? {
                    self.switch_desktop(screen, output, Desktop::Index(n))?;
                }
                Ok(())
            }
            KeyAction::PrevDesktop | KeyAction::NextDesktop => {
                let delta = if action == KeyAction::PrevDesktop { -1 } else { 1 };
                match self.pointer_output()? {
                    Some((screen, output)) => self.switch_relative(screen, output, delta),
                    None => Ok(()),
                }
            }
            KeyAction::ToggleDesktop => match self.pointer_output()? {
                Some((screen, output)) => self.toggle_desktop(screen, output),
                None => Ok(()),
            },
            KeyAction::ExchangeOutputs => match self.pointer_output()? {
                Some((screen, _)) => self.exchange_outputs(screen),
                None => Ok(()),
            },
            KeyAction::ToggleDocks => match self.pointer_output()? {
                Some((screen, _)) => self.toggle_docks(screen),
                None => Ok(()),
            },
            KeyAction::Next => self.next(),
            KeyAction::Fix => self.with_current(|wm, id| wm.toggle_fixed(id)),
            KeyAction::Info => self.with_current(|wm, id| wm.show_info(id, keycode)),
            KeyAction::Maximise(flags) => {
                self.with_current(|wm, id| wm.maximise(id, StateAction::Toggle, flags))
            }
            KeyAction::Expand => self.with_current(|wm, id| wm.expand(id)),
            KeyAction::Lower => self.with_current(|wm, id| wm.client_lower(id)),
            KeyAction::Close => self.with_current(|wm, id| wm.close_client(id, false)),
            KeyAction::Kill => self.with_current(|wm, id| wm.close_client(id, true)),
            KeyAction::Nudge(direction) => self.with_current(|wm, id| wm.nudge(id, direction)),
            KeyAction::Resize(direction) => self.with_current(|wm, id| wm.resize_step(id, direction)),
            KeyAction::Corner(corner) => self.with_current(|wm, id| wm.move_to_corner(id, corner)),
        }
    }

    fn with_current(&mut self, f: impl FnOnce(&mut Self, ClientId) -> Result<()>) -> Result<()> {
        match self.current {
            Some(id) => f(self, id),
            None => Ok(()),
        }
    }

    fn handle_client_message(&mut self, e: &ClientMessageEvent) -> Result<()> {
        if e.format != 32 {
            return Ok(());
        }
        let Some(prop) = self.display.prop_for_atom(e.type_) else {
            return Ok(());
        };
        let data = e.data.as_data32();

        if prop == Prop::NetCurrentDesktop {
            let Some(screen) = self.screen_for_root(e.window) else {
                return Ok(());
            };
            let output = match self.pointer_output()? {
                Some((s, output)) if s == screen => output,
                _ => 0,
            };
            self.switch_desktop(screen, output, Desktop::Index(data[0]))?;
            return Ok(());
        }
        // Asked before mapping, so the window need not be managed yet
        if prop == Prop::NetRequestFrameExtents {
            let extents = frame_extents(self.config.border_width);
            return self
                .display
                .set_cardinals(e.window, Prop::NetFrameExtents, &extents);
        }

        let Some(id) = self.clients.find_by_window(e.window) else {
            return Ok(());
        };
        match prop {
            Prop::NetActiveWindow => {
                let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
                    return Ok(());
                };
                if !client.is_fixed() && client.vdesk != output.vdesk {
                    let (screen, index, vdesk) = (client.screen, client.output, client.vdesk);
                    self.switch_desktop(screen, index, vdesk)?;
                }
                self.client_show(id)?;
                self.client_raise(id)?;
                self.select_client(Some(id))
            }
            Prop::NetWmDesktop => self.client_to_vdesk(id, Desktop::from_cardinal(data[0])),
            Prop::NetCloseWindow => self.close_client(id, false),
            Prop::NetMoveresizeWindow => {
                // Gravity in bits 0-7 is not honoured
                let mask = ((data[0] >> 8) & 0xf) as u16;
                let source = (data[0] >> 12) & 0x3;
                if source != SOURCE_USER || mask == 0 {
                    return Ok(());
                }
                let pos = Point::new(data[1] as i32, data[2] as i32);
                self.configure_client(id, mask, pos, data[3] as i32, data[4] as i32)?;
                self.moveresize(id)
            }
            Prop::NetRestackWindow => {
                if data[0] != SOURCE_USER {
                    return Ok(());
                }
                let sibling = (data[1] != x11rb::NONE).then_some(data[1]);
                self.restack_request(id, sibling, StackMode::from(data[2] as u8))
            }
            Prop::NetWmState => {
                let Some(action) = StateAction::from_x11(data[0]) else {
                    return Ok(());
                };
                let mut flags = MaximiseFlags::empty();
                for atom in [data[1], data[2]] {
                    match self.display.prop_for_atom(atom) {
                        Some(Prop::NetWmStateMaximizedHorz) => flags |= MaximiseFlags::HORZ,
                        Some(Prop::NetWmStateMaximizedVert) => flags |= MaximiseFlags::VERT,
                        Some(Prop::NetWmStateFullscreen) => flags |= MaximiseFlags::FULLSCREEN,
                        _ => {}
                    }
                }
                if flags.is_empty() {
                    return Ok(());
                }
                self.maximise(id, action, flags)
            }
            _ => Ok(()),
        }
    }

    fn handle_property(&mut self, e: &PropertyNotifyEvent) -> Result<()> {
        if e.atom != Atom::from(AtomEnum::WM_NORMAL_HINTS) || e.state != Property::NEW_VALUE {
            return Ok(());
        }
        let Some(id) = self.clients.find_by_window(e.window) else {
            return Ok(());
        };
        let info = self.display.inspect_window(e.window)?;
        if let Some(client) = self.clients.get_mut(id) {
            client.hints = SizeHints::from_wm_normal_hints(&info.normal_hints);
            debug!("Size hints of 0x{:x} now {:?}", e.window, client.hints);
        }
        Ok(())
    }

    fn handle_shape(&mut self, window: Window) -> Result<()> {
        let Some(id) = self.clients.find_by_window(window) else {
            return Ok(());
        };
        if self.clients.get(id).is_some_and(|c| c.window == window) {
            self.apply_client_shape(id)?;
        }
        Ok(())
    }

    fn handle_mapping(&mut self, e: &MappingNotifyEvent) -> Result<()> {
        if e.request != Mapping::KEYBOARD && e.request != Mapping::MODIFIER {
            return Ok(());
        }
        info!("Keyboard mapping changed, grabbing keys again");
        self.display.refresh_keyboard_mapping()?;
        let roots: Vec<Window> = self.screens.iter().map(|s| s.root).collect();
        for root in roots {
            self.bindings.grab_keys(&mut self.display, root)?;
        }
        Ok(())
    }

    fn handle_randr(&mut self, e: &ScreenChangeNotifyEvent) -> Result<()> {
        let (mut width, mut height) = (e.width as i32, e.height as i32);
        let rotation = u16::from(e.rotation);
        let sideways = u16::from(randr::Rotation::ROTATE90) | u16::from(randr::Rotation::ROTATE270);
        if has_bits(rotation, sideways) {
            std::mem::swap(&mut width, &mut height);
        }
        info!("Screen change on root 0x{:x}: {}x{}", e.root, width, height);
        self.handle_screen_change(e.root, width, height)
    }

    /// A request failed on `window`. A client owning it is gone or going,
    /// so flag it for the tidy pass.
    pub fn handle_window_error(&mut self, window: Window) {
        let Some(id) = self.clients.find_by_window(window) else {
            return;
        };
        if let Some(client) = self.clients.get_mut(id) {
            debug!("Flagging client 0x{:x} for removal", client.window);
            client.remove = true;
            self.need_client_tidy = true;
        }
    }
}
