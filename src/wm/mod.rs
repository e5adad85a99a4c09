//! Window Manager Module
//!
//! The window manager core: one [`WindowManager`] owns every screen, the
//! client registry and whatever interactive operation is in progress. Its
//! operations live in the submodules as `impl` blocks and reach the X
//! server only through [`DisplayServer`].

pub mod annotations;
pub mod client;
pub mod client_flags;
pub mod cycle;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod hints;
pub mod keyboard;
pub mod keymove;
pub mod maximise;
pub mod moveresize;
pub mod outputs;
pub mod placement;
pub mod registry;
pub mod screen;
pub mod snap;
pub mod stacking;
pub mod terminate;
pub mod workspace;

#[cfg(test)]
pub mod testing;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::config::Config;
use crate::shared::{Geometry, Point};
use crate::wm::annotations::Annotator;
use crate::wm::client::{Client, ClientId};
use crate::wm::display::{DisplayServer, WindowInfo, WmState};
use crate::wm::ewmh::Prop;
use crate::wm::hints::SizeHints;
use crate::wm::keyboard::Bindings;
use crate::wm::moveresize::Interaction;
use crate::wm::registry::ClientRegistry;
use crate::wm::screen::{BorderPixels, Desktop, LogicalScreen};

pub struct WindowManager<D: DisplayServer> {
    display: D,
    config: Config,
    screens: Vec<LogicalScreen>,
    clients: ClientRegistry,

    /// Client with the focused border and input focus
    current: Option<ClientId>,

    interaction: Interaction,
    annotations: Annotator,
    bindings: Bindings,

    /// Some client was flagged `remove` by an error event
    need_client_tidy: bool,
}

impl<D: DisplayServer> WindowManager<D> {
    /// Take over every screen of `display`: discover outputs, allocate border
    /// colours, publish root properties and grab the key bindings.
    pub fn new(mut display: D, config: Config) -> Result<Self> {
        let bindings = Bindings::from_config(&config.keys).context("Invalid key binding")?;
        let annotations = Annotator::from_config(&config.annotations, display.has_shape())
            .context("Invalid annotation strategy")?;

        let mut screens = Vec::new();
        for (number, (root, width, height)) in display.screen_roots().into_iter().enumerate() {
            let regions = outputs::discover(&mut display, root, width, height);
            let mut screen = LogicalScreen::new(number, root, width, height, regions);
            screen.pixels = BorderPixels {
                fg: display.border_pixel(number, config.colours.fg)?,
                bg: display.border_pixel(number, config.colours.bg)?,
                fc: display.border_pixel(number, config.colours.fc)?,
            };
            bindings
                .grab_keys(&mut display, root)
                .with_context(|| format!("Failed to grab keys on screen {}", number))?;
            info!(
                "Screen {}: {}x{} with {} output(s)",
                number,
                width,
                height,
                screen.outputs.len()
            );
            screens.push(screen);
        }

        let mut wm = Self {
            display,
            config,
            screens,
            clients: ClientRegistry::new(),
            current: None,
            interaction: Interaction::Idle,
            annotations,
            bindings,
            need_client_tidy: false,
        };
        for screen in 0..wm.screens.len() {
            wm.update_current_desktop_props(screen)?;
            wm.update_client_lists(screen)?;
        }
        Ok(wm)
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Manage the windows that were already mapped when we started.
    pub fn scan_windows(&mut self) -> Result<()> {
        let roots: Vec<Window> = self.screens.iter().map(|s| s.root).collect();
        for root in roots {
            let children = self.display.query_tree(root)?;
            debug!("Scanning {} children of root 0x{:x}", children.len(), root);
            for window in children {
                let info = match self.display.inspect_window(window) {
                    Ok(info) => info,
                    Err(e) => {
                        debug!("Skipping window 0x{:x}: {}", window, e);
                        continue;
                    }
                };
                if info.override_redirect || !info.viewable {
                    continue;
                }
                self.manage_window(root, window, info)?;
            }
        }
        info!("Managing {} existing window(s)", self.clients.len());
        Ok(())
    }

    /// Start managing `window`, a new top-level child of `root`.
    ///
    /// Returns `None` for override-redirect windows, windows already
    /// managed and windows on a root we do not know.
    pub fn manage(&mut self, root: Window, window: Window) -> Result<Option<ClientId>> {
        if self.clients.find_by_window(window).is_some() {
            return Ok(None);
        }
        let info = self.display.inspect_window(window)?;
        if info.override_redirect {
            return Ok(None);
        }
        self.manage_window(root, window, info)
    }

    fn manage_window(&mut self, root: Window, window: Window, info: WindowInfo) -> Result<Option<ClientId>> {
        let Some(screen) = self.screens.iter().position(|s| s.root == root) else {
            warn!("Window 0x{:x} is on unknown root 0x{:x}", window, root);
            return Ok(None);
        };
        self.display.grab_server()?;
        let result = self.manage_locked(screen, window, info);
        self.display.ungrab_server()?;
        result.map(Some)
    }

    fn manage_locked(&mut self, screen: usize, window: Window, info: WindowInfo) -> Result<ClientId> {
        let bw = self.config.border_width;
        let s = &self.screens[screen];
        let rect = info.geometry;
        let centre = rect.centre();
        let output_index = s.find_output_for_point(centre.x, centre.y);
        let output = s.outputs[output_index];
        let (root, bg, docks_visible) = (s.root, s.pixels.bg, s.docks_visible);

        let frame = self.display.create_frame(root, rect, bw, bg)?;
        let geometry = Geometry::new(rect.x - output.x, rect.y - output.y, rect.width, rect.height, bw);
        let mut client = Client::new(window, frame, screen, geometry);
        client.output = output_index;
        client.hints = SizeHints::from_wm_normal_hints(&info.normal_hints);
        client.orig_border = info.border_width;
        client.is_dock = info.is_dock;
        client.vdesk = if info.is_dock {
            Desktop::Fixed
        } else {
            match info.desktop.map(Desktop::from_cardinal) {
                Some(vdesk) if vdesk.is_valid(self.config.vdesks) => vdesk,
                _ => output.vdesk,
            }
        };
        // Reparenting a mapped window unmaps it
        if info.viewable {
            client.ignore_unmap += 1;
        }
        let vdesk = client.vdesk;
        let id = self.clients.insert(client);
        info!(
            "Managing window 0x{:x} in frame 0x{:x}: {}x{}+{}+{} on {:?}",
            window, frame, rect.width, rect.height, rect.x, rect.y, vdesk
        );

        self.gravitate_border(id, bw);
        self.display.reparent_window(window, frame, 0, 0)?;
        self.display.set_border_width(window, 0)?;
        self.display.set_save_set(window, true)?;
        self.display.select_client_input(window)?;
        self.bindings.grab_buttons(&mut self.display, frame)?;
        self.apply_client_shape(id)?;

        // A desktop already shown elsewhere pulls the client to that output
        if let Some(index) = self.screens[screen].output_showing(vdesk) {
            if index != output_index {
                if let Some(client) = self.clients.get_mut(id) {
                    client.output = index;
                }
                self.fix_screen_client(id, &output)?;
            }
        }
        if let Some(client) = self.clients.get_mut(id) {
            client.recompute_cog();
        }
        self.moveresize(id)?;
        self.set_frame_extents(id)?;
        self.display
            .set_cardinals(window, Prop::NetWmDesktop, &[vdesk.to_cardinal()])?;
        self.display.map_window(window)?;

        let visible = self.screens[screen].desktop_visible(vdesk) && (!info.is_dock || docks_visible);
        if visible {
            self.client_show(id)?;
            self.client_raise(id)?;
            self.select_client(Some(id))?;
        } else {
            self.display.set_wm_state(window, WmState::Iconic)?;
            self.client_raise(id)?;
        }
        self.update_client_lists(screen)?;
        self.display.discard_enter_events()?;
        Ok(id)
    }

    /// Stop managing a client and give its window back to the root.
    ///
    /// A client flagged `remove` went away on its own: its window is marked
    /// withdrawn and the properties we set on it are deleted. Otherwise (we
    /// are quitting) they stay for the next window manager.
    pub fn remove_client(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        debug!("Removing client 0x{:x} (withdrawn: {})", client.window, client.remove);

        self.abort_interaction(id)?;
        self.display.grab_server()?;
        let result = self.remove_locked(id);
        self.display.ungrab_server()?;
        result
    }

    fn remove_locked(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (window, frame, screen) = (client.window, client.frame, client.screen);
        let withdrawn = client.remove;
        let (border, orig_border) = (client.current.border_width, client.orig_border);
        if withdrawn {
            self.display.set_wm_state(window, WmState::Withdrawn)?;
            self.display.delete_property(window, Prop::NetWmDesktop)?;
            self.display.delete_property(window, Prop::NetWmState)?;
        }

        self.gravitate_border(id, -border);
        self.gravitate_border(id, orig_border);
        let root = self.screens[screen].root;
        let pos = self.screen_position(id).unwrap_or_default();
        self.display
            .reparent_window(window, root, pos.x - orig_border, pos.y - orig_border)?;
        self.display.set_border_width(window, orig_border)?;
        self.display.set_save_set(window, false)?;
        self.display.destroy_window(frame)?;
        self.clients.remove(id);

        if self.current == Some(id) {
            self.current = None;
            self.display
                .set_window_list(root, Prop::NetActiveWindow, &[x11rb::NONE])?;
        }
        if withdrawn {
            self.update_client_lists(screen)?;
        }
        Ok(())
    }

    /// Map a client's frame.
    pub fn client_show(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (frame, window) = (client.frame, client.window);
        self.display.map_window(frame)?;
        self.display.set_wm_state(window, WmState::Normal)
    }

    /// Unmap a client's frame. The UnmapNotify this causes is expected.
    pub fn client_hide(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        client.ignore_unmap += 1;
        let (frame, window) = (client.frame, client.window);
        self.display.unmap_window(frame)?;
        self.display.set_wm_state(window, WmState::Iconic)
    }

    /// Shape the frame like the client when the client is shaped.
    pub fn apply_client_shape(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (frame, window) = (client.frame, client.window);
        if self.display.copy_client_shape(frame, window)? {
            debug!("Frame 0x{:x} follows the shape of 0x{:x}", frame, window);
        }
        Ok(())
    }

    /// Remove clients flagged by error events.
    pub fn tidy(&mut self) -> Result<()> {
        if !self.need_client_tidy {
            return Ok(());
        }
        self.need_client_tidy = false;
        for id in self.clients.pending_removal() {
            self.remove_client(id)?;
        }
        Ok(())
    }

    /// Release every client and hand focus back to the pointer.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Releasing {} client(s)", self.clients.len());
        let ids = self.clients.stacking_order().to_vec();
        for id in ids {
            if let Some(client) = self.clients.get_mut(id) {
                client.remove = false;
            }
            self.remove_client(id)?;
        }
        let roots: Vec<Window> = self.screens.iter().map(|s| s.root).collect();
        for root in roots {
            self.display.ungrab_keys(root)?;
        }
        self.display.set_input_focus(None)
    }

    /// Screen and output the pointer is on.
    pub fn pointer_output(&mut self) -> Result<Option<(usize, usize)>> {
        let Some(first) = self.screens.first().map(|s| s.root) else {
            return Ok(None);
        };
        let pointer = self.display.query_pointer(first)?;
        let Some(screen) = self.screens.iter().position(|s| s.root == pointer.root) else {
            return Ok(None);
        };
        let Point { x, y } = pointer.position;
        Ok(Some((screen, self.screens[screen].find_output_for_point(x, y))))
    }

    pub fn screen_for_root(&self, root: Window) -> Option<usize> {
        self.screens.iter().position(|s| s.root == root)
    }
}
