//! Focus Module
//!
//! Focus follows the pointer: entering a client frame selects it. The
//! selected client gets the focused border colour and the input focus.

use anyhow::Result;
use tracing::debug;

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::WindowManager;

impl<D: DisplayServer> WindowManager<D> {
    /// Make `id` the current client, or clear the selection.
    ///
    /// Clearing leaves the server's input focus where it is.
    pub fn select_client(&mut self, id: Option<ClientId>) -> Result<()> {
        if let Some(old) = self.current {
            if Some(old) != id {
                if let Some(client) = self.clients.get(old) {
                    let frame = client.frame;
                    let bg = self.screens[client.screen].pixels.bg;
                    self.display.set_border_colour(frame, bg)?;
                }
            }
        }

        let id = id.filter(|&id| self.clients.contains(id));
        let active = match id {
            Some(id) => {
                let Some(client) = self.clients.get(id) else {
                    return Ok(());
                };
                let pixels = self.screens[client.screen].pixels;
                let pixel = if client.is_fixed() { pixels.fc } else { pixels.fg };
                let (frame, window) = (client.frame, client.window);
                self.display.set_border_colour(frame, pixel)?;
                self.display.set_input_focus(Some(window))?;
                debug!("Selected client 0x{:x}", window);
                window
            }
            None => x11rb::NONE,
        };
        self.current = id;

        let roots: Vec<_> = self.screens.iter().map(|s| s.root).collect();
        for root in roots {
            self.display
                .set_window_list(root, Prop::NetActiveWindow, &[active])?;
        }
        Ok(())
    }
}
