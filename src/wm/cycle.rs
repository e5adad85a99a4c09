//! Cycle Module
//!
//! Keyboard focus cycling through the clients on the desktops currently
//! shown, in creation order.

use anyhow::Result;
use tracing::debug;

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::WindowManager;

impl<D: DisplayServer> WindowManager<D> {
    /// Whether `next` may land on this client.
    fn cycle_candidate(&self, id: ClientId) -> bool {
        let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
            return false;
        };
        !client.is_dock && (client.is_fixed() || client.vdesk == output.vdesk)
    }

    /// Focus the next visible client after the current one, wrapping once.
    pub fn next(&mut self) -> Result<()> {
        let order = self.clients.tab_order().to_vec();
        let start = self
            .current
            .and_then(|current| order.iter().position(|&id| id == current));

        // Everything after the current client, then around from the start
        let candidates: Vec<ClientId> = match start {
            Some(pos) => order[pos + 1..]
                .iter()
                .chain(&order[..pos])
                .copied()
                .collect(),
            None => order,
        };
        let Some(id) = candidates.into_iter().find(|&id| self.cycle_candidate(id)) else {
            debug!("No other client to cycle to");
            return Ok(());
        };

        self.client_show(id)?;
        self.client_raise(id)?;
        self.select_client(Some(id))?;
        if self.config.warp_pointer {
            if let Some(client) = self.clients.get(id) {
                let g = client.current;
                let b = g.border_width;
                let window = client.window;
                self.display
                    .warp_pointer(window, g.width + b - 1, g.height + b - 1)?;
            }
        }
        self.display.discard_enter_events()
    }
}
