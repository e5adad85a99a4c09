//! Terminate Module
//!
//! Closing clients: politely through WM_DELETE_WINDOW when the client
//! takes part in that protocol, otherwise by killing its connection.

use anyhow::Result;
use tracing::{debug, info};

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::WindowManager;

impl<D: DisplayServer> WindowManager<D> {
    /// Ask a client to close. With `force`, or when the client does not
    /// list WM_DELETE_WINDOW, its connection is killed instead.
    pub fn close_client(&mut self, id: ClientId, force: bool) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };
        if !force && self.display.supports_delete(window)? {
            debug!("Sending WM_DELETE_WINDOW to 0x{:x}", window);
            return self.display.send_delete(window);
        }
        info!("Killing client 0x{:x}", window);
        self.display.kill_client(window)
    }
}
