//! Stacking Module
//!
//! Raising and lowering clients. The registry's stacking order mirrors the
//! server's and is published as `_NET_CLIENT_LIST_STACKING`.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{StackMode, Window};

use crate::wm::client::ClientId;
use crate::wm::display::DisplayServer;
use crate::wm::ewmh::Prop;
use crate::wm::WindowManager;

impl<D: DisplayServer> WindowManager<D> {
    pub fn client_raise(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (frame, screen) = (client.frame, client.screen);
        self.display.raise_window(frame)?;
        self.clients.stack_on_top(id);
        self.update_client_lists(screen)
    }

    /// Restack a client directly below the lowest client visible on its
    /// screen. Nothing happens when it already is the lowest.
    pub fn client_lower(&mut self, id: ClientId) -> Result<()> {
        let (Some(client), Some(output)) = (self.clients.get(id), self.client_output(id)) else {
            return Ok(());
        };
        let screen = client.screen;

        let mut lowest = None;
        for &other in self.clients.stacking_order() {
            if other == id {
                break;
            }
            let Some(c) = self.clients.get(other) else {
                continue;
            };
            if c.screen == screen && (c.is_fixed() || c.vdesk == output.vdesk) {
                lowest = Some(other);
                break;
            }
        }
        let Some(sibling) = lowest else {
            return Ok(());
        };

        let (Some(frame), Some(sibling_frame)) = (
            self.clients.get(id).map(|c| c.frame),
            self.clients.get(sibling).map(|c| c.frame),
        ) else {
            return Ok(());
        };
        debug!("Lowering frame 0x{:x} below 0x{:x}", frame, sibling_frame);
        self.display.stack_below(frame, sibling_frame)?;
        self.clients.stack_below(id, sibling);
        self.update_client_lists(screen)
    }

    /// Restack a client as a ConfigureRequest or `_NET_RESTACK_WINDOW` asks.
    /// Without a sibling, above and below mean top and bottom of the
    /// visible clients. Other modes are ignored.
    pub fn restack(&mut self, id: ClientId, sibling: Option<ClientId>, mode: StackMode) -> Result<()> {
        let Some(sibling) = sibling.filter(|&s| s != id) else {
            return match mode {
                StackMode::ABOVE => self.client_raise(id),
                StackMode::BELOW => self.client_lower(id),
                _ => Ok(()),
            };
        };
        let (Some(client), Some(other)) = (self.clients.get(id), self.clients.get(sibling)) else {
            return Ok(());
        };
        if client.screen != other.screen {
            return Ok(());
        }
        let (frame, sibling_frame, screen) = (client.frame, other.frame, client.screen);
        match mode {
            StackMode::ABOVE => {
                self.display.stack_above(frame, sibling_frame)?;
                self.clients.stack_above(id, sibling);
            }
            StackMode::BELOW => {
                self.display.stack_below(frame, sibling_frame)?;
                self.clients.stack_below(id, sibling);
            }
            _ => return Ok(()),
        }
        debug!("Restacked frame 0x{:x} {:?} 0x{:x}", frame, mode, sibling_frame);
        self.update_client_lists(screen)
    }

    /// Publish mapping and stacking order on the root of `screen`.
    pub fn update_client_lists(&mut self, screen: usize) -> Result<()> {
        let Some(root) = self.screens.get(screen).map(|s| s.root) else {
            return Ok(());
        };
        let windows = |order: &[ClientId]| -> Vec<Window> {
            order
                .iter()
                .filter_map(|&id| self.clients.get(id))
                .filter(|c| c.screen == screen)
                .map(|c| c.window)
                .collect()
        };
        let mapping = windows(self.clients.mapping_order());
        let stacking = windows(self.clients.stacking_order());
        self.display
            .set_window_list(root, Prop::NetClientList, &mapping)?;
        self.display
            .set_window_list(root, Prop::NetClientListStacking, &stacking)
    }
}
