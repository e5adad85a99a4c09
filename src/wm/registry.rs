//! Client Registry
//!
//! Owns every managed client and the three orderings kept over them:
//! creation (tab) order, mapping order and bottom-to-top stacking order.
//! The orderings hold ids only; clients never link to each other.

use std::collections::HashMap;

use x11rb::protocol::xproto::Window;

use crate::wm::client::{Client, ClientId};

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,

    /// Serial for the next id; ids are never reused
    client_serial: u64,

    tab_order: Vec<ClientId>,
    mapping_order: Vec<ClientId>,

    /// Bottom to top
    stacking_order: Vec<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client at the end of every ordering.
    pub fn insert(&mut self, client: Client) -> ClientId {
        self.client_serial += 1;
        let id = ClientId(self.client_serial);
        self.clients.insert(id, client);
        self.tab_order.push(id);
        self.mapping_order.push(id);
        self.stacking_order.push(id);
        id
    }

    /// Drop a client from the registry and every ordering.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let client = self.clients.remove(&id)?;
        self.tab_order.retain(|&c| c != id);
        self.mapping_order.retain(|&c| c != id);
        self.stacking_order.retain(|&c| c != id);
        Some(client)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Find the client owning `window`, either as application window or frame.
    pub fn find_by_window(&self, window: Window) -> Option<ClientId> {
        self.tab_order.iter().copied().find(|id| {
            self.clients
                .get(id)
                .is_some_and(|c| c.window == window || c.frame == window)
        })
    }

    pub fn tab_order(&self) -> &[ClientId] {
        &self.tab_order
    }

    pub fn mapping_order(&self) -> &[ClientId] {
        &self.mapping_order
    }

    pub fn stacking_order(&self) -> &[ClientId] {
        &self.stacking_order
    }

    /// Iterate clients in tab order.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.tab_order
            .iter()
            .filter_map(move |id| self.clients.get(id).map(|c| (*id, c)))
    }

    /// Move a client to the top of the stacking order.
    pub fn stack_on_top(&mut self, id: ClientId) {
        if let Some(pos) = self.stacking_order.iter().position(|&c| c == id) {
            self.stacking_order.remove(pos);
            self.stacking_order.push(id);
        }
    }

    /// Move `id` directly below `sibling` in the stacking order.
    pub fn stack_below(&mut self, id: ClientId, sibling: ClientId) {
        if id == sibling {
            return;
        }
        self.stacking_order.retain(|&c| c != id);
        let pos = self
            .stacking_order
            .iter()
            .position(|&c| c == sibling)
            .unwrap_or(0);
        self.stacking_order.insert(pos, id);
    }

    /// Move `id` directly above `sibling` in the stacking order.
    pub fn stack_above(&mut self, id: ClientId, sibling: ClientId) {
        if id == sibling {
            return;
        }
        self.stacking_order.retain(|&c| c != id);
        let pos = self
            .stacking_order
            .iter()
            .position(|&c| c == sibling)
            .map_or(self.stacking_order.len(), |p| p + 1);
        self.stacking_order.insert(pos, id);
    }

    /// Ids flagged for deferred removal.
    pub fn pending_removal(&self) -> Vec<ClientId> {
        self.iter().filter(|(_, c)| c.remove).map(|(id, _)| id).collect()
    }
}
