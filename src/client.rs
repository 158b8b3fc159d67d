//! Managed windows and the registry that owns them.
//!
//! The registry is a front-insertion ordered sequence: a newly managed
//! client is prepended and iteration always runs newest-first, the order
//! every focus-traversal and layout pass relies on.  It replaces the
//! classic doubly linked client list with an owned collection addressed
//! by window handle.

use crate::geometry::Rect;
use crate::tags::TagMask;
use crate::traits::WindowId;

/// One managed window and its metadata.
///
/// The registry exclusively owns every `Client`; other components hold a
/// [`WindowId`] and borrow the record for the duration of one operation.
#[derive(Debug, Clone)]
pub struct Client {
    /// Handle into the window system.
    pub window: WindowId,
    /// Owning process.
    pub pid: i32,
    /// Cached application display name (rule matching, persistence key).
    pub app: String,
    /// Cached window title.
    pub title: String,
    /// Workspaces this client belongs to.  Never empty while managed.
    pub tags: TagMask,
    /// Floating clients keep operator-set geometry and are skipped by
    /// tiling layouts, but still participate in focus and visibility.
    pub floating: bool,
    /// Last geometry applied.  A cache only — the window system stays
    /// authoritative.
    pub frame: Rect,
}

/// The set of managed clients, newest first.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.clients.iter().any(|c| c.window == id)
    }

    /// Prepend a client.  Returns `false` (and changes nothing) if the
    /// handle is already registered — no two entries may share a handle.
    pub fn insert(&mut self, client: Client) -> bool {
        if self.contains(client.window) {
            return false;
        }
        self.clients.insert(0, client);
        true
    }

    /// Remove and return the client with the given handle.
    pub fn remove(&mut self, id: WindowId) -> Option<Client> {
        let idx = self.clients.iter().position(|c| c.window == id)?;
        Some(self.clients.remove(idx))
    }

    pub fn get(&self, id: WindowId) -> Option<&Client> {
        self.clients.iter().find(|c| c.window == id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.window == id)
    }

    /// Position of a client in insertion order (0 = newest).
    pub fn position(&self, id: WindowId) -> Option<usize> {
        self.clients.iter().position(|c| c.window == id)
    }

    /// Iterate in insertion order, most recently added first.
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.iter_mut()
    }

    /// Swap the registry positions of two clients.  No-op unless both
    /// handles are present.
    pub fn swap(&mut self, a: WindowId, b: WindowId) {
        if let (Some(i), Some(j)) = (self.position(a), self.position(b)) {
            self.clients.swap(i, j);
        }
    }

    /// Handles of all clients, newest first.
    pub fn ids(&self) -> Vec<WindowId> {
        self.clients.iter().map(|c| c.window).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: u64) -> Client {
        Client {
            window: WindowId(id),
            pid: 100 + id as i32,
            app: format!("App{}", id),
            title: format!("win{}", id),
            tags: TagMask::from_index(0),
            floating: false,
            frame: Rect::new(0, 0, 100, 100),
        }
    }

    #[test]
    fn insert_prepends() {
        let mut reg = ClientRegistry::new();
        assert!(reg.insert(client(1)));
        assert!(reg.insert(client(2)));
        assert!(reg.insert(client(3)));
        let order: Vec<u64> = reg.iter().map(|c| c.window.0).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let mut reg = ClientRegistry::new();
        assert!(reg.insert(client(1)));
        assert!(!reg.insert(client(1)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_returns_the_client() {
        let mut reg = ClientRegistry::new();
        reg.insert(client(1));
        reg.insert(client(2));
        let removed = reg.remove(WindowId(1)).unwrap();
        assert_eq!(removed.pid, 101);
        assert_eq!(reg.len(), 1);
        assert!(reg.remove(WindowId(1)).is_none());
    }

    #[test]
    fn removal_preserves_remaining_order() {
        let mut reg = ClientRegistry::new();
        for id in 1..=4 {
            reg.insert(client(id));
        }
        reg.remove(WindowId(3));
        let order: Vec<u64> = reg.iter().map(|c| c.window.0).collect();
        assert_eq!(order, vec![4, 2, 1]);
    }

    #[test]
    fn swap_reorders_two_clients() {
        let mut reg = ClientRegistry::new();
        for id in 1..=3 {
            reg.insert(client(id));
        }
        reg.swap(WindowId(3), WindowId(1));
        let order: Vec<u64> = reg.iter().map(|c| c.window.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn swap_with_missing_handle_is_noop() {
        let mut reg = ClientRegistry::new();
        reg.insert(client(1));
        reg.insert(client(2));
        reg.swap(WindowId(1), WindowId(99));
        let order: Vec<u64> = reg.iter().map(|c| c.window.0).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn get_mut_allows_in_place_edits() {
        let mut reg = ClientRegistry::new();
        reg.insert(client(1));
        reg.get_mut(WindowId(1)).unwrap().floating = true;
        assert!(reg.get(WindowId(1)).unwrap().floating);
    }
}
