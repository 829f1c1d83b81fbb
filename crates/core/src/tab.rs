//! Tabs and the registry that owns them.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Address a recycled tab falls back to when the last tab is closed.
pub const WELCOME_URL: &str = "stealth:welcome";

/// Stable handle addressing a tab inside its registry.
///
/// Handles stay valid until the tab is closed; they are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TabId(u32);

/// A single browsing context: current URL, navigation history, and
/// ephemeral per-service state.
#[derive(Debug, Clone, Serialize)]
pub struct Tab {
    id: TabId,
    url: String,
    history: Vec<String>,
    #[serde(skip)]
    ephemeral: HashMap<String, Value>,
}

impl Tab {
    fn new(id: TabId, url: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            history: vec![url.to_string()],
            ephemeral: HashMap::new(),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Visited URLs, oldest first. Never empty.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Stores a service's ephemeral state on this tab.
    pub fn remember(&mut self, service: &str, state: Value) {
        self.ephemeral.insert(service.to_string(), state);
    }

    /// Ephemeral state previously stored by a service, if any.
    pub fn recall(&self, service: &str) -> Option<&Value> {
        self.ephemeral.get(service)
    }

    /// Drops a service's ephemeral state. Idempotent; absence of the entry
    /// is not an error.
    pub fn forget(&mut self, service: &str) -> bool {
        self.ephemeral.remove(service);
        true
    }

    fn navigate(&mut self, url: &str) {
        self.history.push(url.to_string());
        self.url = url.to_string();
    }

    fn back(&mut self) -> bool {
        if self.history.len() < 2 {
            return false;
        }
        self.history.pop();
        if let Some(last) = self.history.last() {
            self.url = last.clone();
        }
        true
    }

    fn recycle(&mut self) {
        self.url = WELCOME_URL.to_string();
        self.history = vec![WELCOME_URL.to_string()];
        self.ephemeral.clear();
    }
}

/// Owns every tab and the current-tab pointer.
///
/// Insertion order is preserved. Once a tab has been created the registry is
/// never empty again: closing the last remaining tab recycles it onto the
/// welcome address instead of removing it. The current pointer, when set,
/// always names a member.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    current: Option<TabId>,
    next_id: u32,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a tab without showing it. The current pointer is unchanged.
    pub fn open(&mut self, url: &str) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        self.tabs.push(Tab::new(id, url));
        id
    }

    /// Makes a member tab current. Returns false for unknown handles.
    pub fn show(&mut self, id: TabId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Appends a URL to the current tab's history.
    pub fn navigate(&mut self, url: &str) -> bool {
        match self.current_index() {
            Some(index) => {
                self.tabs[index].navigate(url);
                true
            }
            None => false,
        }
    }

    /// Steps the current tab back one history entry.
    ///
    /// Returns false, with no mutation, when there is no current tab or
    /// nothing to go back to.
    pub fn back(&mut self) -> bool {
        match self.current_index() {
            Some(index) => self.tabs[index].back(),
            None => false,
        }
    }

    /// Closes a member tab.
    ///
    /// The sole remaining tab is recycled onto the welcome address instead
    /// of removed, and becomes (or stays) current. Otherwise the tab is
    /// removed; when it was current, the tab immediately preceding it in
    /// insertion order is promoted, or the first remaining tab when the
    /// closed tab was first.
    pub fn close(&mut self, id: TabId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        if self.tabs.len() == 1 {
            self.tabs[index].recycle();
            self.current = Some(id);
            return true;
        }

        self.tabs.remove(index);
        if self.current == Some(id) {
            let promoted = if index > 0 { index - 1 } else { 0 };
            self.current = Some(self.tabs[promoted].id);
        }
        true
    }

    pub fn current(&self) -> Option<&Tab> {
        self.current_index().map(|index| &self.tabs[index])
    }

    pub fn current_id(&self) -> Option<TabId> {
        self.current
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.index_of(id).map(|index| &self.tabs[index])
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.index_of(id).map(|index| &mut self.tabs[index])
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tab> {
        self.tabs.iter()
    }

    fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    fn current_index(&self) -> Option<usize> {
        self.current.and_then(|id| self.index_of(id))
    }
}
