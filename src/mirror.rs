use std::rc::Rc;

use crate::action::{ActionId, MenuAction};

/// A plain, `Send`-safe snapshot of one mirrored action and its submenu
/// tree, as published to remote peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedItem {
    pub id: ActionId,
    pub label: String,
    pub enabled: bool,
    pub visible: bool,
    pub children: Vec<ExportedItem>,
}

impl ExportedItem {
    pub fn has_submenu(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Ordered, deduplicated view of the application's menu actions to be
/// exported.
///
/// Separators are dropped on the way in: they are a layout hint for the
/// in-window bar and have no remote-menu equivalent. Insertion order is
/// significant and no action identity appears twice.
#[derive(Default)]
pub struct ActionMirror {
    entries: Vec<Rc<MenuAction>>,
}

impl ActionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.entries.iter().any(|a| a.id() == id)
    }

    pub fn get(&self, id: ActionId) -> Option<&Rc<MenuAction>> {
        self.entries.iter().find(|a| a.id() == id)
    }

    /// Locate an action anywhere in the mirrored tree, submenus included.
    pub fn find(&self, id: ActionId) -> Option<Rc<MenuAction>> {
        fn search(actions: &[Rc<MenuAction>], id: ActionId) -> Option<Rc<MenuAction>> {
            for action in actions {
                if action.id() == id {
                    return Some(action.clone());
                }
                if let Some(found) = search(&action.submenu(), id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.entries, id)
    }

    /// Insert an action before `before` (append when `None` or absent).
    /// Separators and duplicate identities are rejected.
    ///
    /// Returns `true` if the mirror changed.
    pub fn insert(&mut self, action: &Rc<MenuAction>, before: Option<ActionId>) -> bool {
        if action.is_separator() || self.contains(action.id()) {
            return false;
        }
        let index = before
            .and_then(|id| self.entries.iter().position(|a| a.id() == id))
            .unwrap_or(self.entries.len());
        self.entries.insert(index, action.clone());
        true
    }

    /// Remove an action; no-op if absent. Returns `true` if the mirror
    /// changed.
    pub fn remove(&mut self, id: ActionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|a| a.id() != id);
        self.entries.len() != before
    }

    /// Replace the mirror contents from the application's current action
    /// list, filtering separators and preserving order.
    pub fn rebuild_from(&mut self, actions: &[Rc<MenuAction>]) {
        self.entries.clear();
        for action in actions {
            self.insert(action, None);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn ids(&self) -> Vec<ActionId> {
        self.entries.iter().map(|a| a.id()).collect()
    }

    /// Plain-data snapshot of the published tree, safe to hand to the
    /// bus-side exporter. Submenus are carried recursively; separators are
    /// filtered at every level.
    pub fn snapshot(&self) -> Vec<ExportedItem> {
        self.entries.iter().map(export).collect()
    }
}

fn export(action: &Rc<MenuAction>) -> ExportedItem {
    ExportedItem {
        id: action.id(),
        label: action.text().unwrap_or_default().to_string(),
        enabled: action.is_enabled(),
        visible: action.is_visible(),
        children: action
            .submenu()
            .iter()
            .filter(|a| !a.is_separator())
            .map(export)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        let b = MenuAction::entry("Edit");
        let c = MenuAction::entry("View");

        assert!(mirror.insert(&a, None));
        assert!(mirror.insert(&c, None));
        assert!(mirror.insert(&b, Some(c.id())));

        assert_eq!(mirror.ids(), vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn test_separators_are_dropped() {
        let mut mirror = ActionMirror::new();
        let sep = MenuAction::separator();
        assert!(!mirror.insert(&sep, None));
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_no_duplicate_identity() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        assert!(mirror.insert(&a, None));
        assert!(!mirror.insert(&a, None));
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn test_insert_before_absent_appends() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        let b = MenuAction::entry("Edit");
        let gone = MenuAction::entry("Ghost");

        mirror.insert(&a, None);
        mirror.insert(&b, Some(gone.id()));
        assert_eq!(mirror.ids(), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_remove() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        let b = MenuAction::entry("Edit");
        mirror.insert(&a, None);
        mirror.insert(&b, None);

        assert!(mirror.remove(a.id()));
        assert!(!mirror.remove(a.id()));
        assert_eq!(mirror.ids(), vec![b.id()]);
        assert!(!mirror.contains(a.id()));
    }

    #[test]
    fn test_rebuild_filters_separators_preserves_order() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        let sep = MenuAction::separator();
        let b = MenuAction::entry("Edit");

        mirror.rebuild_from(&[a.clone(), sep, b.clone()]);
        assert_eq!(mirror.ids(), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_rebuild_all_separators_is_empty() {
        let mut mirror = ActionMirror::new();
        mirror.rebuild_from(&[MenuAction::separator(), MenuAction::separator()]);
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_snapshot_reflects_flags() {
        let mut mirror = ActionMirror::new();
        let a = MenuAction::entry("File");
        a.set_enabled(false);
        a.set_submenu(vec![MenuAction::entry("New")]);
        mirror.insert(&a, None);

        let snap = mirror.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].label, "File");
        assert!(!snap[0].enabled);
        assert!(snap[0].has_submenu());
    }

    #[test]
    fn test_snapshot_carries_nested_submenus() {
        let mut mirror = ActionMirror::new();
        let file = MenuAction::entry("File");
        let recent = MenuAction::entry("Recent");
        recent.set_submenu(vec![MenuAction::entry("a.txt")]);
        file.set_submenu(vec![
            MenuAction::entry("New"),
            MenuAction::separator(),
            recent,
        ]);
        mirror.insert(&file, None);

        let snap = mirror.snapshot();
        let file_item = &snap[0];
        // Separator dropped, nested level preserved.
        assert_eq!(file_item.children.len(), 2);
        assert_eq!(file_item.children[0].label, "New");
        assert_eq!(file_item.children[1].children[0].label, "a.txt");
    }

    #[test]
    fn test_find_reaches_into_submenus() {
        let mut mirror = ActionMirror::new();
        let file = MenuAction::entry("File");
        let new = MenuAction::entry("New");
        file.set_submenu(vec![new.clone()]);
        mirror.insert(&file, None);

        assert_eq!(mirror.find(new.id()).map(|a| a.id()), Some(new.id()));
        assert!(mirror.get(new.id()).is_none());
        assert!(mirror.find(MenuAction::entry("Ghost").id()).is_none());
    }
}
