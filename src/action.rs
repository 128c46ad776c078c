use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a menu action.
///
/// Identities are never reused; the mirror and the exporter address actions
/// exclusively through this id so they never have to own the action itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

impl ActionId {
    fn next() -> Self {
        Self(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Kind of menu action
#[derive(Debug, Clone)]
pub enum ActionKind {
    Entry { text: String },
    Separator,
}

/// A single menu-bar action, owned by the application.
///
/// The registration machinery only ever holds `Rc` references to actions;
/// tearing down a session never destroys application state.
pub struct MenuAction {
    id: ActionId,
    kind: ActionKind,
    enabled: Cell<bool>,
    visible: Cell<bool>,
    submenu: RefCell<Vec<Rc<MenuAction>>>,
    on_trigger: RefCell<Option<Box<dyn Fn()>>>,
}

impl std::fmt::Debug for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuAction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.enabled.get())
            .field("visible", &self.visible.get())
            .field("submenu_len", &self.submenu.borrow().len())
            .finish()
    }
}

impl MenuAction {
    fn new(kind: ActionKind) -> Rc<Self> {
        Rc::new(Self {
            id: ActionId::next(),
            kind,
            enabled: Cell::new(true),
            visible: Cell::new(true),
            submenu: RefCell::new(Vec::new()),
            on_trigger: RefCell::new(None),
        })
    }

    /// Create a regular entry action
    pub fn entry(text: impl Into<String>) -> Rc<Self> {
        Self::new(ActionKind::Entry { text: text.into() })
    }

    /// Create a separator. Separators are layout hints for in-window
    /// rendering only and are never exported.
    pub fn separator() -> Rc<Self> {
        Self::new(ActionKind::Separator)
    }

    // === Getters ===

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Entry { text } => Some(text),
            ActionKind::Separator => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self.kind, ActionKind::Separator)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn has_submenu(&self) -> bool {
        !self.submenu.borrow().is_empty()
    }

    pub fn submenu(&self) -> Vec<Rc<MenuAction>> {
        self.submenu.borrow().clone()
    }

    // === State Mutations ===

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    pub fn set_submenu(&self, items: Vec<Rc<MenuAction>>) {
        *self.submenu.borrow_mut() = items;
    }

    pub fn set_on_trigger(&self, callback: impl Fn() + 'static) {
        *self.on_trigger.borrow_mut() = Some(Box::new(callback));
    }

    /// Signal the action as triggered, invoking the application callback
    /// if one is installed.
    pub fn trigger(&self) {
        if let Some(callback) = self.on_trigger.borrow().as_ref() {
            callback();
        }
    }
}

/// The application's menu-bar action list, shared between the application,
/// the controller and the registration session.
pub type ActionListHandle = Rc<RefCell<Vec<Rc<MenuAction>>>>;

/// Action-list mutation notifications delivered by the widget layer.
#[derive(Clone)]
pub enum ActionEvent {
    Added {
        action: Rc<MenuAction>,
        /// Insert before this action; append when `None`.
        before: Option<ActionId>,
    },
    Removed {
        id: ActionId,
    },
    Changed {
        id: ActionId,
    },
}

impl std::fmt::Debug for ActionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added { action, before } => f
                .debug_struct("Added")
                .field("id", &action.id())
                .field("before", before)
                .finish(),
            Self::Removed { id } => f.debug_struct("Removed").field("id", id).finish(),
            Self::Changed { id } => f.debug_struct("Changed").field("id", id).finish(),
        }
    }
}
