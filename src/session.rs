//! Window registration against the appmenu registrar.
//!
//! A `RegistrationSession` owns one [`ActionMirror`] and one exporter for
//! one window. It performs the register-window handshake and tracks whether
//! the currently registered window id is still valid. The remote call is
//! fire-and-forget: its failure is never observed, convergence is driven by
//! the watcher re-invoking [`RegistrationSession::register_window`].

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::action::{ActionId, ActionListHandle, MenuAction};
use crate::error::RegisterError;
use crate::mirror::{ActionMirror, ExportedItem};

/// Opaque platform window identity (e.g. an X11 window id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client side of the registrar service.
///
/// Implemented over the bus in [`crate::bus::registrar`]; tests use an
/// in-memory fake.
pub trait RegistrarClient {
    /// Whether the registrar interface handle is currently valid.
    fn is_reachable(&self) -> bool;

    /// Issue `RegisterWindow(window, object_path)` asynchronously with no
    /// response awaited. Must not block; the result is never observed.
    fn register_window(&self, window: WindowId, object_path: &str);

    /// Issue `UnregisterWindow(window)`, fire-and-forget like registration.
    fn unregister_window(&self, window: WindowId);
}

/// Publishes a mirrored action sequence at a stable bus address.
///
/// Remote peers enumerate the published sequence and request activation of
/// items; those requests flow back into the core through the controller.
pub trait MenuExporter {
    fn object_path(&self) -> &str;

    /// Replace the published sequence.
    fn publish(&mut self, items: &[ExportedItem]);

    /// Signal remote peers that an item was activated / should be opened.
    fn announce_activation(&mut self, id: ActionId);
}

/// Creates exporters bound to an object path, so the session can create its
/// exporter lazily on the first non-trivial registration.
pub type ExporterFactory = Rc<dyn Fn(&str) -> Box<dyn MenuExporter>>;

pub struct RegistrationSession {
    registrar: Rc<dyn RegistrarClient>,
    make_exporter: ExporterFactory,
    actions: ActionListHandle,
    object_path: String,
    mirror: ActionMirror,
    exporter: Option<Box<dyn MenuExporter>>,
    /// Last-known window identity, kept for opportunistic registration when
    /// the first real action appears.
    window: Option<WindowId>,
    /// Identity of the last successfully registered window.
    registered: Option<WindowId>,
}

impl RegistrationSession {
    pub fn new(
        registrar: Rc<dyn RegistrarClient>,
        make_exporter: ExporterFactory,
        actions: ActionListHandle,
        object_path: String,
    ) -> Self {
        Self {
            registrar,
            make_exporter,
            actions,
            object_path,
            mirror: ActionMirror::new(),
            exporter: None,
            window: None,
            registered: None,
        }
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    pub fn registered_window(&self) -> Option<WindowId> {
        self.registered
    }

    pub fn mirror(&self) -> &ActionMirror {
        &self.mirror
    }

    /// Register `window` with the registrar.
    ///
    /// Idempotent: re-registering the already registered identity succeeds
    /// without a remote call. An empty mirror (no actions, or separators
    /// only) is a successful no-op; the registrar is not contacted and the
    /// identity is not recorded, so the next added action retries.
    pub fn register_window(&mut self, window: Option<WindowId>) -> Result<(), RegisterError> {
        let Some(window) = window else {
            warn!("register_window: no window for this menu bar");
            return Err(RegisterError::NoWindow);
        };
        self.window = Some(window);

        if self.registered == Some(window) {
            return Ok(());
        }

        if !self.registrar.is_reachable() {
            debug!(%window, "register_window: registrar unavailable");
            return Err(RegisterError::RegistrarUnavailable);
        }

        self.mirror.rebuild_from(&self.actions.borrow());
        if self.mirror.is_empty() {
            trace!(%window, "register_window: nothing to export yet");
            return Ok(());
        }

        if self.exporter.is_none() {
            self.exporter = Some((self.make_exporter)(&self.object_path));
        }
        if let Some(exporter) = self.exporter.as_mut() {
            exporter.publish(&self.mirror.snapshot());
        }

        self.registered = Some(window);
        debug!(%window, path = %self.object_path, "registering window with appmenu registrar");
        self.registrar.register_window(window, &self.object_path);
        Ok(())
    }

    /// Mirror an added action; separators are skipped. If no window is
    /// registered yet this opportunistically retries registration with the
    /// last-known identity, so registration happens as soon as the first
    /// real action appears.
    pub fn add_action(&mut self, action: &Rc<MenuAction>, before: Option<ActionId>) {
        if self.mirror.insert(action, before) {
            self.republish();
        }
        if self.registered.is_none() {
            let window = self.window;
            let _ = self.register_window(window);
        }
    }

    /// Drop an action from the mirror; no-op if absent.
    pub fn remove_action(&mut self, id: ActionId) {
        if self.mirror.remove(id) {
            self.republish();
        }
    }

    /// Push flag/text changes of a mirrored action to remote peers.
    pub fn sync_action(&mut self, id: ActionId) {
        if self.mirror.contains(id) {
            self.republish();
        }
    }

    /// Invoke the application callback of a mirrored leaf action, anywhere
    /// in the tree.
    ///
    /// Submenu-owning actions are ignored: a remote click on one of those
    /// is the shell opening its own rendering of the menu, not something
    /// the application reacts to.
    pub fn trigger_action(&mut self, id: ActionId) -> bool {
        let Some(action) = self.mirror.find(id) else {
            return false;
        };
        if action.has_submenu() {
            return false;
        }
        action.trigger();
        true
    }

    /// Ask remote peers to open the menu of a submenu-owning action, on
    /// behalf of the local UI. Leaf actions are ignored.
    pub fn request_popup(&mut self, id: ActionId) -> bool {
        let Some(action) = self.mirror.find(id) else {
            return false;
        };
        if !action.has_submenu() {
            return false;
        }
        if let Some(exporter) = self.exporter.as_mut() {
            exporter.announce_activation(id);
        }
        true
    }

    /// Clear the registered identity without touching the mirror, forcing
    /// the next `register_window` to re-send. Used after a registrar
    /// restart.
    pub fn reset(&mut self) {
        self.registered = None;
    }

    fn republish(&mut self) {
        if let Some(exporter) = self.exporter.as_mut() {
            exporter.publish(&self.mirror.snapshot());
        }
    }
}

impl Drop for RegistrationSession {
    /// Release the registration along with the session, if the registrar
    /// is still there to hear it.
    fn drop(&mut self) {
        if let Some(window) = self.registered {
            if self.registrar.is_reachable() {
                debug!(%window, "unregistering window from appmenu registrar");
                self.registrar.unregister_window(window);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// Records registration calls and simulates registrar presence.
    #[derive(Default)]
    pub struct FakeRegistrar {
        pub reachable: Cell<bool>,
        pub calls: RefCell<Vec<(WindowId, String)>>,
        pub unregisters: RefCell<Vec<WindowId>>,
    }

    impl FakeRegistrar {
        pub fn reachable() -> Rc<Self> {
            let fake = Rc::new(Self::default());
            fake.reachable.set(true);
            fake
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl RegistrarClient for FakeRegistrar {
        fn is_reachable(&self) -> bool {
            self.reachable.get()
        }

        fn register_window(&self, window: WindowId, object_path: &str) {
            self.calls
                .borrow_mut()
                .push((window, object_path.to_string()));
        }

        fn unregister_window(&self, window: WindowId) {
            self.unregisters.borrow_mut().push(window);
        }
    }

    /// Records published sequences and announced activations.
    #[derive(Default)]
    pub struct FakeExporterLog {
        pub published: RefCell<Vec<Vec<ExportedItem>>>,
        pub announced: RefCell<Vec<ActionId>>,
        pub alive: Cell<usize>,
    }

    pub struct FakeExporter {
        path: String,
        log: Rc<FakeExporterLog>,
    }

    impl FakeExporter {
        pub fn factory(log: Rc<FakeExporterLog>) -> ExporterFactory {
            Rc::new(move |path: &str| {
                log.alive.set(log.alive.get() + 1);
                Box::new(FakeExporter {
                    path: path.to_string(),
                    log: log.clone(),
                }) as Box<dyn MenuExporter>
            })
        }
    }

    impl MenuExporter for FakeExporter {
        fn object_path(&self) -> &str {
            &self.path
        }

        fn publish(&mut self, items: &[ExportedItem]) {
            self.log.published.borrow_mut().push(items.to_vec());
        }

        fn announce_activation(&mut self, id: ActionId) {
            self.log.announced.borrow_mut().push(id);
        }
    }

    impl Drop for FakeExporter {
        fn drop(&mut self) {
            self.log.alive.set(self.log.alive.get() - 1);
        }
    }

    pub fn action_list(actions: Vec<Rc<MenuAction>>) -> ActionListHandle {
        Rc::new(RefCell::new(actions))
    }
}
