//! Per-window menu bar control.
//!
//! `MenuBarController` reacts to widget lifecycle events (reparenting,
//! window-id changes, native-mode toggling), owns the registration session
//! and falls back to in-window rendering when no registrar is available.
//!
//! The host event loop drives the controller with discrete events and is
//! expected to call [`MenuBarController::process_pending`] once per loop
//! iteration: re-registration requested from inside a service-presence
//! callback is queued there instead of running reentrantly. While
//! [`MenuBarController::wants_visibility_poll`] is true the host arms a
//! [`crate::visibility::POLL_INTERVAL`] timer and forwards ticks to
//! [`MenuBarController::tick_visibility`].

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info};

use crate::action::{ActionEvent, ActionId, ActionListHandle};
use crate::config::AppMenuConfig;
use crate::error::RegisterError;
use crate::session::{ExporterFactory, RegistrarClient, RegistrationSession, WindowId};
use crate::visibility::VisibilityMonitor;
use crate::watcher::RegistrarEvent;

/// In-window fallback rendering, provided by the widget toolkit.
pub trait LocalMenuBar {
    fn set_visible(&mut self, visible: bool);

    /// Reserve layout space for the fallback bar.
    fn reserve_space(&mut self, reserve: bool);

    /// Action-list mutations, for toolkits that render from them.
    fn action_event(&mut self, _event: &ActionEvent) {}
}

/// Capability set of a menu bar implementation, selected at application
/// wiring time by [`create_backend`].
pub trait MenuBarBackend {
    fn init(&mut self, actions: ActionListHandle);
    fn handle_reparent(&mut self, window: Option<WindowId>);
    fn action_event(&mut self, event: ActionEvent);
    fn set_native_mode(&mut self, enabled: bool);
}

/// Per-controller native-mode preference; `Unset` defers to the process
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeModePreference {
    #[default]
    Unset,
    ForcedOff,
    ForcedOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuBarState {
    /// No session; local rendering active.
    Inert,
    /// Native mode desired, session absent because no window yet.
    NativePending,
    /// Session exists, registration attempted.
    NativeActive,
}

static NEXT_MENU_BAR_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a process-unique, monotonically-numbered object path. Assigned
/// once per controller and stable for its lifetime.
fn allocate_object_path() -> String {
    format!("/MenuBar/{}", NEXT_MENU_BAR_ID.fetch_add(1, Ordering::Relaxed))
}

pub struct MenuBarController {
    config: AppMenuConfig,
    registrar: Rc<dyn RegistrarClient>,
    make_exporter: ExporterFactory,
    local: Box<dyn LocalMenuBar>,
    actions: ActionListHandle,
    object_path: String,
    window: Option<WindowId>,
    preference: NativeModePreference,
    state: MenuBarState,
    session: Option<RegistrationSession>,
    monitor: VisibilityMonitor,
    register_queued: bool,
}

impl MenuBarController {
    pub fn new(
        config: AppMenuConfig,
        registrar: Rc<dyn RegistrarClient>,
        make_exporter: ExporterFactory,
        local: Box<dyn LocalMenuBar>,
    ) -> Self {
        Self {
            config,
            registrar,
            make_exporter,
            local,
            actions: ActionListHandle::default(),
            object_path: allocate_object_path(),
            window: None,
            preference: NativeModePreference::Unset,
            state: MenuBarState::Inert,
            session: None,
            monitor: VisibilityMonitor::new(),
            register_queued: false,
        }
    }

    // === Getters ===

    pub fn state(&self) -> MenuBarState {
        self.state
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn registered_window(&self) -> Option<WindowId> {
        self.session.as_ref().and_then(|s| s.registered_window())
    }

    pub fn is_native_mode(&self) -> bool {
        match self.preference {
            NativeModePreference::Unset => !self.config.native_disabled,
            NativeModePreference::ForcedOff => false,
            NativeModePreference::ForcedOn => true,
        }
    }

    pub fn wants_visibility_poll(&self) -> bool {
        self.monitor.is_active()
    }

    // === Widget lifecycle ===

    /// The menu bar was attached to a (possibly new) top-level window.
    pub fn handle_reparent(&mut self, window: Option<WindowId>) {
        self.window = window;
        if self.is_native_mode() {
            self.try_activate();
        }
    }

    /// The window identity changed underneath us (e.g. the native window
    /// was recreated). Re-registration is queued rather than run from
    /// inside the notification.
    pub fn handle_window_changed(&mut self, window: Option<WindowId>) {
        self.window = window;
        if self.is_native_mode() && self.session.is_some() {
            self.register_queued = true;
        }
    }

    /// Toggle this controller's native-mode preference.
    pub fn set_native_mode(&mut self, enabled: bool) {
        let was_native = self.is_native_mode();
        self.preference = if enabled {
            NativeModePreference::ForcedOn
        } else {
            NativeModePreference::ForcedOff
        };

        if !enabled {
            if was_native {
                info!(path = %self.object_path, "native menu bar disabled, using local rendering");
                self.teardown_to_inert();
            }
        } else if !was_native {
            if self.window.is_some() {
                self.try_activate();
            } else {
                self.state = MenuBarState::NativePending;
            }
        }
    }

    /// Action-list mutation from the widget layer. The application has
    /// already applied the mutation to its own list.
    pub fn action_event(&mut self, event: ActionEvent) {
        self.local.action_event(&event);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match event {
            ActionEvent::Added { action, before } => session.add_action(&action, before),
            ActionEvent::Removed { id } => session.remove_action(id),
            ActionEvent::Changed { id } => session.sync_action(id),
        }
    }

    /// The local UI asked to open a menu. Only actions that own a submenu
    /// are forwarded.
    pub fn popup_action(&mut self, id: ActionId) {
        if let Some(session) = self.session.as_mut() {
            session.request_popup(id);
        }
    }

    /// A remote peer clicked a published item. Submenu-owning items are
    /// left alone; the shell renders those itself.
    pub fn handle_activation_request(&mut self, id: ActionId) {
        if let Some(session) = self.session.as_mut() {
            session.trigger_action(id);
        }
    }

    // === Registrar presence ===

    pub fn handle_registrar_event(&mut self, event: RegistrarEvent) {
        match event {
            RegistrarEvent::Appeared { owner } => {
                debug!(%owner, "appmenu registrar appeared");
                if let Some(session) = self.session.as_mut() {
                    session.reset();
                }
                if self.is_native_mode() {
                    // Deferred: we may be inside the presence notification.
                    self.register_queued = true;
                }
            }
            RegistrarEvent::Disappeared => {
                debug!("appmenu registrar disappeared");
                self.teardown_to_inert();
            }
        }
    }

    /// Drain deferred work; the host calls this once per event-loop
    /// iteration.
    pub fn process_pending(&mut self) {
        if std::mem::take(&mut self.register_queued) && self.is_native_mode() {
            self.try_activate();
        }
    }

    /// Reconcile fallback visibility with the window's maximized state.
    pub fn tick_visibility(&mut self, maximized: bool) {
        self.monitor.tick(maximized, self.local.as_mut());
    }

    // === Internal transitions ===

    /// Create the session if needed and attempt registration, moving to
    /// the state the outcome dictates.
    fn try_activate(&mut self) {
        if !self.is_native_mode() {
            return;
        }
        if self.session.is_none() {
            self.session = Some(RegistrationSession::new(
                self.registrar.clone(),
                self.make_exporter.clone(),
                self.actions.clone(),
                self.object_path.clone(),
            ));
        }
        let window = self.window;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.register_window(window) {
            Ok(()) => self.enter_native_active(),
            Err(RegisterError::NoWindow) => {
                self.session = None;
                self.state = MenuBarState::NativePending;
            }
            Err(RegisterError::RegistrarUnavailable) => {
                self.teardown_to_inert();
            }
        }
    }

    fn enter_native_active(&mut self) {
        self.state = MenuBarState::NativeActive;
        if self.config.display_both {
            self.monitor.stop();
        } else {
            self.local.set_visible(false);
            self.monitor.start();
        }
    }

    /// Destroy the session (releasing the exporter), stop the visibility
    /// poll and make the local bar visible again.
    fn teardown_to_inert(&mut self) {
        self.session = None;
        self.monitor.stop();
        self.local.set_visible(true);
        self.state = MenuBarState::Inert;
    }
}

impl MenuBarBackend for MenuBarController {
    fn init(&mut self, actions: ActionListHandle) {
        self.actions = actions;
        self.local.reserve_space(self.config.reserve_fallback_space());
        if self.is_native_mode() {
            self.state = MenuBarState::NativePending;
        }
    }

    fn handle_reparent(&mut self, window: Option<WindowId>) {
        MenuBarController::handle_reparent(self, window);
    }

    fn action_event(&mut self, event: ActionEvent) {
        MenuBarController::action_event(self, event);
    }

    fn set_native_mode(&mut self, enabled: bool) {
        MenuBarController::set_native_mode(self, enabled);
    }
}

/// Menu bar backend that never talks to a registrar; used when the process
/// policy disables native mode.
pub struct LocalOnlyMenuBar {
    local: Box<dyn LocalMenuBar>,
}

impl LocalOnlyMenuBar {
    pub fn new(local: Box<dyn LocalMenuBar>) -> Self {
        Self { local }
    }
}

impl MenuBarBackend for LocalOnlyMenuBar {
    fn init(&mut self, _actions: ActionListHandle) {
        self.local.reserve_space(true);
        self.local.set_visible(true);
    }

    fn handle_reparent(&mut self, _window: Option<WindowId>) {}

    fn action_event(&mut self, event: ActionEvent) {
        self.local.action_event(&event);
    }

    fn set_native_mode(&mut self, enabled: bool) {
        if enabled {
            debug!("native menu bar disabled for this process, ignoring request");
        }
    }
}

/// Select the menu bar implementation for this process.
pub fn create_backend(
    config: AppMenuConfig,
    registrar: Rc<dyn RegistrarClient>,
    make_exporter: ExporterFactory,
    local: Box<dyn LocalMenuBar>,
) -> Box<dyn MenuBarBackend> {
    if config.native_disabled {
        info!("native menu bar disabled by process policy");
        Box::new(LocalOnlyMenuBar::new(local))
    } else {
        Box::new(MenuBarController::new(
            config,
            registrar,
            make_exporter,
            local,
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    /// Shared view on a [`FakeLocalBar`], kept by the test after the bar
    /// is boxed into a controller.
    #[derive(Clone, Default)]
    pub struct LocalBarProbe {
        visible: Rc<Cell<bool>>,
        reserved: Rc<Cell<bool>>,
        set_visible_calls: Rc<Cell<usize>>,
        action_events: Rc<Cell<usize>>,
    }

    impl LocalBarProbe {
        pub fn visible(&self) -> bool {
            self.visible.get()
        }

        pub fn set_visible_initial(&self, visible: bool) {
            self.visible.set(visible);
        }

        pub fn reserved(&self) -> bool {
            self.reserved.get()
        }

        pub fn set_visible_calls(&self) -> usize {
            self.set_visible_calls.get()
        }

        pub fn action_events(&self) -> usize {
            self.action_events.get()
        }
    }

    pub struct FakeLocalBar {
        probe: LocalBarProbe,
    }

    impl FakeLocalBar {
        pub fn new() -> (Box<dyn LocalMenuBar>, LocalBarProbe) {
            let probe = LocalBarProbe::default();
            (
                Box::new(FakeLocalBar {
                    probe: probe.clone(),
                }),
                probe,
            )
        }
    }

    impl LocalMenuBar for FakeLocalBar {
        fn set_visible(&mut self, visible: bool) {
            self.probe.visible.set(visible);
            self.probe
                .set_visible_calls
                .set(self.probe.set_visible_calls.get() + 1);
        }

        fn reserve_space(&mut self, reserve: bool) {
            self.probe.reserved.set(reserve);
        }

        fn action_event(&mut self, _event: &ActionEvent) {
            self.probe
                .action_events
                .set(self.probe.action_events.get() + 1);
        }
    }
}
