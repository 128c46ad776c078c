//! Client side of `com.canonical.AppMenu.Registrar`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use zbus::names::BusName;
use zbus::zvariant::ObjectPath;

use crate::session::{RegistrarClient, WindowId};
use crate::watcher::{OwnerTracker, RegistrarEvent, REGISTRAR_PATH, REGISTRAR_SERVICE};

#[zbus::proxy(
    interface = "com.canonical.AppMenu.Registrar",
    default_service = "com.canonical.AppMenu.Registrar",
    default_path = "/com/canonical/AppMenu/Registrar"
)]
trait AppMenuRegistrar {
    fn register_window(&self, window_id: u32, menu_object_path: ObjectPath<'_>)
        -> zbus::Result<()>;

    fn unregister_window(&self, window_id: u32) -> zbus::Result<()>;
}

/// Bus-backed [`RegistrarClient`].
///
/// Reachability mirrors the service's current ownership, maintained by the
/// watcher task through the shared flag; registration calls are spawned
/// with no reply expected, so dropping the session while a call is in
/// flight is always safe.
#[derive(Clone)]
pub struct BusRegistrarClient {
    proxy: AppMenuRegistrarProxy<'static>,
    available: Arc<AtomicBool>,
}

impl BusRegistrarClient {
    pub async fn new(connection: &zbus::Connection) -> zbus::Result<Self> {
        let proxy = AppMenuRegistrarProxy::new(connection).await?;
        Ok(Self {
            proxy,
            available: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared presence flag, handed to [`RegistrarWatcher::spawn`].
    pub fn availability(&self) -> Arc<AtomicBool> {
        self.available.clone()
    }
}

impl RegistrarClient for BusRegistrarClient {
    fn is_reachable(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn register_window(&self, window: WindowId, object_path: &str) {
        let path = match ObjectPath::try_from(object_path.to_string()) {
            Ok(path) => path,
            Err(err) => {
                warn!(%window, object_path, error = %err, "invalid menu object path");
                return;
            }
        };
        let proxy = self.proxy.clone();
        tokio::spawn(async move {
            // Fire-and-forget: the result is never observed, convergence is
            // watcher-driven.
            if let Err(err) = proxy
                .inner()
                .call_noreply("RegisterWindow", &(window.0, path))
                .await
            {
                debug!(%window, error = %err, "RegisterWindow could not be sent");
            }
        });
    }

    fn unregister_window(&self, window: WindowId) {
        let proxy = self.proxy.clone();
        tokio::spawn(async move {
            if let Err(err) = proxy
                .inner()
                .call_noreply("UnregisterWindow", &window.0)
                .await
            {
                debug!(%window, error = %err, "UnregisterWindow could not be sent");
            }
        });
    }
}

/// Observes registrar ownership changes and relays them as
/// [`RegistrarEvent`]s for the host event loop to drain.
pub struct RegistrarWatcher {
    events: mpsc::UnboundedReceiver<RegistrarEvent>,
    task: tokio::task::JoinHandle<()>,
}

impl RegistrarWatcher {
    /// Subscribe to `NameOwnerChanged` for the registrar name. The shared
    /// `available` flag is kept in sync with service presence so the
    /// registrar client can answer reachability without a bus round-trip.
    pub async fn spawn(
        connection: &zbus::Connection,
        available: Arc<AtomicBool>,
    ) -> zbus::Result<Self> {
        let dbus = zbus::fdo::DBusProxy::new(connection).await?;
        let mut changes = dbus
            .receive_name_owner_changed_with_args(&[(0, REGISTRAR_SERVICE)])
            .await?;

        let (tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut tracker = OwnerTracker::new();

            // Initial probe: the registrar may already be up.
            let name = BusName::try_from(REGISTRAR_SERVICE).expect("well-known name is valid");
            let initial = match dbus.get_name_owner(name).await {
                Ok(owner) => owner.to_string(),
                Err(_) => String::new(),
            };
            if let Some(event) = tracker.observe(&initial) {
                available.store(tracker.current_owner().is_some(), Ordering::Relaxed);
                if tx.send(event).is_err() {
                    return;
                }
            }

            while let Some(signal) = changes.next().await {
                let Ok(args) = signal.args() else { continue };
                let new_owner = args
                    .new_owner()
                    .as_ref()
                    .map(|owner| owner.to_string())
                    .unwrap_or_default();
                trace!(service = REGISTRAR_SERVICE, owner = %new_owner, "registrar owner changed");
                if let Some(event) = tracker.observe(&new_owner) {
                    available.store(tracker.current_owner().is_some(), Ordering::Relaxed);
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        debug!(service = REGISTRAR_SERVICE, path = REGISTRAR_PATH, "watching registrar presence");
        Ok(Self { events, task })
    }

    /// Non-blocking drain, for hosts that poll from their own loop.
    pub fn try_next(&mut self) -> Option<RegistrarEvent> {
        self.events.try_recv().ok()
    }

    /// Await the next presence transition.
    pub async fn next(&mut self) -> Option<RegistrarEvent> {
        self.events.recv().await
    }
}

impl Drop for RegistrarWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
