use thiserror::Error;

/// Registration failures.
///
/// Neither variant is fatal: `NoWindow` is retried on the next
/// window-available event, `RegistrarUnavailable` degrades to local
/// rendering until the watcher reports the registrar back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("menu bar has no window to register")]
    NoWindow,
    #[error("appmenu registrar is not reachable")]
    RegistrarUnavailable,
}
