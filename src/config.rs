//! Process-scoped appmenu policy.
//!
//! Read once at startup and passed to every controller explicitly; nothing
//! here latches global state behind the caller's back.

/// Suppresses native mode for the whole process, forcing local rendering.
pub const ENV_NO_NATIVE_MENUBAR: &str = "APPMENU_NO_NATIVE_MENUBAR";

/// Keeps local rendering visible even when native registration succeeds.
pub const ENV_DISPLAY_BOTH: &str = "APPMENU_DISPLAY_BOTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppMenuConfig {
    /// Native mode is never attempted for this process.
    pub native_disabled: bool,
    /// Show the in-window bar alongside a successful native registration.
    pub display_both: bool,
}

impl AppMenuConfig {
    /// Derive the process policy from the environment.
    pub fn from_env() -> Self {
        let native_disabled = std::env::var(ENV_NO_NATIVE_MENUBAR)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        let display_both = std::env::var(ENV_DISPLAY_BOTH)
            .map(|v| v == "1")
            .unwrap_or(false);
        Self {
            native_disabled,
            display_both,
        }
    }

    /// Space for the in-window fallback bar is reserved unconditionally:
    /// the registrar may disappear at any time and the fallback must be
    /// able to take over without a relayout.
    pub fn reserve_fallback_space(&self) -> bool {
        true
    }
}
