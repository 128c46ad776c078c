//! Periodic fallback-visibility check.
//!
//! There is no notification for the host window entering or leaving the
//! maximized state, so while a native registration is active (and show-both
//! is off) the host arms a 100ms timer and calls [`VisibilityMonitor::tick`]
//! with the current maximized flag. The contract: the local bar is hidden
//! unless the window is maximized. If the platform ever grows a real
//! maximize/restore notification, feed it through `tick` instead of polling.

use std::time::Duration;

use crate::controller::LocalMenuBar;

/// Poll interval the host should use while the monitor is active.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct VisibilityMonitor {
    active: bool,
}

impl VisibilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Arm the monitor; ticks are ignored while stopped.
    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Reconcile local-bar visibility with the window's maximized state.
    pub fn tick(&self, maximized: bool, local: &mut dyn LocalMenuBar) {
        if !self.active {
            return;
        }
        local.set_visible(maximized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::FakeLocalBar;

    #[test]
    fn test_inactive_monitor_leaves_visibility_alone() {
        let monitor = VisibilityMonitor::new();
        let (mut bar, probe) = FakeLocalBar::new();
        probe.set_visible_initial(true);

        monitor.tick(false, bar.as_mut());
        assert!(probe.visible());
    }

    #[test]
    fn test_visibility_follows_maximized_state() {
        let mut monitor = VisibilityMonitor::new();
        monitor.start();
        let (mut bar, probe) = FakeLocalBar::new();

        monitor.tick(false, bar.as_mut());
        assert!(!probe.visible());

        monitor.tick(true, bar.as_mut());
        assert!(probe.visible());
    }

    #[test]
    fn test_stop_disarms() {
        let mut monitor = VisibilityMonitor::new();
        monitor.start();
        monitor.stop();
        let (mut bar, probe) = FakeLocalBar::new();
        probe.set_visible_initial(true);

        monitor.tick(false, bar.as_mut());
        assert!(probe.visible());
    }
}
