//! Registrar service presence tracking.
//!
//! Pure relay logic: owner-change observations are mapped to
//! [`RegistrarEvent`]s, nothing more. The reaction (teardown,
//! re-registration) lives in the controller.

/// Well-known bus name of the appmenu registrar.
pub const REGISTRAR_SERVICE: &str = "com.canonical.AppMenu.Registrar";

/// Object path of the registrar interface.
pub const REGISTRAR_PATH: &str = "/com/canonical/AppMenu/Registrar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrarEvent {
    /// The registrar gained an owner (service started or was replaced).
    Appeared { owner: String },
    /// The registrar lost its owner (service stopped or crashed).
    Disappeared,
}

/// Maps raw owner tokens to presence transitions.
///
/// Holds only the last-known owner; an owner change between two non-empty
/// tokens is reported as a fresh `Appeared` since the new process knows
/// nothing about previous registrations.
#[derive(Debug, Default)]
pub struct OwnerTracker {
    owner: String,
}

impl OwnerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_owner(&self) -> Option<&str> {
        if self.owner.is_empty() {
            None
        } else {
            Some(&self.owner)
        }
    }

    /// Observe the current owner token (empty = absent). Returns the event
    /// to relay, if the observation is a transition.
    pub fn observe(&mut self, new_owner: &str) -> Option<RegistrarEvent> {
        if new_owner == self.owner {
            return None;
        }
        let event = if new_owner.is_empty() {
            RegistrarEvent::Disappeared
        } else {
            RegistrarEvent::Appeared {
                owner: new_owner.to_string(),
            }
        };
        self.owner = new_owner.to_string();
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_absent() {
        let tracker = OwnerTracker::new();
        assert_eq!(tracker.current_owner(), None);
    }

    #[test]
    fn test_appearance() {
        let mut tracker = OwnerTracker::new();
        assert_eq!(
            tracker.observe(":1.42"),
            Some(RegistrarEvent::Appeared {
                owner: ":1.42".to_string()
            })
        );
        assert_eq!(tracker.current_owner(), Some(":1.42"));
    }

    #[test]
    fn test_disappearance() {
        let mut tracker = OwnerTracker::new();
        tracker.observe(":1.42");
        assert_eq!(tracker.observe(""), Some(RegistrarEvent::Disappeared));
        assert_eq!(tracker.current_owner(), None);
    }

    #[test]
    fn test_no_event_without_transition() {
        let mut tracker = OwnerTracker::new();
        assert_eq!(tracker.observe(""), None);
        tracker.observe(":1.42");
        assert_eq!(tracker.observe(":1.42"), None);
    }

    #[test]
    fn test_owner_replacement_reappears() {
        let mut tracker = OwnerTracker::new();
        tracker.observe(":1.42");
        assert_eq!(
            tracker.observe(":1.99"),
            Some(RegistrarEvent::Appeared {
                owner: ":1.99".to_string()
            })
        );
    }
}
