//! Platform permission states.

use sarthi_safety_models::PermissionState;

/// Reports the platform's permission states. Queried once at startup.
pub trait PermissionProbe: Send + Sync {
    /// Location permission.
    fn location(&self) -> PermissionState;

    /// Notification permission.
    fn notifications(&self) -> PermissionState;
}

/// Permission states captured at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Location permission.
    pub location: PermissionState,
    /// Notification permission.
    pub notifications: PermissionState,
}

impl Permissions {
    /// Both permissions granted.
    #[must_use]
    pub const fn granted() -> Self {
        Self {
            location: PermissionState::Granted,
            notifications: PermissionState::Granted,
        }
    }

    /// Queries `probe` once.
    #[must_use]
    pub fn probe(probe: &dyn PermissionProbe) -> Self {
        let permissions = Self {
            location: probe.location(),
            notifications: probe.notifications(),
        };
        log::debug!(
            "Permissions: location={}, notifications={}",
            permissions.location,
            permissions.notifications
        );
        permissions
    }

    /// Whether danger-zone notifications may be shown.
    #[must_use]
    pub const fn may_notify(&self) -> bool {
        matches!(self.notifications, PermissionState::Granted)
    }
}

impl PermissionProbe for Permissions {
    fn location(&self) -> PermissionState {
        self.location
    }

    fn notifications(&self) -> PermissionState {
        self.notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_need_explicit_grant() {
        assert!(Permissions::granted().may_notify());
        assert!(!Permissions::default().may_notify());
        assert!(
            !Permissions {
                notifications: PermissionState::Denied,
                ..Permissions::granted()
            }
            .may_notify()
        );
    }

    #[test]
    fn probe_copies_states() {
        let fixed = Permissions {
            location: PermissionState::Denied,
            notifications: PermissionState::Granted,
        };
        assert_eq!(Permissions::probe(&fixed), fixed);
    }
}
