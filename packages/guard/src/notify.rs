//! Danger-zone notifications.

use sarthi_zone_models::RiskZone;

use crate::{NotifyError, config::NotificationConfig};

/// Shows a system notification.
pub trait Notifier: Send + Sync {
    /// Shows `title` and `body` to the user.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the platform refused or failed to show it.
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        log::warn!("{title}: {body}");
        Ok(())
    }
}

/// Fills the notification templates for an entered zone.
#[must_use]
pub fn render(template: &NotificationConfig, zone: &RiskZone, distance_km: f64) -> (String, String) {
    let fill = |text: &str| {
        text.replace("{state}", &zone.state)
            .replace("{level}", zone.risk_level.as_ref())
            .replace("{distance}", &format!("{distance_km:.1}"))
    };
    (fill(&template.title), fill(&template.body))
}

#[cfg(test)]
mod tests {
    use sarthi_zone_models::{Position, RiskLevel};

    use super::*;

    #[test]
    fn fills_placeholders() {
        let zone = RiskZone {
            id: "delhi".to_string(),
            state: "DELHI".to_string(),
            year: Some(2020),
            center: Position::new(28.7041, 77.1025).unwrap(),
            risk_level: RiskLevel::Critical,
            total_crimes: 4_500,
            highest_crime_type: None,
        };

        let (title, body) = render(&NotificationConfig::default(), &zone, 14.98);
        assert_eq!(title, "Danger Zone Alert");
        assert_eq!(
            body,
            "You are 15.0 km from a critical risk area in DELHI. Are you safe?"
        );
    }
}
