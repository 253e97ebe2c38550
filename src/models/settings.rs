//! System settings singleton, stored under the key `"system"`.

use serde::{Deserialize, Serialize};

/// Storage key of the settings document.
pub const SYSTEM_SETTINGS_KEY: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
    pub site_name: String,
    /// Addresses that receive every alert mail
    pub alert_emails: Vec<String>,
    /// Mail when a high-priority issue is reported
    pub high_priority_alerts: bool,
    /// Mail when an inspection finds an amenity out of service
    pub out_of_service_alerts: bool,
    pub ai_analysis_enabled: bool,
    pub inspection_interval_days: u32,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_name: "Station Amenity Tracker".to_string(),
            alert_emails: Vec::new(),
            high_priority_alerts: true,
            out_of_service_alerts: true,
            ai_analysis_enabled: true,
            inspection_interval_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: SystemSettings =
            serde_json::from_str(r#"{"alertEmails": ["ops@example.com"]}"#).unwrap();
        assert_eq!(settings.alert_emails, vec!["ops@example.com".to_string()]);
        assert_eq!(settings.inspection_interval_days, 7);
        assert!(settings.high_priority_alerts);
    }
}
