//! System settings singleton.

use chrono::Utc;
use sqlx::Row;

use super::repository::{timestamp, Repository};
use crate::errors::AppError;
use crate::models::{SystemSettings, SYSTEM_SETTINGS_KEY};

impl Repository {
    /// Read the system settings, falling back to defaults when never saved.
    pub async fn get_settings(&self) -> Result<SystemSettings, AppError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(SYSTEM_SETTINGS_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: String = row.get("value");
                Ok(serde_json::from_str(&value)?)
            }
            None => Ok(SystemSettings::default()),
        }
    }

    /// Replace the system settings.
    pub async fn save_settings(&self, settings: &SystemSettings) -> Result<(), AppError> {
        let value = serde_json::to_string(settings)?;
        sqlx::query(
            r#"INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(SYSTEM_SETTINGS_KEY)
        .bind(&value)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
