//! Typed access to the key-value system configuration.
//!
//! The interest engine resolves its rate through this service at
//! computation time; nothing is cached. Validation happens on the update
//! path only: a stored non-positive rate is a valid "skip interest"
//! setting, not an error.

use chrono::Weekday;
use shared::{ConfigEntry, UpdateConfigRequest};
use std::collections::BTreeMap;
use tracing::info;

use crate::db::{DbConnection, CONFIG_DEFAULTS};
use crate::error::{DomainError, DomainResult};

#[derive(Clone)]
pub struct ConfigService {
    db: DbConnection,
}

impl ConfigService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Weekly interest rate as a percentage. Defaults to 2.0 when unset.
    pub async fn interest_rate(&self) -> DomainResult<f64> {
        let raw = self
            .db
            .get_config("interest_rate")
            .await?
            .unwrap_or_else(|| "2.0".to_string());

        raw.parse::<f64>().map_err(|_| {
            DomainError::Configuration(format!("stored interest rate is not a number: {}", raw))
        })
    }

    /// Day of week the weekly interest job runs. Defaults to Sunday.
    pub async fn interest_day(&self) -> DomainResult<Weekday> {
        let raw = self
            .db
            .get_config("interest_day")
            .await?
            .unwrap_or_else(|| "sunday".to_string());

        parse_weekday(&raw).ok_or_else(|| {
            DomainError::Configuration(format!("stored interest day is not a weekday: {}", raw))
        })
    }

    /// All configuration entries, with defaults filled in for keys that
    /// were never stored.
    pub async fn list(&self) -> DomainResult<Vec<ConfigEntry>> {
        let mut entries: BTreeMap<String, ConfigEntry> = CONFIG_DEFAULTS
            .iter()
            .map(|(key, value, description)| {
                (
                    key.to_string(),
                    ConfigEntry {
                        key: key.to_string(),
                        value: value.to_string(),
                        description: Some(description.to_string()),
                    },
                )
            })
            .collect();

        let stored = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT key, value, description FROM system_config",
        )
        .fetch_all(self.db.pool())
        .await?;

        for (key, value, description) in stored {
            entries.insert(key.clone(), ConfigEntry { key, value, description });
        }

        Ok(entries.into_values().collect())
    }

    /// Validate and store the provided configuration fields. All fields are
    /// validated before anything is written, so a bad request leaves the
    /// configuration untouched.
    pub async fn update(&self, request: &UpdateConfigRequest) -> DomainResult<Vec<String>> {
        if let Some(rate) = &request.interest_rate {
            let parsed = rate.trim().parse::<f64>().map_err(|_| {
                DomainError::Configuration(format!("invalid interest rate: {}", rate))
            })?;
            if !(0.0..=100.0).contains(&parsed) {
                return Err(DomainError::Configuration(
                    "interest rate must be between 0 and 100".to_string(),
                ));
            }
        }
        if let Some(day) = &request.interest_day {
            if parse_weekday(day).is_none() {
                return Err(DomainError::Configuration(format!(
                    "invalid interest day: {}",
                    day
                )));
            }
        }

        let mut updated = Vec::new();
        if let Some(rate) = &request.interest_rate {
            self.db.set_config("interest_rate", rate.trim()).await?;
            updated.push("interest_rate".to_string());
        }
        if let Some(day) = &request.interest_day {
            self.db.set_config("interest_day", &day.trim().to_lowercase()).await?;
            updated.push("interest_day".to_string());
        }

        info!("Updated configuration keys: {:?}", updated);
        Ok(updated)
    }
}

/// Parse a day-of-week name such as "sunday" (case-insensitive).
pub(crate) fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
