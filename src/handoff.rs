//! Hand-off of risk results between screens.
//!
//! The checker screen stores the latest assessment in a [`RiskResultSlot`]
//! (lives as long as the process) and appends it to the persisted
//! [`RecentChecks`] list. The result screen reads the slot and goes back to
//! the checker when it is empty.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::guard::{Redirect, RedirectReason, paths};
use crate::store::{KeyValueStore, StoreError};

pub const RECENT_CHECKS_KEY: &str = "recentRiskChecks";
pub const RECENT_CHECKS_LIMIT: usize = 10;

/// Result of `POST /risk/check`. Only the fields the client acts on are
/// typed; the rest is passed through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub device: AssessedDevice,
    #[serde(flatten)]
    pub details: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessedDevice {
    pub id: JsonValue,
    pub risk_class: String,
    pub risk_percentage: f64,
    #[serde(flatten)]
    pub details: serde_json::Map<String, JsonValue>,
}

/// Single slot holding the most recent assessment.
#[derive(Debug, Default)]
pub struct RiskResultSlot {
    current: Mutex<Option<RiskAssessment>>,
}

impl RiskResultSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, assessment: RiskAssessment) {
        *self.current.lock() = Some(assessment);
    }

    #[must_use]
    pub fn get(&self) -> Option<RiskAssessment> {
        self.current.lock().clone()
    }

    /// The stored assessment, or a redirect back to the screen that produces one.
    ///
    /// # Errors
    ///
    /// Returns a redirect to the device risk checker when the slot is empty.
    pub fn require(&self) -> Result<RiskAssessment, Redirect> {
        self.get().ok_or(Redirect {
            target: paths::DEVICE_RISK_CHECKER,
            reason: RedirectReason::MissingResult,
        })
    }

    pub fn clear(&self) {
        self.current.lock().take();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCheck {
    /// Unix milliseconds at the time of the check.
    pub id: i64,
    pub date: String,
    pub manufacturer: String,
    pub device: String,
    pub risk_class: String,
    pub risk_percentage: f64,
}

impl RecentCheck {
    #[must_use]
    pub fn new(manufacturer: &str, device: &str, assessment: &RiskAssessment) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX),
            date: now.date().to_string(),
            manufacturer: manufacturer.to_owned(),
            device: device.to_owned(),
            risk_class: assessment.device.risk_class.clone(),
            risk_percentage: assessment.device.risk_percentage,
        }
    }
}

/// Persisted list of the last [`RECENT_CHECKS_LIMIT`] checks, newest first.
pub struct RecentChecks {
    store: Arc<dyn KeyValueStore>,
}

impl RecentChecks {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored checks. Missing or corrupt history reads as empty.
    #[must_use]
    pub fn list(&self) -> Vec<RecentCheck> {
        match self.store.get(RECENT_CHECKS_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring corrupt recent checks");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read recent checks");
                Vec::new()
            }
        }
    }

    /// Prepend `check`, dropping the oldest beyond the limit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the updated list cannot be written.
    pub fn record(&self, check: RecentCheck) -> Result<Vec<RecentCheck>, StoreError> {
        let mut checks = self.list();
        checks.insert(0, check);
        checks.truncate(RECENT_CHECKS_LIMIT);
        let json = serde_json::to_string(&checks)?;
        self.store.set(RECENT_CHECKS_KEY, &json)?;
        Ok(checks)
    }
}
