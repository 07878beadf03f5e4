//! # Condition Types
//!
//! The value type for one named health aspect and its transition rules.
//!
//! A condition is never mutated in place by the evaluators. Each evaluation
//! produces a successor through [`Condition::updated`], which applies the two
//! timestamp invariants:
//!
//! - `last_transition_time` moves only when the status changes
//! - `last_update_time` moves whenever status, reason or message changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use super::clock::Clock;
use super::reasons;

/// Status of a condition
///
/// `Progressing` is a transient state reported by sub-resources and extensions
/// while a rollout is underway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
    Progressing,
}

impl ConditionStatus {
    /// Severity rank used when merging reports: `False > Unknown > Progressing > True`
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::True => 0,
            Self::Progressing => 1,
            Self::Unknown => 2,
            Self::False => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
            Self::Progressing => "Progressing",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a condition
///
/// Aspect types produced by this crate are exposed as constants. Sub-resources
/// and extensions report their own types, so the set is open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionType(Cow<'static, str>);

impl ConditionType {
    pub const SYSTEM_COMPONENTS_HEALTHY: Self = Self::from_static("SystemComponentsHealthy");
    pub const OBSERVABILITY_COMPONENTS_HEALTHY: Self =
        Self::from_static("ObservabilityComponentsHealthy");
    pub const EXTENSIONS_HEALTHY: Self = Self::from_static("ExtensionsHealthy");

    // Sub-resource condition types
    pub const RESOURCES_APPLIED: Self = Self::from_static("ResourcesApplied");
    pub const RESOURCES_HEALTHY: Self = Self::from_static("ResourcesHealthy");
    pub const RESOURCES_PROGRESSING: Self = Self::from_static("ResourcesProgressing");

    // Controller installation condition types
    pub const INSTALLATION_VALID: Self = Self::from_static("Valid");
    pub const INSTALLATION_INSTALLED: Self = Self::from_static("Installed");
    pub const INSTALLATION_HEALTHY: Self = Self::from_static("Healthy");

    // Workload and monitoring-instance condition types
    pub const AVAILABLE: Self = Self::from_static("Available");
    pub const RECONCILED: Self = Self::from_static("Reconciled");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ConditionType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A typed, timestamped verdict for one aspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition that has been observed but not yet evaluated
    pub fn initialized(clock: &dyn Clock, condition_type: ConditionType) -> Self {
        let now = clock.now();
        Self {
            condition_type,
            status: ConditionStatus::Unknown,
            reason: reasons::CONDITION_INITIALIZED.to_string(),
            message: reasons::CONDITION_INITIALIZED_MESSAGE.to_string(),
            last_transition_time: now,
            last_update_time: now,
        }
    }

    /// Return the condition of the given type from `conditions`, or a freshly
    /// initialized one when it is absent
    pub fn get_or_init(
        clock: &dyn Clock,
        conditions: &[Condition],
        condition_type: &ConditionType,
    ) -> Self {
        conditions
            .iter()
            .find(|c| &c.condition_type == condition_type)
            .cloned()
            .unwrap_or_else(|| Self::initialized(clock, condition_type.clone()))
    }

    /// Produce the successor of this condition
    #[must_use]
    pub fn updated(
        &self,
        clock: &dyn Clock,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let now = clock.now();
        let reason = reason.into();
        let message = message.into();

        let mut next = self.clone();
        if self.status != status {
            next.last_transition_time = now;
        }
        if self.status != status || self.reason != reason || self.message != message {
            next.last_update_time = now;
        }
        next.status = status;
        next.reason = reason;
        next.message = message;
        next
    }

    /// Successor reporting that the check itself could not be performed
    #[must_use]
    pub fn updated_unknown_error(&self, clock: &dyn Clock, message: impl Into<String>) -> Self {
        self.updated(
            clock,
            ConditionStatus::Unknown,
            reasons::CONDITION_CHECK_ERROR,
            message,
        )
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Advance `previous` with the outcome of an evaluator
///
/// An error becomes an `Unknown` condition carrying the error text; an absent
/// verdict becomes `Unknown` as well, since every aspect evaluation is expected
/// to conclude with a verdict.
pub fn new_condition_or_error<E: fmt::Display>(
    clock: &dyn Clock,
    previous: &Condition,
    outcome: Result<Option<Condition>, E>,
) -> Condition {
    match outcome {
        Ok(Some(condition)) => condition,
        Ok(None) => previous.updated_unknown_error(clock, reasons::NO_VERDICT_MESSAGE),
        Err(err) => previous.updated_unknown_error(clock, err.to_string()),
    }
}
