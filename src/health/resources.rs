//! # Resource Condition Evaluator
//!
//! Merges the condition sets of many sub-resources into one verdict for an
//! aspect. Resources are checked in input order and the first failing
//! resource decides the verdict. For each resource:
//!
//! 1. Outdated status (`observedGeneration < generation`)
//! 2. Missing required condition types
//! 3. Progressing for longer than the threshold (stuck rollout)
//! 4. First unhealthy required condition, preferring the primary type
//!
//! [`CheckPriority::ContentFirst`] moves step 1 behind steps 2-4.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::format_duration;
use crate::conditions::{reasons, Clock, Condition, ConditionStatus, ConditionType};
use crate::config::{CheckPriority, RequiredConditionsConfig};
use crate::store::{find_condition, ObservedCondition, SubResourceStatus};

/// How a required condition is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    /// Healthy only while `True`; `Unknown` is reported like `False`
    MustBeTrue,
    /// Healthy unless `True` for longer than the progressing threshold
    NotProgressing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRequirement {
    pub condition_type: ConditionType,
    pub kind: RequirementKind,
}

impl ConditionRequirement {
    pub fn must_be_true(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            kind: RequirementKind::MustBeTrue,
        }
    }

    pub fn not_progressing(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            kind: RequirementKind::NotProgressing,
        }
    }
}

/// Ordered condition types every sub-resource of an aspect must report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequirements {
    conditions: Vec<ConditionRequirement>,
    /// Structural failures of this type outrank content failures
    primary: Option<ConditionType>,
    missing_reason: String,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            conditions: vec![
                ConditionRequirement::must_be_true(ConditionType::RESOURCES_APPLIED),
                ConditionRequirement::must_be_true(ConditionType::RESOURCES_HEALTHY),
                ConditionRequirement::not_progressing(ConditionType::RESOURCES_PROGRESSING),
            ],
            primary: Some(ConditionType::RESOURCES_APPLIED),
            missing_reason: reasons::MISSING_RESOURCE_CONDITION.to_string(),
        }
    }
}

impl ResourceRequirements {
    pub fn new(conditions: Vec<ConditionRequirement>) -> Self {
        Self {
            conditions,
            primary: None,
            missing_reason: reasons::MISSING_RESOURCE_CONDITION.to_string(),
        }
    }

    #[must_use]
    pub fn with_primary(mut self, condition_type: ConditionType) -> Self {
        self.primary = Some(condition_type);
        self
    }

    #[must_use]
    pub fn with_missing_reason(mut self, reason: impl Into<String>) -> Self {
        self.missing_reason = reason.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl From<&RequiredConditionsConfig> for ResourceRequirements {
    fn from(config: &RequiredConditionsConfig) -> Self {
        let conditions = config
            .must_be_true
            .iter()
            .cloned()
            .map(ConditionRequirement::must_be_true)
            .chain(
                config
                    .not_progressing
                    .iter()
                    .cloned()
                    .map(ConditionRequirement::not_progressing),
            )
            .collect();
        let requirements =
            Self::new(conditions).with_missing_reason(config.missing_reason.clone());
        match &config.primary {
            Some(primary) => requirements.with_primary(primary.clone()),
            None => requirements,
        }
    }
}

/// Why a single resource is not healthy
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceFailure {
    reason: String,
    message: String,
}

impl ResourceFailure {
    fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceConditionEvaluator {
    clock: Arc<dyn Clock>,
    requirements: ResourceRequirements,
    progressing_threshold: Option<Duration>,
    priority: CheckPriority,
}

impl ResourceConditionEvaluator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            requirements: ResourceRequirements::default(),
            progressing_threshold: None,
            priority: CheckPriority::default(),
        }
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: ResourceRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// `None` disables stuck-rollout detection
    #[must_use]
    pub fn with_progressing_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.progressing_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: CheckPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Verdict of the first failing resource, or `None` when all are healthy
    pub fn check(&self, previous: &Condition, resources: &[SubResourceStatus]) -> Option<Condition> {
        let now = self.clock.now();
        resources.iter().find_map(|resource| {
            let failure = self.check_resource(resource, now)?;
            debug!(
                aspect = %previous.condition_type,
                resource = %resource.identity(),
                reason = %failure.reason,
                "Sub-resource is not healthy"
            );
            Some(previous.updated(
                self.clock.as_ref(),
                ConditionStatus::False,
                failure.reason,
                failure.message,
            ))
        })
    }

    /// Like [`check`](Self::check), but healthy resources (including none at
    /// all) yield a `True` condition with the given success reason
    pub fn evaluate(
        &self,
        previous: &Condition,
        resources: &[SubResourceStatus],
        success_reason: &str,
        success_message: &str,
    ) -> Condition {
        self.check(previous, resources).unwrap_or_else(|| {
            previous.updated(
                self.clock.as_ref(),
                ConditionStatus::True,
                success_reason,
                success_message,
            )
        })
    }

    fn check_resource(
        &self,
        resource: &SubResourceStatus,
        now: DateTime<Utc>,
    ) -> Option<ResourceFailure> {
        match self.priority {
            CheckPriority::OutdatedFirst => {
                check_outdated(resource).or_else(|| self.check_content(resource, now))
            }
            CheckPriority::ContentFirst => {
                self.check_content(resource, now).or_else(|| check_outdated(resource))
            }
        }
    }

    fn check_content(
        &self,
        resource: &SubResourceStatus,
        now: DateTime<Utc>,
    ) -> Option<ResourceFailure> {
        self.check_missing(resource)
            .or_else(|| self.check_stuck(resource, now))
            .or_else(|| self.check_unhealthy(resource))
    }

    fn check_missing(&self, resource: &SubResourceStatus) -> Option<ResourceFailure> {
        if self.requirements.is_empty() {
            return None;
        }
        if resource.conditions.is_empty() {
            return Some(ResourceFailure::new(&self.requirements.missing_reason, ""));
        }
        self.requirements
            .conditions
            .iter()
            .find(|req| find_condition(&resource.conditions, &req.condition_type).is_none())
            .map(|req| {
                ResourceFailure::new(&self.requirements.missing_reason, req.condition_type.as_str())
            })
    }

    fn check_stuck(&self, resource: &SubResourceStatus, now: DateTime<Utc>) -> Option<ResourceFailure> {
        let threshold = self.progressing_threshold?;
        let limit = chrono::Duration::from_std(threshold).ok()?;

        self.requirements
            .conditions
            .iter()
            .filter(|req| req.kind == RequirementKind::NotProgressing)
            .filter_map(|req| find_condition(&resource.conditions, &req.condition_type))
            .find(|condition| {
                condition.status == ConditionStatus::True
                    && condition
                        .last_transition_time
                        .is_some_and(|since| now.signed_duration_since(since) > limit)
            })
            .map(|_| {
                ResourceFailure::new(
                    reasons::PROGRESSING_ROLLOUT_STUCK,
                    format!(
                        "{} is progressing for more than {}",
                        resource.identity(),
                        format_duration(threshold)
                    ),
                )
            })
    }

    fn check_unhealthy(&self, resource: &SubResourceStatus) -> Option<ResourceFailure> {
        let unhealthy: Vec<&ObservedCondition> = self
            .requirements
            .conditions
            .iter()
            .filter(|req| req.kind == RequirementKind::MustBeTrue)
            .filter_map(|req| find_condition(&resource.conditions, &req.condition_type))
            .filter(|condition| condition.status != ConditionStatus::True)
            .collect();

        let primary = self.requirements.primary.as_ref().and_then(|primary| {
            unhealthy
                .iter()
                .find(|condition| &condition.condition_type == primary)
        });
        let condition = primary.or_else(|| unhealthy.first())?;

        let reason = if condition.reason.is_empty() {
            reasons::CONDITION_NOT_HEALTHY.to_string()
        } else {
            condition.reason.clone()
        };
        let message = if condition.message.is_empty() {
            format!(
                "{}: condition {:?} has invalid status {} (expected True)",
                resource.identity(),
                condition.condition_type.as_str(),
                condition.status
            )
        } else {
            condition.message.clone()
        };
        Some(ResourceFailure::new(reason, message))
    }
}

fn check_outdated(resource: &SubResourceStatus) -> Option<ResourceFailure> {
    resource.is_outdated().then(|| {
        ResourceFailure::new(
            reasons::OUTDATED_STATUS_ERROR,
            reasons::OUTDATED_STATUS_MESSAGE,
        )
    })
}
