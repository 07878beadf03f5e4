//! # Care Configuration
//!
//! Typed configuration for the health engine. Every recognized option is a
//! field here; nothing is looked up from globals at evaluation time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cluster_care::config::CareConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // File is optional; CARE_* environment variables override it
//! let config = CareConfig::load(Some("config/care.toml".as_ref()))?;
//! let timeout = config.alerts.query_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::conditions::{reasons, ConditionType};
use crate::store::{LabelSelector, SubResourceStatus};

pub use error::{ConfigResult, ConfigurationError};

/// Label on sub-resources naming the aspect they belong to
pub const LABEL_CARE_CONDITION_TYPE: &str = "care.cluster-care.io/condition-type";

/// Annotation excluding a sub-resource from alert checking
pub const DEFAULT_IGNORE_ANNOTATION: &str = "resources.cluster-care.io/ignore";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    /// Namespaces whose sub-resources and extension reports are read every pass
    pub namespaces: Vec<String>,
    /// Budget for one complete pass across all aspects (milliseconds)
    pub pass_timeout_ms: u64,
    pub resources: ResourceCheckConfig,
    pub extensions: ExtensionCheckConfig,
    pub alerts: AlertQueryConfig,
    pub aspects: Vec<AspectConfig>,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            namespaces: vec!["garden".to_string(), "istio-system".to_string()],
            pass_timeout_ms: 30_000,
            resources: ResourceCheckConfig::default(),
            extensions: ExtensionCheckConfig::default(),
            alerts: AlertQueryConfig::default(),
            aspects: vec![
                AspectConfig::system_components(),
                AspectConfig::observability_components(),
            ],
        }
    }
}

impl CareConfig {
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_millis(self.pass_timeout_ms)
    }

    pub fn aspect_types(&self) -> Vec<ConditionType> {
        self.aspects
            .iter()
            .map(|a| a.condition_type.clone())
            .collect()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespaces.is_empty() || self.namespaces.iter().any(String::is_empty) {
            return Err(ConfigurationError::invalid(
                "namespaces",
                "at least one non-empty namespace is required",
            ));
        }
        if self.pass_timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "pass_timeout_ms",
                "must be greater than zero",
            ));
        }
        self.alerts.validate()?;

        let mut seen = HashSet::new();
        for aspect in &self.aspects {
            if aspect.condition_type.as_str().is_empty() {
                return Err(ConfigurationError::invalid(
                    "aspects.condition_type",
                    "must not be empty",
                ));
            }
            if !seen.insert(aspect.condition_type.clone()) {
                return Err(ConfigurationError::invalid(
                    "aspects.condition_type",
                    format!("duplicate aspect {}", aspect.condition_type),
                ));
            }
            aspect.required_conditions.validate(&aspect.condition_type)?;
            if let Some(workloads) = &aspect.required_workloads {
                if workloads.namespace.is_empty() {
                    return Err(ConfigurationError::invalid(
                        "aspects.required_workloads.namespace",
                        format!("must not be empty for aspect {}", aspect.condition_type),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Which per-resource check wins when a resource is both outdated and failing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPriority {
    /// A stale status is reported before anything it says
    #[default]
    OutdatedFirst,
    /// Content failures are reported first; staleness only when content is healthy
    ContentFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCheckConfig {
    /// Default progressing threshold (seconds). Unset disables stuck-rollout detection.
    pub progressing_threshold_secs: Option<u64>,
    pub check_priority: CheckPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionCheckConfig {
    /// Maximum heartbeat age (seconds). Unset disables staleness checking.
    pub outdated_threshold_secs: Option<u64>,
}

impl ExtensionCheckConfig {
    pub fn outdated_threshold(&self) -> Option<Duration> {
        self.outdated_threshold_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertQueryConfig {
    /// Timeout of a single replica query (milliseconds)
    pub query_timeout_ms: u64,
    /// Upper bound on replica queries in flight per instance
    pub max_concurrent_queries: usize,
    pub ignore_annotation: String,
    pub service_prefix: String,
    pub default_service_name: String,
    pub cluster_domain: String,
    pub port: u16,
}

impl Default for AlertQueryConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 5_000,
            max_concurrent_queries: 8,
            ignore_annotation: DEFAULT_IGNORE_ANNOTATION.to_string(),
            service_prefix: "prometheus".to_string(),
            default_service_name: "prometheus-operated".to_string(),
            cluster_domain: "svc.cluster.local".to_string(),
            port: 9090,
        }
    }
}

impl AlertQueryConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.query_timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "alerts.query_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(ConfigurationError::invalid(
                "alerts.max_concurrent_queries",
                "must be greater than zero",
            ));
        }
        if self.port == 0 {
            return Err(ConfigurationError::invalid("alerts.port", "must not be 0"));
        }
        for (field, value) in [
            ("alerts.ignore_annotation", &self.ignore_annotation),
            ("alerts.service_prefix", &self.service_prefix),
            ("alerts.default_service_name", &self.default_service_name),
            ("alerts.cluster_domain", &self.cluster_domain),
        ] {
            if value.is_empty() {
                return Err(ConfigurationError::invalid(field, "must not be empty"));
            }
        }
        Ok(())
    }
}

/// How a sub-resource label is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMatch {
    #[default]
    Any,
    Equals,
    NotEquals,
}

/// Predicate selecting the sub-resources that belong to an aspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceFilter {
    /// Only resources with a deployment class are health-relevant
    pub require_class: bool,
    pub label_key: String,
    pub label_value: String,
    pub label_match: LabelMatch,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self {
            require_class: true,
            label_key: LABEL_CARE_CONDITION_TYPE.to_string(),
            label_value: String::new(),
            label_match: LabelMatch::Any,
        }
    }
}

impl ResourceFilter {
    pub fn matches(&self, resource: &SubResourceStatus) -> bool {
        if self.require_class && resource.class.is_none() {
            return false;
        }
        let label = resource
            .labels
            .get(&self.label_key)
            .map(String::as_str)
            .unwrap_or_default();
        match self.label_match {
            LabelMatch::Any => true,
            LabelMatch::Equals => label == self.label_value,
            LabelMatch::NotEquals => label != self.label_value,
        }
    }
}

/// Workloads that must exist and be available for an aspect to be healthy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredWorkloadsConfig {
    pub namespace: String,
    pub names: Vec<String>,
    pub selector: LabelSelector,
}

/// Condition types every sub-resource of an aspect must report
///
/// Defaults to the managed-resource set: `ResourcesApplied` and
/// `ResourcesHealthy` must be `True`, `ResourcesProgressing` must not be stuck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredConditionsConfig {
    /// Must be `True`, checked in this order
    pub must_be_true: Vec<ConditionType>,
    /// Must not stay `True` past the progressing threshold
    #[serde(default)]
    pub not_progressing: Vec<ConditionType>,
    /// Failures of this type are reported before other failing conditions
    #[serde(default)]
    pub primary: Option<ConditionType>,
    #[serde(default = "default_missing_reason")]
    pub missing_reason: String,
}

fn default_missing_reason() -> String {
    reasons::MISSING_RESOURCE_CONDITION.to_string()
}

impl Default for RequiredConditionsConfig {
    fn default() -> Self {
        Self {
            must_be_true: vec![
                ConditionType::RESOURCES_APPLIED,
                ConditionType::RESOURCES_HEALTHY,
            ],
            not_progressing: vec![ConditionType::RESOURCES_PROGRESSING],
            primary: Some(ConditionType::RESOURCES_APPLIED),
            missing_reason: default_missing_reason(),
        }
    }
}

impl RequiredConditionsConfig {
    /// Conditions reported by extension controller installations
    pub fn controller_installation() -> Self {
        Self {
            must_be_true: vec![
                ConditionType::INSTALLATION_VALID,
                ConditionType::INSTALLATION_INSTALLED,
                ConditionType::INSTALLATION_HEALTHY,
            ],
            not_progressing: Vec::new(),
            primary: Some(ConditionType::INSTALLATION_INSTALLED),
            missing_reason: reasons::MISSING_CONTROLLER_INSTALLATION_CONDITION.to_string(),
        }
    }

    fn validate(&self, aspect: &ConditionType) -> ConfigResult<()> {
        if self.missing_reason.is_empty() {
            return Err(ConfigurationError::invalid(
                "aspects.required_conditions.missing_reason",
                format!("must not be empty for aspect {aspect}"),
            ));
        }
        if let Some(primary) = &self.primary {
            if !self.must_be_true.contains(primary) {
                return Err(ConfigurationError::invalid(
                    "aspects.required_conditions.primary",
                    format!("{primary} is not a must_be_true condition of aspect {aspect}"),
                ));
            }
        }
        Ok(())
    }
}

/// One health aspect and the evaluators that contribute to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectConfig {
    pub condition_type: ConditionType,
    pub success_reason: String,
    pub success_message: String,
    pub resource_filter: ResourceFilter,
    pub required_conditions: RequiredConditionsConfig,
    pub required_workloads: Option<RequiredWorkloadsConfig>,
    pub check_extensions: bool,
    pub check_alerts: bool,
    /// Overrides `resources.progressing_threshold_secs` for this aspect
    pub progressing_threshold_secs: Option<u64>,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            condition_type: ConditionType::new(""),
            success_reason: String::new(),
            success_message: String::new(),
            resource_filter: ResourceFilter::default(),
            required_conditions: RequiredConditionsConfig::default(),
            required_workloads: None,
            check_extensions: false,
            check_alerts: false,
            progressing_threshold_secs: None,
        }
    }
}

impl AspectConfig {
    pub fn system_components() -> Self {
        Self {
            condition_type: ConditionType::SYSTEM_COMPONENTS_HEALTHY,
            success_reason: reasons::SYSTEM_COMPONENTS_RUNNING.to_string(),
            success_message: reasons::SYSTEM_COMPONENTS_RUNNING_MESSAGE.to_string(),
            resource_filter: ResourceFilter {
                label_value: ConditionType::OBSERVABILITY_COMPONENTS_HEALTHY.to_string(),
                label_match: LabelMatch::NotEquals,
                ..ResourceFilter::default()
            },
            ..Self::default()
        }
    }

    pub fn observability_components() -> Self {
        Self {
            condition_type: ConditionType::OBSERVABILITY_COMPONENTS_HEALTHY,
            success_reason: reasons::OBSERVABILITY_COMPONENTS_RUNNING.to_string(),
            success_message: reasons::OBSERVABILITY_COMPONENTS_RUNNING_MESSAGE.to_string(),
            resource_filter: ResourceFilter {
                label_value: ConditionType::OBSERVABILITY_COMPONENTS_HEALTHY.to_string(),
                label_match: LabelMatch::Equals,
                ..ResourceFilter::default()
            },
            check_alerts: true,
            ..Self::default()
        }
    }

    /// Progressing threshold for this aspect, falling back to `default_secs`
    pub fn progressing_threshold(&self, default_secs: Option<u64>) -> Option<Duration> {
        self.progressing_threshold_secs
            .or(default_secs)
            .map(Duration::from_secs)
    }
}
