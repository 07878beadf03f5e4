//! # Signal Types
//!
//! Snapshots of the signals the engine reads. These are owned by the signal
//! store; evaluators only ever borrow them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::conditions::{ConditionStatus, ConditionType};

/// A condition as reported by a sub-resource, workload or extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Generation the reporter had seen when it wrote this condition
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl ObservedCondition {
    pub fn new(condition_type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
            observed_generation: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = reason.into();
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_transition_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_transition_time = Some(at);
        self
    }

    #[must_use]
    pub fn with_observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = Some(generation);
        self
    }
}

/// Find a condition by type
pub fn find_condition<'a>(
    conditions: &'a [ObservedCondition],
    condition_type: &ConditionType,
) -> Option<&'a ObservedCondition> {
    conditions
        .iter()
        .find(|c| &c.condition_type == condition_type)
}

/// Reference from a sub-resource to an object it manages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// Observed health of one sub-resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubResourceStatus {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_sub_resource_kind")]
    pub kind: String,
    /// Deployment class; resources without a class are not health-relevant
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub generation: i64,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<ObservedCondition>,
    /// Objects managed by this sub-resource
    #[serde(default)]
    pub resources: Vec<ObjectReference>,
}

fn default_sub_resource_kind() -> String {
    "ManagedResource".to_string()
}

impl SubResourceStatus {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: default_sub_resource_kind(),
            class: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            generation: 0,
            observed_generation: 0,
            conditions: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Human-readable identity used in condition messages
    pub fn identity(&self) -> String {
        format!("{} {}/{}", self.kind, self.namespace, self.name)
    }

    pub fn is_outdated(&self) -> bool {
        self.observed_generation < self.generation
    }

    pub fn annotation_is_true(&self, key: &str) -> bool {
        self.annotations
            .get(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Equality-based label selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// An empty selector matches everything
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&pairs.join(","))
    }
}

/// A required long-running workload (deployment-like)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub generation: i64,
    #[serde(default)]
    pub observed_generation: i64,
    /// Desired replicas; unset means one
    #[serde(default)]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub available_replicas: i32,
    #[serde(default)]
    pub conditions: Vec<ObservedCondition>,
}

impl Workload {
    pub fn desired_replicas(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }
}

/// Kind of a monitoring instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitoringKind {
    Prometheus,
    Alertmanager,
}

impl MonitoringKind {
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "Prometheus" => Some(Self::Prometheus),
            "Alertmanager" => Some(Self::Alertmanager),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prometheus => "Prometheus",
            Self::Alertmanager => "Alertmanager",
        }
    }
}

impl fmt::Display for MonitoringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitoring instance (Prometheus or Alertmanager) and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringInstance {
    pub kind: MonitoringKind,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub generation: i64,
    /// Desired replicas; unset means one
    #[serde(default)]
    pub replicas: Option<i32>,
    /// Governing headless service; unset means the configured default
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub available_replicas: i32,
    #[serde(default)]
    pub updated_replicas: i32,
    #[serde(default)]
    pub conditions: Vec<ObservedCondition>,
}

impl MonitoringInstance {
    pub fn new(kind: MonitoringKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            generation: 0,
            replicas: None,
            service_name: None,
            available_replicas: 0,
            updated_replicas: 0,
            conditions: Vec::new(),
        }
    }

    pub fn desired_replicas(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Heartbeat-tagged health report from a pluggable extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionReport {
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub source_namespace: String,
    pub condition: ObservedCondition,
    #[serde(default)]
    pub last_heartbeat_time: Option<DateTime<Utc>>,
}

impl ExtensionReport {
    pub fn new(source_type: impl Into<String>, condition: ObservedCondition) -> Self {
        Self {
            source_type: source_type.into(),
            source_name: String::new(),
            source_namespace: String::new(),
            condition,
            last_heartbeat_time: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.source_namespace = namespace.into();
        self.source_name = name.into();
        self
    }

    #[must_use]
    pub fn with_heartbeat(mut self, at: DateTime<Utc>) -> Self {
        self.last_heartbeat_time = Some(at);
        self
    }

    /// Whether the report names the extension that produced it
    pub fn has_identity(&self) -> bool {
        !self.source_type.is_empty()
            || !self.source_name.is_empty()
            || !self.source_namespace.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_selector_matching() {
        let selector = LabelSelector::from_pairs([("role", "monitoring")]);
        let mut labels = BTreeMap::new();
        assert!(!selector.matches(&labels));

        labels.insert("role".to_string(), "monitoring".to_string());
        labels.insert("app".to_string(), "plutono".to_string());
        assert!(selector.matches(&labels));
        assert!(LabelSelector::default().matches(&BTreeMap::new()));
        assert_eq!(selector.to_string(), "role=monitoring");
    }

    #[test]
    fn test_sub_resource_defaults_from_json() {
        let resource: SubResourceStatus =
            serde_json::from_str(r#"{"name": "etcd", "namespace": "garden"}"#).unwrap();

        assert_eq!(resource.kind, "ManagedResource");
        assert_eq!(resource.identity(), "ManagedResource garden/etcd");
        assert!(!resource.is_outdated());
    }

    #[test]
    fn test_ignore_annotation_is_case_insensitive() {
        let mut resource = SubResourceStatus::new("garden", "etcd");
        resource
            .annotations
            .insert("ignore".to_string(), "True".to_string());

        assert!(resource.annotation_is_true("ignore"));
        assert!(!resource.annotation_is_true("other"));
    }

    #[test]
    fn test_extension_report_identity() {
        let condition = ObservedCondition::new("Healthy".into(), ConditionStatus::True);
        assert!(!ExtensionReport::new("", condition.clone()).has_identity());
        assert!(ExtensionReport::new("Worker", condition).has_identity());
    }
}
