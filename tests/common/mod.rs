//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use cluster_care::config::LABEL_CARE_CONDITION_TYPE;
use cluster_care::error::QueryResult;
use cluster_care::health::HealthAlertsQuerier;
use cluster_care::store::{
    MonitoringInstance, MonitoringKind, ObjectReference, ObservedCondition, SubResourceStatus,
    Workload,
};
use cluster_care::{
    CareConfig, ConditionStatus, ConditionType, FakeClock, HealthCheck, HealthCheckBuilder,
    InMemorySignalStore,
};

/// Querier for passes that never reach a real backend
#[derive(Debug)]
pub struct QuietQuerier;

#[async_trait]
impl HealthAlertsQuerier for QuietQuerier {
    async fn has_health_alerts(&self, _endpoint: &str, _port: u16) -> QueryResult<bool> {
        Ok(false)
    }
}

pub fn sub_resource(name: &str, applied: ConditionStatus, healthy: ConditionStatus) -> SubResourceStatus {
    let mut resource = SubResourceStatus::new("garden", name);
    resource.class = Some("seed".to_string());
    resource.conditions = vec![
        ObservedCondition::new(ConditionType::RESOURCES_APPLIED, applied),
        ObservedCondition::new(ConditionType::RESOURCES_HEALTHY, healthy),
        ObservedCondition::new(ConditionType::RESOURCES_PROGRESSING, ConditionStatus::False),
    ];
    resource
}

pub fn healthy_sub_resource(name: &str) -> SubResourceStatus {
    sub_resource(name, ConditionStatus::True, ConditionStatus::True)
}

/// Sub-resource of the observability aspect managing the `seed` Prometheus
pub fn observability_sub_resource() -> SubResourceStatus {
    let mut resource = healthy_sub_resource("prometheus-seed");
    resource.labels.insert(
        LABEL_CARE_CONDITION_TYPE.to_string(),
        ConditionType::OBSERVABILITY_COMPONENTS_HEALTHY.to_string(),
    );
    resource.resources = vec![ObjectReference {
        kind: "Prometheus".to_string(),
        name: "seed".to_string(),
        namespace: "garden".to_string(),
    }];
    resource
}

pub fn prometheus(replicas: i32) -> MonitoringInstance {
    let mut instance = MonitoringInstance::new(MonitoringKind::Prometheus, "garden", "seed");
    instance.replicas = Some(replicas);
    instance
}

pub fn available_workload(name: &str, role: &str) -> Workload {
    Workload {
        name: name.to_string(),
        namespace: "garden".to_string(),
        labels: BTreeMap::from([("role".to_string(), role.to_string())]),
        generation: 1,
        observed_generation: 1,
        replicas: Some(1),
        available_replicas: 1,
        conditions: vec![ObservedCondition::new(
            ConditionType::AVAILABLE,
            ConditionStatus::True,
        )],
    }
}

pub fn health_check(
    config: CareConfig,
    store: Arc<InMemorySignalStore>,
    clock: Arc<FakeClock>,
) -> HealthCheck {
    HealthCheckBuilder::new(config, store)
        .with_clock(clock)
        .with_querier(Arc::new(QuietQuerier))
        .build()
        .unwrap()
}
