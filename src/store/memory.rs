//! In-memory signal store with failure and latency injection.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::types::{
    ExtensionReport, LabelSelector, MonitoringInstance, MonitoringKind, SubResourceStatus,
    Workload,
};
use super::SignalStore;
use crate::error::{StoreError, StoreResult};

/// Everything the store knows, as loaded from a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    #[serde(default)]
    pub sub_resources: Vec<SubResourceStatus>,
    #[serde(default)]
    pub extension_reports: Vec<ExtensionReport>,
    #[serde(default)]
    pub workloads: Vec<Workload>,
    #[serde(default)]
    pub monitoring_instances: Vec<MonitoringInstance>,
}

/// Store operations that can be made to fail or stall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListSubResources,
    ListExtensionReports,
    ListWorkloads,
    GetMonitoringInstance,
}

#[derive(Debug, Default)]
pub struct InMemorySignalStore {
    snapshot: RwLock<SignalSnapshot>,
    failures: RwLock<HashMap<StoreOperation, StoreError>>,
    delays: RwLock<HashMap<StoreOperation, Duration>>,
}

impl InMemorySignalStore {
    pub fn new(snapshot: SignalSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    /// Replace the stored snapshot
    pub fn replace(&self, snapshot: SignalSnapshot) {
        *self.snapshot.write() = snapshot;
    }

    /// Make `operation` fail with `error` until cleared
    pub fn fail(&self, operation: StoreOperation, error: StoreError) {
        self.failures.write().insert(operation, error);
    }

    pub fn clear_failure(&self, operation: StoreOperation) {
        self.failures.write().remove(&operation);
    }

    /// Delay every call of `operation`
    pub fn delay(&self, operation: StoreOperation, by: Duration) {
        self.delays.write().insert(operation, by);
    }

    async fn enter(&self, operation: StoreOperation) -> StoreResult<()> {
        let delay = self.delays.read().get(&operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.read().get(&operation) {
            Some(err) => {
                debug!(operation = ?operation, error = %err, "Injected signal store failure");
                Err(err.clone())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SignalStore for InMemorySignalStore {
    async fn list_sub_resources(&self, namespace: &str) -> StoreResult<Vec<SubResourceStatus>> {
        self.enter(StoreOperation::ListSubResources).await?;
        Ok(self
            .snapshot
            .read()
            .sub_resources
            .iter()
            .filter(|r| r.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_extension_reports(&self, namespace: &str) -> StoreResult<Vec<ExtensionReport>> {
        self.enter(StoreOperation::ListExtensionReports).await?;
        Ok(self
            .snapshot
            .read()
            .extension_reports
            .iter()
            .filter(|r| r.source_namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<Workload>> {
        self.enter(StoreOperation::ListWorkloads).await?;
        Ok(self
            .snapshot
            .read()
            .workloads
            .iter()
            .filter(|w| w.namespace == namespace && selector.matches(&w.labels))
            .cloned()
            .collect())
    }

    async fn get_monitoring_instance(
        &self,
        kind: MonitoringKind,
        namespace: &str,
        name: &str,
    ) -> StoreResult<MonitoringInstance> {
        self.enter(StoreOperation::GetMonitoringInstance).await?;
        self.snapshot
            .read()
            .monitoring_instances
            .iter()
            .find(|m| m.kind == kind && m.namespace == namespace && m.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind.as_str(), namespace, name))
    }
}
