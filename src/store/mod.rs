//! # Signal Store
//!
//! The read-only query surface the engine consumes. Listing and fetching
//! cluster objects is an external concern; implementations adapt whatever
//! client the host process uses. [`InMemorySignalStore`] backs tests and the
//! `care-check` binary.

pub mod memory;
pub mod types;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::StoreResult;

pub use memory::{InMemorySignalStore, SignalSnapshot, StoreOperation};
pub use types::{
    find_condition, ExtensionReport, LabelSelector, MonitoringInstance, MonitoringKind,
    ObjectReference, ObservedCondition, SubResourceStatus, Workload,
};

#[async_trait]
pub trait SignalStore: Send + Sync + Debug {
    /// List all sub-resource statuses in a namespace
    async fn list_sub_resources(&self, namespace: &str) -> StoreResult<Vec<SubResourceStatus>>;

    /// List heartbeat reports written by extensions in a namespace
    async fn list_extension_reports(&self, namespace: &str) -> StoreResult<Vec<ExtensionReport>>;

    /// List workloads in a namespace whose labels match `selector`
    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<Workload>>;

    /// Fetch one monitoring instance; absent instances yield `StoreError::NotFound`
    async fn get_monitoring_instance(
        &self,
        kind: MonitoringKind,
        namespace: &str,
        name: &str,
    ) -> StoreResult<MonitoringInstance>;
}
