//! # Alert Query Evaluator
//!
//! Resolves the Prometheus instances referenced by an aspect's sub-resources
//! and asks every replica of each instance whether health alerts are firing.
//!
//! Replica results are joined before any decision is made, then precedence
//! is applied in replica order: an error outranks firing alerts, which
//! outrank a healthy result. A query error therefore never hides behind a
//! firing replica, and vice versa a firing replica is only reported once
//! every replica answered.

use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::fanout::ordered_fanout;
use super::query::HealthAlertsQuerier;
use crate::conditions::{reasons, Clock, Condition, ConditionStatus};
use crate::config::{AlertQueryConfig, ResourceFilter};
use crate::error::{QueryError, QueryResult};
use crate::store::{MonitoringInstance, MonitoringKind, SignalStore, SubResourceStatus};

/// Where to send one replica's query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub endpoint: String,
    pub port: u16,
}

/// Maps a monitoring instance replica to its query target
pub trait EndpointBuilder: Send + Sync + Debug {
    fn build(&self, instance: &MonitoringInstance, replica: i32) -> QueryTarget;
}

/// Addresses replicas through the instance's governing headless service:
/// `<prefix>-<name>-<replica>.<service>.<namespace>.<cluster-domain>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessServiceEndpointBuilder {
    service_prefix: String,
    default_service_name: String,
    cluster_domain: String,
    port: u16,
}

impl HeadlessServiceEndpointBuilder {
    pub fn from_config(config: &AlertQueryConfig) -> Self {
        Self {
            service_prefix: config.service_prefix.clone(),
            default_service_name: config.default_service_name.clone(),
            cluster_domain: config.cluster_domain.clone(),
            port: config.port,
        }
    }
}

impl Default for HeadlessServiceEndpointBuilder {
    fn default() -> Self {
        Self::from_config(&AlertQueryConfig::default())
    }
}

impl EndpointBuilder for HeadlessServiceEndpointBuilder {
    fn build(&self, instance: &MonitoringInstance, replica: i32) -> QueryTarget {
        let service = instance
            .service_name
            .as_deref()
            .unwrap_or(&self.default_service_name);
        QueryTarget {
            endpoint: format!(
                "{}-{}-{}.{}.{}.{}",
                self.service_prefix,
                instance.name,
                replica,
                service,
                instance.namespace,
                self.cluster_domain
            ),
            port: self.port,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertQueryEvaluator {
    store: Arc<dyn SignalStore>,
    querier: Arc<dyn HealthAlertsQuerier>,
    endpoints: Arc<dyn EndpointBuilder>,
    clock: Arc<dyn Clock>,
    ignore_annotation: String,
    query_timeout: Duration,
    max_concurrent_queries: usize,
}

impl AlertQueryEvaluator {
    pub fn new(
        store: Arc<dyn SignalStore>,
        querier: Arc<dyn HealthAlertsQuerier>,
        endpoints: Arc<dyn EndpointBuilder>,
        clock: Arc<dyn Clock>,
        config: &AlertQueryConfig,
    ) -> Self {
        Self {
            store,
            querier,
            endpoints,
            clock,
            ignore_annotation: config.ignore_annotation.clone(),
            query_timeout: config.query_timeout(),
            max_concurrent_queries: config.max_concurrent_queries,
        }
    }

    /// Verdict for the Prometheus instances referenced by `resources`
    ///
    /// Sub-resources failing `filter` or carrying the ignore annotation are
    /// skipped. Instances are checked concurrently; the first verdict in
    /// reference order wins.
    pub async fn check(
        &self,
        previous: &Condition,
        resources: &[SubResourceStatus],
        filter: &ResourceFilter,
    ) -> Option<Condition> {
        let references = self.monitoring_references(resources, filter);
        if references.is_empty() {
            return None;
        }

        let verdicts = join_all(
            references
                .iter()
                .map(|(namespace, name)| self.check_instance(previous, namespace, name)),
        )
        .await;
        verdicts.into_iter().flatten().next()
    }

    /// Referenced Prometheus instances as `(namespace, name)`, deduplicated
    /// in first-seen order
    fn monitoring_references(
        &self,
        resources: &[SubResourceStatus],
        filter: &ResourceFilter,
    ) -> Vec<(String, String)> {
        let mut seen = BTreeSet::new();
        resources
            .iter()
            .filter(|r| filter.matches(r) && !r.annotation_is_true(&self.ignore_annotation))
            .flat_map(|r| {
                r.resources
                    .iter()
                    .filter(|o| MonitoringKind::from_kind(&o.kind) == Some(MonitoringKind::Prometheus))
                    .map(move |o| {
                        let namespace = if o.namespace.is_empty() {
                            r.namespace.clone()
                        } else {
                            o.namespace.clone()
                        };
                        (namespace, o.name.clone())
                    })
            })
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    async fn check_instance(
        &self,
        previous: &Condition,
        namespace: &str,
        name: &str,
    ) -> Option<Condition> {
        let clock = self.clock.as_ref();
        let reference = format!("{namespace}/{name}");
        let instance = match self
            .store
            .get_monitoring_instance(MonitoringKind::Prometheus, namespace, name)
            .await
        {
            Ok(instance) => instance,
            Err(err) if err.is_not_found() => {
                warn!(aspect = %previous.condition_type, instance = %reference, "Referenced Prometheus not found");
                return Some(previous.updated(
                    clock,
                    ConditionStatus::False,
                    reasons::PROMETHEUS_HEALTH_ALERTS_ERROR,
                    format!("Prometheus \"{reference}\" not found"),
                ));
            }
            Err(err) => {
                warn!(aspect = %previous.condition_type, instance = %reference, error = %err, "Failed to fetch Prometheus");
                return Some(previous.updated_unknown_error(
                    clock,
                    format!("failed checking Prometheus \"{reference}\": {err}"),
                ));
            }
        };

        let targets: Vec<QueryTarget> = (0..instance.desired_replicas())
            .map(|replica| self.endpoints.build(&instance, replica))
            .collect();
        let results = ordered_fanout(targets, self.max_concurrent_queries, |target| {
            self.query_replica(target)
        })
        .await;

        let key = instance.key();
        if let Some(err) = results.iter().find_map(|r| r.as_ref().err()) {
            warn!(aspect = %previous.condition_type, instance = %key, error = %err, "Health alert query failed");
            return Some(previous.updated_unknown_error(
                clock,
                format!("Querying Prometheus \"{key}\" for health alerts returned an error: {err}"),
            ));
        }

        if results.iter().any(|r| matches!(r, Ok(true))) {
            debug!(aspect = %previous.condition_type, instance = %key, "Health alerts are firing");
            return Some(previous.updated(
                clock,
                ConditionStatus::False,
                reasons::PROMETHEUS_HEALTH_ALERTS_FIRING,
                format!(
                    "There are firing health alerts in Prometheus \"{key}\". Access Prometheus UI and check for firing ALERTS with type=\"health\"."
                ),
            ));
        }

        debug!(aspect = %previous.condition_type, instance = %key, replicas = results.len(), "No health alerts firing");
        None
    }

    async fn query_replica(&self, target: QueryTarget) -> QueryResult<bool> {
        tokio::time::timeout(
            self.query_timeout,
            self.querier.has_health_alerts(&target.endpoint, target.port),
        )
        .await
        .unwrap_or_else(|_| {
            Err(QueryError::Timeout {
                url: format!("http://{}:{}/api/v1/query", target.endpoint, target.port),
                timeout: self.query_timeout,
            })
        })
    }
}
