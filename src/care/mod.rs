//! # Care Orchestrator
//!
//! Runs one health pass: reads a snapshot of the signal store, evaluates
//! every configured aspect concurrently and advances each aspect's condition
//! exactly once.
//!
//! ## Pass
//!
//! ```text
//!   existing conditions ──► AspectConditions (get or init per aspect)
//!                                 │
//!   SignalStore ──► PassSnapshot ─┤  (sub-resources, extension reports)
//!                                 ▼
//!            ┌──────────── join_all under the pass deadline ───────────┐
//!            │ aspect A: workloads → resources → extensions → alerts    │
//!            │ aspect B: workloads → resources → extensions → alerts    │
//!            └─────────────────────────────┬────────────────────────────┘
//!                                          ▼
//!                        new_condition_or_error per aspect
//! ```
//!
//! Aspects never see each other's results. A failed snapshot listing turns
//! each dependent aspect `Unknown` without running its evaluators; an aspect
//! still running when the deadline hits becomes `Unknown` while finished
//! aspects keep their verdicts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cluster_care::care::HealthCheckBuilder;
//! use cluster_care::config::CareConfig;
//! use cluster_care::store::InMemorySignalStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemorySignalStore::default());
//! let health = HealthCheckBuilder::new(CareConfig::default(), store).build()?;
//!
//! let conditions = health.check(&[]).await;
//! for condition in conditions.iter() {
//!     println!("{} {}", condition.condition_type, condition.status);
//! }
//! # Ok(())
//! # }
//! ```

mod snapshot;

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::conditions::{
    new_condition_or_error, AspectConditions, Clock, Condition, ConditionStatus, SystemClock,
};
use crate::config::{AspectConfig, CareConfig};
use crate::error::{CareError, CareResult};
use crate::health::{
    evaluate_required_workloads, AlertQueryEvaluator, EndpointBuilder, ExtensionReportEvaluator,
    HeadlessServiceEndpointBuilder, HealthAlertsQuerier, PrometheusQueryClient,
    ResourceConditionEvaluator, ResourceRequirements,
};
use crate::store::{SignalStore, SubResourceStatus};
use snapshot::PassSnapshot;

/// Collaborators and configuration of a [`HealthCheck`], resolved once at
/// construction
#[derive(Debug)]
pub struct HealthCheckBuilder {
    config: CareConfig,
    store: Arc<dyn SignalStore>,
    clock: Option<Arc<dyn Clock>>,
    querier: Option<Arc<dyn HealthAlertsQuerier>>,
    endpoints: Option<Arc<dyn EndpointBuilder>>,
}

impl HealthCheckBuilder {
    pub fn new(config: CareConfig, store: Arc<dyn SignalStore>) -> Self {
        Self {
            config,
            store,
            clock: None,
            querier: None,
            endpoints: None,
        }
    }

    /// Defaults to [`SystemClock`]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a [`PrometheusQueryClient`] using `alerts.query_timeout_ms`
    #[must_use]
    pub fn with_querier(mut self, querier: Arc<dyn HealthAlertsQuerier>) -> Self {
        self.querier = Some(querier);
        self
    }

    /// Defaults to a [`HeadlessServiceEndpointBuilder`] from the alert configuration
    #[must_use]
    pub fn with_endpoint_builder(mut self, endpoints: Arc<dyn EndpointBuilder>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn build(self) -> CareResult<HealthCheck> {
        self.config
            .validate()
            .map_err(|e| CareError::Internal(e.to_string()))?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let querier: Arc<dyn HealthAlertsQuerier> = match self.querier {
            Some(querier) => querier,
            None => Arc::new(
                PrometheusQueryClient::new(self.config.alerts.query_timeout())
                    .map_err(|e| CareError::Internal(e.to_string()))?,
            ),
        };
        let endpoints = self.endpoints.unwrap_or_else(|| {
            Arc::new(HeadlessServiceEndpointBuilder::from_config(&self.config.alerts))
                as Arc<dyn EndpointBuilder>
        });

        let alerts = AlertQueryEvaluator::new(
            self.store.clone(),
            querier,
            endpoints,
            clock.clone(),
            &self.config.alerts,
        );

        Ok(HealthCheck {
            config: Arc::new(self.config),
            store: self.store,
            clock,
            alerts,
        })
    }
}

/// Evaluates all configured aspects of the managed entity
#[derive(Debug, Clone)]
pub struct HealthCheck {
    config: Arc<CareConfig>,
    store: Arc<dyn SignalStore>,
    clock: Arc<dyn Clock>,
    alerts: AlertQueryEvaluator,
}

impl HealthCheck {
    /// Run one pass and return the advanced condition of every aspect, in
    /// configured order
    ///
    /// `existing` holds the conditions of the previous pass; aspects without
    /// one start out initialized.
    pub async fn check(&self, existing: &[Condition]) -> AspectConditions {
        let clock = self.clock.as_ref();
        let timeout = self.config.pass_timeout();
        let deadline = Instant::now() + timeout;
        let mut conditions =
            AspectConditions::from_existing(clock, &self.config.aspect_types(), existing);

        let with_extension_reports = self.config.aspects.iter().any(|a| a.check_extensions);
        let snapshot = match tokio::time::timeout_at(
            deadline,
            PassSnapshot::fetch(
                self.store.as_ref(),
                &self.config.namespaces,
                with_extension_reports,
            ),
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(_) => {
                let err = CareError::DeadlineExceeded(timeout);
                for aspect in &self.config.aspects {
                    if let Some(previous) = conditions.get(&aspect.condition_type) {
                        let next = previous.updated_unknown_error(clock, err.to_string());
                        conditions.set(next);
                    }
                }
                return conditions;
            }
        };

        let snapshot = &snapshot;
        let outcomes = join_all(self.config.aspects.iter().filter_map(|aspect| {
            let previous = conditions.get(&aspect.condition_type)?.clone();
            Some(async move {
                let outcome = match snapshot_error(aspect, snapshot) {
                    Some(err) => Err(err),
                    None => tokio::time::timeout_at(
                        deadline,
                        self.evaluate_aspect(aspect, &previous, snapshot),
                    )
                    .await
                    .unwrap_or(Err(CareError::DeadlineExceeded(timeout))),
                };
                (previous, outcome)
            })
        }))
        .await;

        for (previous, outcome) in outcomes {
            let next = new_condition_or_error(clock, &previous, outcome.map(Some));
            debug!(
                aspect = %next.condition_type,
                status = %next.status,
                reason = %next.reason,
                "Aspect evaluated"
            );
            conditions.set(next);
        }

        let healthy = conditions.iter().filter(|c| c.is_true()).count();
        info!(
            aspects = conditions.len(),
            healthy = healthy,
            unhealthy = conditions.len() - healthy,
            "Health pass completed"
        );
        conditions
    }

    /// Sub-evaluators in priority order; the first verdict wins
    async fn evaluate_aspect(
        &self,
        aspect: &AspectConfig,
        previous: &Condition,
        snapshot: &PassSnapshot,
    ) -> CareResult<Condition> {
        let clock = self.clock.as_ref();
        let all_resources: &[SubResourceStatus] = match &snapshot.sub_resources {
            Ok(resources) => resources,
            Err(err) => return Err(err.clone()),
        };

        if let Some(required) = &aspect.required_workloads {
            let verdict =
                evaluate_required_workloads(self.store.as_ref(), clock, previous, required).await?;
            if let Some(condition) = verdict {
                return Ok(condition);
            }
        }

        let resources: Vec<SubResourceStatus> = all_resources
            .iter()
            .filter(|r| aspect.resource_filter.matches(r))
            .cloned()
            .collect();
        let threshold =
            aspect.progressing_threshold(self.config.resources.progressing_threshold_secs);
        let evaluator = ResourceConditionEvaluator::new(self.clock.clone())
            .with_requirements(ResourceRequirements::from(&aspect.required_conditions))
            .with_progressing_threshold(threshold)
            .with_priority(self.config.resources.check_priority);
        if let Some(condition) = evaluator.check(previous, &resources) {
            return Ok(condition);
        }

        if aspect.check_extensions {
            if let Some(reports) = &snapshot.extension_reports {
                let reports = reports.as_ref().map_err(Clone::clone)?;
                let evaluator = ExtensionReportEvaluator::new(self.clock.clone())
                    .with_outdated_threshold(self.config.extensions.outdated_threshold());
                if let Some(condition) = evaluator.check(previous, reports) {
                    return Ok(condition);
                }
            }
        }

        if aspect.check_alerts {
            if let Some(condition) = self
                .alerts
                .check(previous, all_resources, &aspect.resource_filter)
                .await
            {
                return Ok(condition);
            }
        }

        Ok(previous.updated(
            clock,
            ConditionStatus::True,
            &aspect.success_reason,
            &aspect.success_message,
        ))
    }
}

/// Failed snapshot listing this aspect depends on, if any
fn snapshot_error(aspect: &AspectConfig, snapshot: &PassSnapshot) -> Option<CareError> {
    if let Err(err) = &snapshot.sub_resources {
        return Some(err.clone());
    }
    if aspect.check_extensions {
        if let Some(Err(err)) = &snapshot.extension_reports {
            return Some(err.clone());
        }
    }
    None
}
