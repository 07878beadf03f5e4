//! # Health Evaluators
//!
//! Each evaluator turns one family of raw signals into an optional verdict
//! for an aspect. `None` means "no opinion"; the [`care`](crate::care)
//! orchestrator composes evaluators in priority order and the first verdict
//! wins.
//!
//! ```text
//!   workloads ──► resources ──► extensions ──► alerts ──► success
//!   (presence)    (content)     (heartbeats)   (queries)
//! ```
//!
//! Evaluation logic is synchronous and pure apart from the workload and alert
//! evaluators, which suspend only on signal-store and monitoring I/O.

pub mod alerts;
pub mod extensions;
pub mod fanout;
pub mod monitoring;
pub mod query;
pub mod resources;
pub mod workloads;

use std::time::Duration;

pub use alerts::{AlertQueryEvaluator, EndpointBuilder, HeadlessServiceEndpointBuilder, QueryTarget};
pub use extensions::ExtensionReportEvaluator;
pub use fanout::ordered_fanout;
pub use monitoring::{check_monitoring_instance, is_monitoring_instance_progressing};
pub use query::{HealthAlertsQuerier, PrometheusQueryClient, HEALTH_ALERTS_QUERY};
pub use resources::{
    ConditionRequirement, RequirementKind, ResourceConditionEvaluator, ResourceRequirements,
};
pub use workloads::{check_workload, evaluate_required_workloads};

/// Render a duration the way operators read it in condition messages,
/// e.g. `5m0s`, `1h0m0s`, `45s`, `250ms`
pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        let millis = duration.as_millis();
        return if millis == 0 {
            "0s".to_string()
        } else {
            format!("{millis}ms")
        };
    }

    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
