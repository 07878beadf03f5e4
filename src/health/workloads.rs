//! # Workload Presence Evaluator
//!
//! Checks a required set of named workloads against the label-scoped
//! inventory of the signal store. Listing failures are infrastructure errors
//! and surface as [`CareError::WorkloadList`]; missing or unavailable
//! workloads are business failures and surface as `False` conditions.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::monitoring::invalid_status;
use crate::conditions::{reasons, Clock, Condition, ConditionStatus, ConditionType};
use crate::config::RequiredWorkloadsConfig;
use crate::error::{CareError, CareResult};
use crate::store::{find_condition, SignalStore, Workload};

/// Check a deployment-like workload for availability
pub fn check_workload(workload: &Workload) -> Result<(), String> {
    if workload.observed_generation < workload.generation {
        return Err(format!(
            "observed generation outdated ({}/{})",
            workload.observed_generation, workload.generation
        ));
    }

    match find_condition(&workload.conditions, &ConditionType::AVAILABLE) {
        None => return Err("condition \"Available\" is missing".to_string()),
        Some(available) if available.status != ConditionStatus::True => {
            return Err(invalid_status(available, ConditionStatus::True));
        }
        Some(_) => {}
    }

    let desired = workload.desired_replicas();
    if workload.available_replicas < desired {
        return Err(format!(
            "not enough available replicas ({}/{})",
            workload.available_replicas, desired
        ));
    }
    Ok(())
}

/// Evaluate the required workloads of an aspect
///
/// Returns `Ok(None)` when every required workload exists and is available.
pub async fn evaluate_required_workloads(
    store: &dyn SignalStore,
    clock: &dyn Clock,
    previous: &Condition,
    required: &RequiredWorkloadsConfig,
) -> CareResult<Option<Condition>> {
    if required.names.is_empty() {
        return Ok(None);
    }

    let inventory = store
        .list_workloads(&required.namespace, &required.selector)
        .await
        .map_err(|source| {
            warn!(
                aspect = %previous.condition_type,
                namespace = %required.namespace,
                selector = %required.selector,
                error = %source,
                "Failed to list required workloads"
            );
            CareError::WorkloadList {
                namespace: required.namespace.clone(),
                source,
            }
        })?;

    let present: BTreeSet<&str> = inventory.iter().map(|w| w.name.as_str()).collect();
    let missing: BTreeSet<&str> = required
        .names
        .iter()
        .map(String::as_str)
        .filter(|name| !present.contains(name))
        .collect();

    if !missing.is_empty() {
        let names = missing.into_iter().collect::<Vec<_>>().join(" ");
        debug!(aspect = %previous.condition_type, missing = %names, "Required workloads are missing");
        return Ok(Some(previous.updated(
            clock,
            ConditionStatus::False,
            reasons::DEPLOYMENT_MISSING,
            format!("Missing required deployments: [{names}]"),
        )));
    }

    let required_names: BTreeSet<&str> = required.names.iter().map(String::as_str).collect();
    for workload in inventory
        .iter()
        .filter(|w| required_names.contains(w.name.as_str()))
    {
        if let Err(problem) = check_workload(workload) {
            debug!(
                aspect = %previous.condition_type,
                workload = %workload.name,
                problem = %problem,
                "Required workload is unavailable"
            );
            return Ok(Some(previous.updated(
                clock,
                ConditionStatus::False,
                reasons::DEPLOYMENT_UNHEALTHY,
                format!(
                    "Deployment \"{}/{}\" is unhealthy: {problem}",
                    workload.namespace, workload.name
                ),
            )));
        }
    }

    Ok(None)
}
