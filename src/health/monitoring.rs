//! Availability and rollout checks for monitoring instances.

use crate::conditions::{ConditionStatus, ConditionType};
use crate::store::{find_condition, MonitoringInstance, ObservedCondition};

/// Message for a condition that is not in the expected state
pub(crate) fn invalid_status(condition: &ObservedCondition, expected: ConditionStatus) -> String {
    let mut message = format!(
        "condition {:?} has invalid status {} (expected {expected})",
        condition.condition_type.as_str(),
        condition.status
    );
    if !condition.reason.is_empty() {
        message.push_str(&format!(" due to {}: {}", condition.reason, condition.message));
    }
    message
}

fn check_monitoring_condition(
    instance: &MonitoringInstance,
    condition_type: &ConditionType,
) -> Result<(), String> {
    let Some(condition) = find_condition(&instance.conditions, condition_type) else {
        return Err(format!("condition {:?} is missing", condition_type.as_str()));
    };

    let observed = condition.observed_generation.unwrap_or_default();
    if observed < instance.generation {
        return Err(format!(
            "observed generation outdated ({observed}/{})",
            instance.generation
        ));
    }
    if condition.status != ConditionStatus::True {
        return Err(invalid_status(condition, ConditionStatus::True));
    }
    Ok(())
}

/// Check whether a Prometheus or Alertmanager instance is available
pub fn check_monitoring_instance(instance: &MonitoringInstance) -> Result<(), String> {
    check_monitoring_condition(instance, &ConditionType::AVAILABLE)?;

    let desired = instance.desired_replicas();
    if instance.available_replicas < desired {
        return Err(format!(
            "not enough available replicas ({}/{desired})",
            instance.available_replicas
        ));
    }
    Ok(())
}

/// Whether an instance is still rolling out, with a description either way
pub fn is_monitoring_instance_progressing(instance: &MonitoringInstance) -> (bool, String) {
    if let Err(problem) = check_monitoring_condition(instance, &ConditionType::RECONCILED) {
        return (true, problem);
    }

    let desired = instance.desired_replicas();
    if instance.updated_replicas < desired {
        return (
            true,
            format!(
                "{} of {desired} replica(s) have been updated",
                instance.updated_replicas
            ),
        );
    }
    (false, format!("{} is fully rolled out", instance.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MonitoringKind;

    fn instance(kind: MonitoringKind) -> MonitoringInstance {
        let mut instance = MonitoringInstance::new(kind, "garden", "seed");
        instance.generation = 2;
        instance.replicas = Some(2);
        instance.available_replicas = 2;
        instance.updated_replicas = 2;
        instance.conditions = vec![
            ObservedCondition::new(ConditionType::AVAILABLE, ConditionStatus::True)
                .with_observed_generation(2),
            ObservedCondition::new(ConditionType::RECONCILED, ConditionStatus::True)
                .with_observed_generation(2),
        ];
        instance
    }

    #[test]
    fn test_healthy_instance() {
        let prometheus = instance(MonitoringKind::Prometheus);
        assert!(check_monitoring_instance(&prometheus).is_ok());
        assert_eq!(
            is_monitoring_instance_progressing(&prometheus),
            (false, "Prometheus is fully rolled out".to_string())
        );
    }

    #[test]
    fn test_missing_available_condition() {
        let mut prometheus = instance(MonitoringKind::Prometheus);
        prometheus.conditions.remove(0);
        assert_eq!(
            check_monitoring_instance(&prometheus).unwrap_err(),
            "condition \"Available\" is missing"
        );
    }

    #[test]
    fn test_outdated_observed_generation() {
        let mut alertmanager = instance(MonitoringKind::Alertmanager);
        alertmanager.generation = 3;
        assert_eq!(
            check_monitoring_instance(&alertmanager).unwrap_err(),
            "observed generation outdated (2/3)"
        );
    }

    #[test]
    fn test_unavailable_status() {
        let mut prometheus = instance(MonitoringKind::Prometheus);
        prometheus.conditions[0].status = ConditionStatus::False;
        assert_eq!(
            check_monitoring_instance(&prometheus).unwrap_err(),
            "condition \"Available\" has invalid status False (expected True)"
        );

        prometheus.conditions[0].reason = "NoPodReady".to_string();
        prometheus.conditions[0].message = "0/2 pods ready".to_string();
        assert_eq!(
            check_monitoring_instance(&prometheus).unwrap_err(),
            "condition \"Available\" has invalid status False (expected True) due to NoPodReady: 0/2 pods ready"
        );
    }

    #[test]
    fn test_not_enough_replicas() {
        let mut prometheus = instance(MonitoringKind::Prometheus);
        prometheus.available_replicas = 1;
        assert_eq!(
            check_monitoring_instance(&prometheus).unwrap_err(),
            "not enough available replicas (1/2)"
        );
    }

    #[test]
    fn test_rollout_in_progress() {
        let mut alertmanager = instance(MonitoringKind::Alertmanager);
        alertmanager.updated_replicas = 1;
        assert_eq!(
            is_monitoring_instance_progressing(&alertmanager),
            (true, "1 of 2 replica(s) have been updated".to_string())
        );

        alertmanager.conditions.remove(1);
        assert_eq!(
            is_monitoring_instance_progressing(&alertmanager),
            (true, "condition \"Reconciled\" is missing".to_string())
        );
    }
}
