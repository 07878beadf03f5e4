//! Stable reason strings.
//!
//! Downstream consumers match on these, so they must not change.

pub const CONDITION_INITIALIZED: &str = "ConditionInitialized";
pub const CONDITION_INITIALIZED_MESSAGE: &str =
    "The condition has been initialized but its semantic check has not been performed yet.";

pub const CONDITION_CHECK_ERROR: &str = "ConditionCheckError";
pub const NO_VERDICT_MESSAGE: &str = "The health check did not produce a verdict.";

// Sub-resource checks
pub const OUTDATED_STATUS_ERROR: &str = "OutdatedStatusError";
pub const OUTDATED_STATUS_MESSAGE: &str = "outdated";
pub const MISSING_RESOURCE_CONDITION: &str = "MissingManagedResourceCondition";
pub const PROGRESSING_ROLLOUT_STUCK: &str = "ProgressingRolloutStuck";
pub const CONDITION_NOT_HEALTHY: &str = "ConditionNotHealthy";
pub const MISSING_CONTROLLER_INSTALLATION_CONDITION: &str =
    "MissingControllerInstallationCondition";

// Required workloads
pub const DEPLOYMENT_MISSING: &str = "DeploymentMissing";
pub const DEPLOYMENT_UNHEALTHY: &str = "DeploymentUnhealthy";

// Extension reports, prefixed with the reporting extension type
pub const OUTDATED_HEALTH_CHECK_REPORT_SUFFIX: &str = "OutdatedHealthCheckReport";
pub const UNHEALTHY_REPORT_SUFFIX: &str = "UnhealthyReport";
pub const FAILING_HEALTH_CHECK_MESSAGE: &str = "failing health check";

// Monitoring alerts
pub const PROMETHEUS_HEALTH_ALERTS_FIRING: &str = "PrometheusHealthAlertsFiring";
pub const PROMETHEUS_HEALTH_ALERTS_ERROR: &str = "PrometheusHealthAlertsError";

// Aspect success
pub const SYSTEM_COMPONENTS_RUNNING: &str = "SystemComponentsRunning";
pub const SYSTEM_COMPONENTS_RUNNING_MESSAGE: &str = "All system components are healthy.";
pub const OBSERVABILITY_COMPONENTS_RUNNING: &str = "ObservabilityComponentsRunning";
pub const OBSERVABILITY_COMPONENTS_RUNNING_MESSAGE: &str =
    "All observability components are healthy.";
