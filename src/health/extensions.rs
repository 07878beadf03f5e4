//! # Extension Report Evaluator
//!
//! Merges heartbeat-tagged health reports of pluggable extensions. Stale
//! reports are downgraded to `Unknown`; the worst remaining status wins
//! (`False > Unknown > Progressing > True`) and ties go to the first report
//! in input order.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::format_duration;
use crate::conditions::{reasons, Clock, Condition, ConditionStatus};
use crate::store::ExtensionReport;

/// A report as it takes part in the merge
#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    status: ConditionStatus,
    reason: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct ExtensionReportEvaluator {
    clock: Arc<dyn Clock>,
    outdated_threshold: Option<Duration>,
}

impl ExtensionReportEvaluator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            outdated_threshold: None,
        }
    }

    /// Maximum heartbeat age; `None` disables staleness checking
    #[must_use]
    pub fn with_outdated_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.outdated_threshold = threshold;
        self
    }

    /// Merged verdict, or `None` when every report is healthy
    pub fn check(&self, previous: &Condition, reports: &[ExtensionReport]) -> Option<Condition> {
        let now = self.clock.now();

        let mut worst: Option<Verdict> = None;
        for report in reports {
            let verdict = self.judge(report, now);
            let worse = worst
                .as_ref()
                .map_or(true, |w| verdict.status.severity() > w.status.severity());
            if worse {
                worst = Some(verdict);
            }
        }

        let worst = worst.filter(|v| v.status != ConditionStatus::True)?;
        debug!(
            aspect = %previous.condition_type,
            status = %worst.status,
            reason = %worst.reason,
            reports = reports.len(),
            "Extension reports are not healthy"
        );
        Some(previous.updated(
            self.clock.as_ref(),
            worst.status,
            worst.reason,
            worst.message,
        ))
    }

    /// A fresh `Unknown` report keeps its status instead of being raised to
    /// `False`; it still gets the `<Type>UnhealthyReport` reason when it has none
    fn judge(&self, report: &ExtensionReport, now: DateTime<Utc>) -> Verdict {
        if let Some(message) = self.staleness(report, now) {
            return Verdict {
                status: ConditionStatus::Unknown,
                reason: format!(
                    "{}{}",
                    report.source_type,
                    reasons::OUTDATED_HEALTH_CHECK_REPORT_SUFFIX
                ),
                message,
            };
        }

        let condition = &report.condition;
        if condition.status == ConditionStatus::True {
            return Verdict {
                status: ConditionStatus::True,
                reason: format!("{}{}", report.source_type, condition.reason),
                message: condition.message.clone(),
            };
        }

        let suffix = match condition.status {
            ConditionStatus::False | ConditionStatus::Unknown if condition.reason.is_empty() => {
                reasons::UNHEALTHY_REPORT_SUFFIX
            }
            _ => condition.reason.as_str(),
        };
        let message = if condition.message.is_empty() {
            reasons::FAILING_HEALTH_CHECK_MESSAGE.to_string()
        } else {
            condition.message.clone()
        };
        Verdict {
            status: condition.status,
            reason: format!("{}{}", report.source_type, suffix),
            message,
        }
    }

    /// Staleness message, if the report is stale
    fn staleness(&self, report: &ExtensionReport, now: DateTime<Utc>) -> Option<String> {
        let threshold = self.outdated_threshold?;
        let source = format!(
            "{} extension ({}/{})",
            report.source_type, report.source_namespace, report.source_name
        );

        match report.last_heartbeat_time {
            Some(heartbeat) => {
                let limit = chrono::Duration::from_std(threshold).ok()?;
                let age = now.signed_duration_since(heartbeat);
                (age > limit).then(|| {
                    let age = age.to_std().unwrap_or_default();
                    format!(
                        "{source} did not report a health check for {} (threshold {})",
                        format_duration(age),
                        format_duration(threshold)
                    )
                })
            }
            None if report.has_identity() => {
                Some(format!("{source} has not reported a health check heartbeat"))
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{ConditionType, FakeClock};
    use crate::store::ObservedCondition;

    fn report(source_type: &str, status: ConditionStatus, reason: &str, message: &str) -> ExtensionReport {
        ExtensionReport::new(
            source_type,
            ObservedCondition::new(ConditionType::from_static("HealthCheck"), status)
                .with_reason(reason, message),
        )
    }

    fn setup() -> (Arc<FakeClock>, ExtensionReportEvaluator, Condition) {
        let clock = Arc::new(FakeClock::default());
        let evaluator = ExtensionReportEvaluator::new(clock.clone());
        let previous = Condition::initialized(clock.as_ref(), ConditionType::EXTENSIONS_HEALTHY);
        (clock, evaluator, previous)
    }

    #[test]
    fn test_progressing_report_is_merged_with_type_prefix() {
        let (_, evaluator, previous) = setup();
        let reports = [report("Worker", ConditionStatus::Progressing, "Bar", "Baz")];

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.status, ConditionStatus::Progressing);
        assert_eq!(condition.reason, "WorkerBar");
        assert_eq!(condition.message, "Baz");
    }

    #[test]
    fn test_all_true_reports_yield_no_verdict() {
        let (_, evaluator, previous) = setup();
        let reports = [
            report("Worker", ConditionStatus::True, "Ok", ""),
            report("Network", ConditionStatus::True, "Ok", ""),
        ];
        assert_eq!(evaluator.check(&previous, &reports), None);
        assert_eq!(evaluator.check(&previous, &[]), None);
    }

    #[test]
    fn test_worst_status_wins() {
        let (_, evaluator, previous) = setup();
        let reports = [
            report("Worker", ConditionStatus::Progressing, "Rolling", "rolling"),
            report("Network", ConditionStatus::Unknown, "Unreachable", "endpoint unreachable"),
            report("Infra", ConditionStatus::False, "Broken", "infra broken"),
            report("Dns", ConditionStatus::True, "Ok", ""),
        ];

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, "InfraBroken");
        assert_eq!(condition.message, "infra broken");
    }

    #[test]
    fn test_ties_go_to_first_report() {
        let (_, evaluator, previous) = setup();
        let reports = [
            report("Worker", ConditionStatus::False, "First", "first"),
            report("Network", ConditionStatus::False, "Second", "second"),
        ];

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.reason, "WorkerFirst");
    }

    #[test]
    fn test_unknown_report_stays_unknown() {
        let (_, evaluator, previous) = setup();
        let reports = [report("Worker", ConditionStatus::Unknown, "", "")];

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason, "WorkerUnhealthyReport");
        assert_eq!(condition.message, "failing health check");
    }

    #[test]
    fn test_stale_heartbeat_is_unknown() {
        let (clock, evaluator, previous) = setup();
        let evaluator = evaluator.with_outdated_threshold(Some(Duration::from_secs(60)));
        let reports = [report("Worker", ConditionStatus::True, "Ok", "")
            .with_source("shoot--dev", "worker")
            .with_heartbeat(clock.now())];
        clock.step(Duration::from_secs(180));

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason, "WorkerOutdatedHealthCheckReport");
        assert_eq!(
            condition.message,
            "Worker extension (shoot--dev/worker) did not report a health check for 3m0s (threshold 1m0s)"
        );
    }

    #[test]
    fn test_fresh_heartbeat_keeps_reported_status() {
        let (clock, evaluator, previous) = setup();
        let evaluator = evaluator.with_outdated_threshold(Some(Duration::from_secs(60)));
        let reports = [report("Worker", ConditionStatus::True, "Ok", "")
            .with_source("shoot--dev", "worker")
            .with_heartbeat(clock.now())];
        clock.step(Duration::from_secs(60));

        assert_eq!(evaluator.check(&previous, &reports), None);
    }

    #[test]
    fn test_missing_heartbeat_is_stale_only_with_identity() {
        let (_, evaluator, previous) = setup();
        let evaluator = evaluator.with_outdated_threshold(Some(Duration::from_secs(60)));

        let anonymous = ExtensionReport::new(
            "",
            ObservedCondition::new(ConditionType::from_static("HealthCheck"), ConditionStatus::True),
        );
        assert_eq!(evaluator.check(&previous, &[anonymous]), None);

        let identified = report("Worker", ConditionStatus::True, "Ok", "").with_source("shoot--dev", "worker");
        let condition = evaluator.check(&previous, &[identified]).unwrap();
        assert_eq!(condition.reason, "WorkerOutdatedHealthCheckReport");
    }

    #[test]
    fn test_no_threshold_ignores_heartbeats() {
        let (clock, evaluator, previous) = setup();
        let reports = [report("Worker", ConditionStatus::True, "Ok", "")
            .with_source("shoot--dev", "worker")
            .with_heartbeat(clock.now())];
        clock.step(Duration::from_secs(86_400));

        assert_eq!(evaluator.check(&previous, &reports), None);
    }

    #[test]
    fn test_false_report_beats_stale_report() {
        let (clock, evaluator, previous) = setup();
        let evaluator = evaluator.with_outdated_threshold(Some(Duration::from_secs(60)));
        let started = clock.now();
        clock.step(Duration::from_secs(120));
        let reports = [
            report("Worker", ConditionStatus::True, "Ok", "")
                .with_source("shoot--dev", "worker")
                .with_heartbeat(started),
            report("Network", ConditionStatus::False, "Down", "network down")
                .with_heartbeat(clock.now()),
        ];

        let condition = evaluator.check(&previous, &reports).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, "NetworkDown");
    }
}
