//! Per-pass snapshot of the signal store.

use futures::future::join_all;
use tracing::warn;

use crate::error::{CareError, CareResult};
use crate::store::{ExtensionReport, SignalStore, SubResourceStatus};

/// Signals read once per pass and shared read-only by every aspect
///
/// Each half keeps its own outcome so a failed listing only affects the
/// aspects that depend on it.
#[derive(Debug, Clone)]
pub(crate) struct PassSnapshot {
    pub sub_resources: CareResult<Vec<SubResourceStatus>>,
    /// `None` when no aspect checks extension reports
    pub extension_reports: Option<CareResult<Vec<ExtensionReport>>>,
}

impl PassSnapshot {
    pub async fn fetch(
        store: &dyn SignalStore,
        namespaces: &[String],
        with_extension_reports: bool,
    ) -> Self {
        let sub_resources = async {
            let listed = join_all(namespaces.iter().map(|ns| store.list_sub_resources(ns))).await;
            collect(namespaces, listed, "sub-resources")
        };
        let extension_reports = async {
            if !with_extension_reports {
                return None;
            }
            let listed =
                join_all(namespaces.iter().map(|ns| store.list_extension_reports(ns))).await;
            Some(collect(namespaces, listed, "extension reports"))
        };

        let (sub_resources, extension_reports) = tokio::join!(sub_resources, extension_reports);
        Self {
            sub_resources,
            extension_reports,
        }
    }
}

/// Concatenate per-namespace listings in namespace order; the first failure
/// fails the whole listing
fn collect<T>(
    namespaces: &[String],
    listed: Vec<crate::error::StoreResult<Vec<T>>>,
    what: &'static str,
) -> CareResult<Vec<T>> {
    let mut all = Vec::new();
    for (namespace, result) in namespaces.iter().zip(listed) {
        match result {
            Ok(items) => all.extend(items),
            Err(source) => {
                warn!(namespace = %namespace, what = what, error = %source, "Snapshot fetch failed");
                return Err(CareError::SnapshotFetch {
                    what,
                    namespace: namespace.clone(),
                    source,
                });
            }
        }
    }
    Ok(all)
}
