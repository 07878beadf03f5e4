//! Configuration Loader
//!
//! Layers an optional TOML file under `CARE_*` environment variables and
//! validates the result. Nested keys use `__` in variable names, e.g.
//! `CARE_ALERTS__QUERY_TIMEOUT_MS=2000` or `CARE_PASS_TIMEOUT_MS=10000`.

use std::path::Path;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::CareConfig;

const ENV_PREFIX: &str = "CARE";

impl CareConfig {
    /// Load configuration from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!(path = %path.display(), "Loading care configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("namespaces"),
        );

        let config: CareConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            namespaces = ?config.namespaces,
            aspects = config.aspects.len(),
            pass_timeout_ms = config.pass_timeout_ms,
            query_timeout_ms = config.alerts.query_timeout_ms,
            "Care configuration loaded"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckPriority, LabelMatch};
    use crate::conditions::ConditionType;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_toml_file() {
        let file = write_config(
            r#"
namespaces = ["garden"]
pass_timeout_ms = 12000

[resources]
progressing_threshold_secs = 300
check_priority = "content_first"

[extensions]
outdated_threshold_secs = 120

[alerts]
query_timeout_ms = 2000

[[aspects]]
condition_type = "ControlPlaneHealthy"
success_reason = "ControlPlaneRunning"
success_message = "All control plane components are healthy."
check_extensions = true

[aspects.resource_filter]
label_value = "control-plane"
label_match = "equals"
"#,
        );

        let config = CareConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.namespaces, vec!["garden".to_string()]);
        assert_eq!(config.pass_timeout_ms, 12_000);
        assert_eq!(config.resources.progressing_threshold_secs, Some(300));
        assert_eq!(config.resources.check_priority, CheckPriority::ContentFirst);
        assert_eq!(config.extensions.outdated_threshold_secs, Some(120));
        assert_eq!(config.alerts.query_timeout_ms, 2_000);
        assert_eq!(config.alerts.port, 9090);
        assert_eq!(config.aspects.len(), 1);

        let aspect = &config.aspects[0];
        assert_eq!(
            aspect.condition_type,
            ConditionType::from_static("ControlPlaneHealthy")
        );
        assert!(aspect.check_extensions);
        assert!(aspect.resource_filter.require_class);
        assert_eq!(aspect.resource_filter.label_match, LabelMatch::Equals);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = CareConfig::load(Some(Path::new("/nonexistent/care.toml"))).unwrap_err();
        assert!(matches!(err, ConfigurationError::FileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = write_config("namespaces = []\n");
        let err = CareConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
