//! # Health Alert Queries
//!
//! Client side of the monitoring query protocol. One query asks a single
//! Prometheus replica how many health alerts are firing:
//!
//! ```text
//! POST http://<endpoint>:<port>/api/v1/query
//! query=count(ALERTS{alertstate="firing", type="health"}) or vector(0)
//! ```
//!
//! The query always yields exactly one sample on a healthy backend, so an
//! error status, warnings, a non-vector result or an empty vector all fail
//! the query instead of being read as "no alerts".

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// PromQL counting firing alerts labelled `type="health"`
pub const HEALTH_ALERTS_QUERY: &str =
    r#"count(ALERTS{alertstate="firing", type="health"}) or vector(0)"#;

/// Asks one monitoring replica whether health alerts are firing
#[async_trait]
pub trait HealthAlertsQuerier: Send + Sync + Debug {
    async fn has_health_alerts(&self, endpoint: &str, port: u16) -> QueryResult<bool>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error: String,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    #[allow(dead_code)]
    metric: BTreeMap<String, String>,
    /// `[<unix timestamp>, "<value>"]`
    value: (serde_json::Value, String),
}

/// Interpret a query response body
fn parse_alert_count(response: QueryResponse) -> QueryResult<f64> {
    if response.status != "success" {
        return Err(QueryError::Api {
            error_type: response.error_type,
            error: response.error,
        });
    }
    if !response.warnings.is_empty() {
        return Err(QueryError::Warnings(response.warnings));
    }

    let data = response
        .data
        .ok_or_else(|| QueryError::Decode("response has no data".to_string()))?;
    if data.result_type != "vector" {
        return Err(QueryError::UnexpectedResultType(data.result_type));
    }

    let samples: Vec<VectorSample> =
        serde_json::from_value(data.result).map_err(|e| QueryError::Decode(e.to_string()))?;
    let sample = samples.into_iter().next().ok_or(QueryError::EmptyVector)?;

    sample
        .value
        .1
        .parse::<f64>()
        .map_err(|_| QueryError::InvalidSample(sample.value.1.clone()))
}

/// [`HealthAlertsQuerier`] speaking the Prometheus HTTP API
#[derive(Debug, Clone)]
pub struct PrometheusQueryClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl PrometheusQueryClient {
    pub fn new(timeout: Duration) -> QueryResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("cluster-care/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QueryError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn query(&self, url: &str) -> QueryResult<f64> {
        let response = self
            .client
            .post(url)
            .form(&[("query", HEALTH_ALERTS_QUERY)])
            .send()
            .await
            .map_err(|e| QueryError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| QueryError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        // Prometheus reports query errors as JSON on 4xx/5xx, so try the body first
        match serde_json::from_slice::<QueryResponse>(&body) {
            Ok(parsed) => parse_alert_count(parsed),
            Err(_) if !status.is_success() => Err(QueryError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            Err(e) => Err(QueryError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl HealthAlertsQuerier for PrometheusQueryClient {
    async fn has_health_alerts(&self, endpoint: &str, port: u16) -> QueryResult<bool> {
        let url = format!("http://{endpoint}:{port}/api/v1/query");

        let count = tokio::time::timeout(self.timeout, self.query(&url))
            .await
            .map_err(|_| QueryError::Timeout {
                url: url.clone(),
                timeout: self.timeout,
            })??;

        debug!(endpoint = %endpoint, port = port, firing = count, "Queried health alerts");
        Ok(count > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn client() -> PrometheusQueryClient {
        PrometheusQueryClient::new(Duration::from_millis(500)).unwrap()
    }

    fn vector(count: &str) -> serde_json::Value {
        json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {}, "value": [1_704_110_400.0, count]}]
            }
        })
    }

    async fn serve(body: serde_json::Value) -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/query")
                    .x_www_form_urlencoded_tuple("query", HEALTH_ALERTS_QUERY);
                then.status(200).json_body(body);
            })
            .await;
        server
    }

    #[tokio::test]
    async fn test_zero_count_is_not_firing() {
        let server = serve(vector("0")).await;
        let firing = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap();
        assert!(!firing);
    }

    #[tokio::test]
    async fn test_positive_count_is_firing() {
        let server = serve(vector("3")).await;
        let firing = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap();
        assert!(firing);
    }

    #[tokio::test]
    async fn test_matrix_result_is_an_error() {
        let server = serve(json!({
            "status": "success",
            "data": {"resultType": "matrix", "result": []}
        }))
        .await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "query returned an unexpected result type");
    }

    #[tokio::test]
    async fn test_warnings_are_an_error() {
        let mut body = vector("0");
        body["warnings"] = json!(["partial response"]);
        let server = serve(body).await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "query returned warnings");
    }

    #[tokio::test]
    async fn test_empty_vector_is_an_error() {
        let server = serve(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": []}
        }))
        .await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::EmptyVector);
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/query");
                then.status(400).json_body(json!({
                    "status": "error",
                    "errorType": "bad_data",
                    "error": "parse error"
                }));
            })
            .await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Api { ref error_type, .. } if error_type == "bad_data"));
    }

    #[tokio::test]
    async fn test_non_json_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/query");
                then.status(503).body("service unavailable");
            })
            .await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_slow_replica_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/query");
                then.status(200)
                    .json_body(vector("0"))
                    .delay(Duration::from_secs(2));
            })
            .await;

        let err = client()
            .has_health_alerts(&server.host(), server.port())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Timeout { .. }));
    }

    #[test]
    fn test_invalid_sample_value() {
        let response: QueryResponse = serde_json::from_value(vector("NaN-ish")).unwrap();
        assert!(matches!(
            parse_alert_count(response),
            Err(QueryError::InvalidSample(_))
        ));
    }
}
