#![allow(clippy::doc_markdown)] // Allow technical terms like PromQL, Alertmanager in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cluster Care
//!
//! Condition aggregation and health evaluation for a managed cluster.
//!
//! ## Overview
//!
//! The engine answers one question on every pass: is the managed entity
//! healthy, and if not, why? It turns loosely coupled signals into a small
//! set of stable conditions, one per health aspect:
//!
//! - status conditions reported by many sub-resources
//! - presence and availability of required workloads
//! - heartbeat reports from pluggable extensions
//! - live health-alert queries against Prometheus replicas
//!
//! ## Module Organization
//!
//! - [`conditions`] - Condition model, transition rules and stable reasons
//! - [`health`] - Evaluators for each signal family
//! - [`care`] - Orchestrator running all aspects of a pass concurrently
//! - [`store`] - Signal store port and an in-memory implementation
//! - [`config`] - Typed configuration and loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cluster_care::{CareConfig, HealthCheckBuilder, InMemorySignalStore, SignalSnapshot};
//!
//! # async fn example(snapshot: SignalSnapshot) -> Result<(), Box<dyn std::error::Error>> {
//! let config = CareConfig::load(None)?;
//! let store = Arc::new(InMemorySignalStore::new(snapshot));
//! let health = HealthCheckBuilder::new(config, store).build()?;
//!
//! // Feed the previous pass's conditions back in to keep transition times stable
//! let conditions = health.check(&[]).await.into_vec();
//! println!("{}", serde_json::to_string_pretty(&conditions)?);
//! # Ok(())
//! # }
//! ```
//!
//! Persisting conditions and scheduling passes are left to the host process.

pub mod care;
pub mod conditions;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod store;

pub use care::{HealthCheck, HealthCheckBuilder};
pub use conditions::{
    new_condition_or_error, AspectConditions, Clock, Condition, ConditionStatus, ConditionType,
    FakeClock, SystemClock,
};
pub use config::{AspectConfig, CareConfig, CheckPriority, ResourceFilter};
pub use error::{CareError, CareResult, ConfigurationError, QueryError, StoreError};
pub use store::{InMemorySignalStore, SignalSnapshot, SignalStore};
