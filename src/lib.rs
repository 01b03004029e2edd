//! Per-contact email and calendar aggregation with VIP relationship
//! scoring.
//!
//! Events enter through [`repository::EventSource`], aggregate rows live
//! behind [`repository::ContactStore`], and [`service::VipPipeline`]
//! drives the aggregate, score, and select operations between the two.

pub mod aggregation;
pub mod config;
pub mod domain;
pub mod identity;
pub mod repository;
pub mod scoring;
pub mod selection;
pub mod service;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use config::{AppConfig, ConfigError};
pub use domain::{ContactAggregate, ContactHash, Direction, EmailEvent, MeetingEvent, UserId};
pub use identity::{IdentityError, Pseudonymizer};
pub use repository::{ContactStore, EventSource, RepositoryError, ScoreUpdate};
pub use scoring::{ScoredContact, ScoringConfig, ScoringEngine, ScoringOutcome};
pub use selection::{SelectionError, SelectionPolicy};
pub use service::{PipelineError, VipPipeline};
pub use telemetry::TelemetryError;
