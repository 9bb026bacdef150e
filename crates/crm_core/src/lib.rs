//! Core records and reporting logic for a small-business CRM.
//!
//! Contacts, deals moving through a fixed six-stage pipeline, and an
//! interaction log, persisted in SQLite, plus three on-demand reports:
//! pipeline summary, revenue forecast and follow-up queue.

pub mod clock;
pub mod config;
pub mod db;
pub mod ids;
pub mod logging;
pub mod model;
pub mod repo;
pub mod report;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig, ReportDefaults};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidV4Generator};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{Contact, ContactId, ContactListQuery, ContactPatch, NewContact};
pub use model::deal::{
    Deal, DealId, NewDeal, Stage, StageProbabilities, UnknownStage, DEFAULT_STAGE_PROBABILITIES,
};
pub use model::interaction::{Interaction, InteractionId, InteractionKind, NewInteraction};
pub use model::ValidationError;
pub use repo::contact_repo::{ContactRepository, SqliteContactRepository};
pub use repo::deal_repo::{DealRepository, SqliteDealRepository};
pub use repo::interaction_repo::{InteractionRepository, SqliteInteractionRepository};
pub use repo::{RepoError, RepoResult};
pub use report::follow_up::FollowUpEntry;
pub use report::forecast::{ForecastDeal, RevenueForecast, WeekBucket};
pub use report::pipeline::{DealPipeline, StageMetrics};
pub use service::crm_service::CrmService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
