//! Derived read models computed on demand from current storage.
//!
//! # Responsibility
//! - Pipeline summary per stage.
//! - Week-bucketed revenue forecast.
//! - Follow-up worklist of stale contacts with open deals.
//!
//! # Invariants
//! - Reports never cache; every call re-reads the store.
//! - Money figures are rounded to 2 decimals only at the output edge.

use crate::model::deal::Stage;
use once_cell::sync::Lazy;

pub mod follow_up;
pub mod forecast;
pub mod pipeline;

/// SQL list literal of the closed stages, e.g. `'closed_won', 'closed_lost'`.
pub(crate) static CLOSED_STAGES_SQL: Lazy<String> = Lazy::new(|| {
    Stage::ALL
        .into_iter()
        .filter(|stage| !stage.is_open())
        .map(|stage| format!("'{}'", stage.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
});

/// Rounds half away from zero to 2 decimal places.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
