//! Domain model for contacts, deals and interactions.
//!
//! # Responsibility
//! - Define the entity values returned by repositories and services.
//! - Hold entity-level invariants (`validate`) checked before every write.
//!
//! # Invariants
//! - Every entity is identified by a stable, non-nil UUID.
//! - Entities are never physically deleted.

use chrono::{DateTime, SubsecRound, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod contact;
pub mod deal;
pub mod interaction;

/// Fractional-second digits kept for persisted timestamps.
pub const TIMESTAMP_PRECISION_DIGITS: u16 = 6;

/// Truncates an instant to the precision it is stored with, so an entity
/// built from it reads back equal.
pub fn to_storage_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(TIMESTAMP_PRECISION_DIGITS)
}

/// Entity invariant violations detected before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NilId,
    BlankName,
    InvalidTag(String),
    BlankTitle,
    InvalidValue(f64),
    InvalidProbability(f64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "entity id must not be nil"),
            Self::BlankName => write!(f, "contact name must not be blank"),
            Self::InvalidTag(value) => {
                write!(f, "invalid tag `{value}`; tags must be non-empty and contain no commas")
            }
            Self::BlankTitle => write!(f, "deal title must not be blank"),
            Self::InvalidValue(value) => {
                write!(f, "deal value must be finite and non-negative, got {value}")
            }
            Self::InvalidProbability(value) => {
                write!(f, "deal probability must be within [0, 1], got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::interaction::{InteractionKind, NewInteraction};
    use super::to_storage_precision;
    use chrono::{TimeZone, Timelike, Utc};
    use uuid::Uuid;

    #[test]
    fn interaction_builder_truncates_explicit_occurrence_time() {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 18, 8, 0, 0)
            .unwrap()
            .with_nanosecond(500_000_001)
            .unwrap();
        assert_eq!(to_storage_precision(at).nanosecond(), 500_000_000);

        let interaction = NewInteraction::new(Uuid::from_u128(1), InteractionKind::Call, "hi")
            .with_occurred_at(at)
            .into_interaction(Uuid::from_u128(2), Utc::now());
        assert_eq!(interaction.occurred_at, to_storage_precision(at));
    }
}
