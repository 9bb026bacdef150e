//! Deal domain model and the fixed sales pipeline.
//!
//! # Invariants
//! - `value` is finite and non-negative.
//! - `probability` lies within `[0, 1]`.
//! - A deal is open unless its stage is `closed_won` or `closed_lost`.

use super::contact::ContactId;
use super::{to_storage_precision, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type DealId = Uuid;

/// Pipeline stage a deal occupies.
///
/// Variant order is the canonical pipeline order and drives `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Lead,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, Self::ClosedWon | Self::ClosedLost)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for stage names outside the canonical six.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl Display for UnknownStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let valid = Stage::ALL.map(Stage::as_str).join("|");
        write!(f, "unknown stage `{}`; expected {valid}", self.0)
    }
}

impl Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| UnknownStage(value.to_string()))
    }
}

/// Stage -> default win probability lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProbabilities([f64; 6]);

impl StageProbabilities {
    /// Values are given in canonical stage order.
    pub const fn new(values: [f64; 6]) -> Self {
        Self(values)
    }

    pub fn probability(&self, stage: Stage) -> f64 {
        self.0[stage.index()]
    }
}

pub const DEFAULT_STAGE_PROBABILITIES: StageProbabilities =
    StageProbabilities::new([0.05, 0.20, 0.40, 0.70, 1.00, 0.00]);

/// A sales opportunity owned by one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub contact_id: ContactId,
    pub title: String,
    pub value: f64,
    pub stage: Stage,
    pub probability: f64,
    pub expected_close: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub notes: String,
}

impl Deal {
    pub fn weighted_value(&self) -> f64 {
        self.value * self.probability
    }

    pub fn is_open(&self) -> bool {
        self.stage.is_open()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.contact_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(ValidationError::InvalidValue(self.value));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ValidationError::InvalidProbability(self.probability));
        }
        Ok(())
    }
}

/// Caller input for creating a deal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub contact_id: ContactId,
    pub title: String,
    pub value: f64,
    pub stage: Stage,
    /// Custom probability; `None` takes the stage default.
    pub probability: Option<f64>,
    pub expected_close: Option<NaiveDate>,
    pub notes: String,
}

impl NewDeal {
    pub fn new(contact_id: ContactId, title: impl Into<String>, value: f64) -> Self {
        Self {
            contact_id,
            title: title.into(),
            value,
            stage: Stage::Lead,
            probability: None,
            expected_close: None,
            notes: String::new(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_expected_close(mut self, expected_close: NaiveDate) -> Self {
        self.expected_close = Some(expected_close);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn into_deal(
        self,
        id: DealId,
        created_at: DateTime<Utc>,
        probabilities: &StageProbabilities,
    ) -> Deal {
        Deal {
            id,
            contact_id: self.contact_id,
            title: self.title,
            value: self.value,
            stage: self.stage,
            probability: self
                .probability
                .unwrap_or_else(|| probabilities.probability(self.stage)),
            expected_close: self.expected_close,
            created_at: to_storage_precision(created_at),
            notes: self.notes,
        }
    }
}
