//! Interaction log entries.
//!
//! # Invariants
//! - Every interaction belongs to one contact and at most one deal.
//! - Logging an interaction is the only way a contact's `last_contact` moves.

use super::contact::ContactId;
use super::deal::DealId;
use super::{to_storage_precision, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InteractionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Email,
    Meeting,
    Demo,
    Note,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Meeting => "meeting",
            Self::Demo => "demo",
            Self::Note => "note",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "call" => Some(Self::Call),
            "email" => Some(Self::Email),
            "meeting" => Some(Self::Meeting),
            "demo" => Some(Self::Demo),
            "note" => Some(Self::Note),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub contact_id: ContactId,
    pub deal_id: Option<DealId>,
    /// Serialized as `type` to match the storage column.
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub notes: String,
    pub outcome: String,
    pub occurred_at: DateTime<Utc>,
}

impl Interaction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.contact_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if matches!(self.deal_id, Some(id) if id.is_nil()) {
            return Err(ValidationError::NilId);
        }
        Ok(())
    }
}

/// Caller input for logging an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub contact_id: ContactId,
    pub kind: InteractionKind,
    pub notes: String,
    pub deal_id: Option<DealId>,
    pub outcome: String,
    /// Explicit occurrence time; `None` means "now".
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewInteraction {
    pub fn new(contact_id: ContactId, kind: InteractionKind, notes: impl Into<String>) -> Self {
        Self {
            contact_id,
            kind,
            notes: notes.into(),
            deal_id: None,
            outcome: String::new(),
            occurred_at: None,
        }
    }

    pub fn with_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Resolves into a stored interaction, using `now` when no explicit
    /// occurrence time was given. The time is truncated to storage precision.
    pub fn into_interaction(self, id: InteractionId, now: DateTime<Utc>) -> Interaction {
        Interaction {
            id,
            contact_id: self.contact_id,
            deal_id: self.deal_id,
            kind: self.kind,
            notes: self.notes,
            outcome: self.outcome,
            occurred_at: to_storage_precision(self.occurred_at.unwrap_or(now)),
        }
    }
}
