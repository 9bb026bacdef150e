//! Contact domain model.
//!
//! # Invariants
//! - `email` is globally unique (enforced by storage); its format is not
//!   checked.
//! - `last_contact` only moves through interaction logging.
//! - Tags are non-empty and never contain the storage delimiter `,`.

use super::{to_storage_precision, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ContactId = Uuid;

/// A person the business tracks deals and interactions for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    /// Occurrence time of the most recently logged interaction.
    pub last_contact: Option<DateTime<Utc>>,
}

impl Contact {
    /// Whole days elapsed since the last logged interaction.
    ///
    /// Returns `None` when the contact was never contacted.
    pub fn days_since_contact(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_contact.map(|at| (now - at).num_days())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        validate_tags(&self.tags)
    }
}

/// Caller input for creating a contact; id and `created_at` are assigned
/// by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub tags: Vec<String>,
    pub notes: String,
}

impl NewContact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    /// Sets tags, trimming each and dropping blank entries.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = clean_tags(tags);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// `created_at` is truncated to storage precision.
    pub fn into_contact(self, id: ContactId, created_at: DateTime<Utc>) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            tags: self.tags,
            notes: self.notes,
            created_at: to_storage_precision(created_at),
            last_contact: None,
        }
    }
}

/// Field-level contact update. Only whitelisted fields exist here; a patch
/// with every field `None` is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl ContactPatch {
    /// Builds a patch from loosely typed `(field, value)` pairs.
    ///
    /// Unknown field names are ignored. `tags` values are comma separated.
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut patch = Self::default();
        for (field, value) in fields {
            match field {
                "name" => patch.name = Some(value.to_string()),
                "email" => patch.email = Some(value.to_string()),
                "phone" => patch.phone = Some(value.to_string()),
                "company" => patch.company = Some(value.to_string()),
                "tags" => patch.tags = Some(clean_tags(value.split(','))),
                "notes" => patch.notes = Some(value.to_string()),
                _ => {}
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::BlankName);
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

/// Filter for contact listing. `company` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactListQuery {
    /// Exact company match.
    pub company: Option<String>,
    /// Case-insensitive substring match against the stored tag list.
    pub tag: Option<String>,
}

fn clean_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    match tags
        .iter()
        .find(|tag| tag.trim().is_empty() || tag.contains(','))
    {
        Some(bad) => Err(ValidationError::InvalidTag(bad.clone())),
        None => Ok(()),
    }
}
