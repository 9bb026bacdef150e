//! Row <-> entity conversion.
//!
//! # Responsibility
//! - Turn a generic column-name -> value record into typed entities.
//! - Own the on-disk text formats for timestamps, dates and tags.
//!
//! # Invariants
//! - Mapping functions are pure: no connection, no clock.
//! - Timestamps are written as UTC RFC 3339 with exactly six fractional
//!   digits, so lexical order in SQL equals chronological order.
//! - Tags are comma joined; empty entries are dropped on read.

use crate::model::contact::Contact;
use crate::model::deal::{Deal, Stage};
use crate::model::interaction::{Interaction, InteractionKind};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use std::collections::BTreeMap;
use uuid::Uuid;

const TAG_DELIMITER: &str = ",";
const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Column-name keyed snapshot of one result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRecord {
    fields: BTreeMap<String, Value>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one field; used to build records by hand.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(column.to_string(), value.into());
        self
    }

    /// Copies every column of a result row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let names: Vec<String> = row
            .as_ref()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut fields = BTreeMap::new();
        for (index, name) in names.into_iter().enumerate() {
            fields.insert(name, Value::from(row.get_ref(index)?));
        }
        Ok(Self { fields })
    }

    fn value(&self, column: &str) -> RepoResult<&Value> {
        self.fields
            .get(column)
            .ok_or_else(|| RepoError::InvalidData(format!("missing column `{column}`")))
    }

    pub fn text(&self, column: &str) -> RepoResult<String> {
        self.optional_text(column)?
            .ok_or_else(|| RepoError::InvalidData(format!("column `{column}` is null")))
    }

    pub fn optional_text(&self, column: &str) -> RepoResult<Option<String>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value.clone())),
            other => Err(RepoError::InvalidData(format!(
                "column `{column}` expected text, got {:?}",
                other.data_type()
            ))),
        }
    }

    pub fn real(&self, column: &str) -> RepoResult<f64> {
        self.optional_real(column)?
            .ok_or_else(|| RepoError::InvalidData(format!("column `{column}` is null")))
    }

    pub fn optional_real(&self, column: &str) -> RepoResult<Option<f64>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Real(value) => Ok(Some(*value)),
            Value::Integer(value) => Ok(Some(*value as f64)),
            other => Err(RepoError::InvalidData(format!(
                "column `{column}` expected a number, got {:?}",
                other.data_type()
            ))),
        }
    }
}

pub fn contact_from_record(record: &FieldRecord) -> RepoResult<Contact> {
    Ok(Contact {
        id: parse_id(&record.text("id")?, "contacts.id")?,
        name: record.text("name")?,
        email: record.text("email")?,
        phone: record.optional_text("phone")?.unwrap_or_default(),
        company: record.optional_text("company")?.unwrap_or_default(),
        tags: split_tags(record.optional_text("tags")?.as_deref().unwrap_or("")),
        notes: record.optional_text("notes")?.unwrap_or_default(),
        created_at: parse_timestamp(&record.text("created_at")?, "contacts.created_at")?,
        last_contact: record
            .optional_text("last_contact")?
            .map(|value| parse_timestamp(&value, "contacts.last_contact"))
            .transpose()?,
    })
}

pub fn deal_from_record(record: &FieldRecord) -> RepoResult<Deal> {
    let stage_text = record.text("stage")?;
    let stage = stage_text.parse::<Stage>().map_err(|_| {
        RepoError::InvalidData(format!("invalid stage `{stage_text}` in deals.stage"))
    })?;

    let deal = Deal {
        id: parse_id(&record.text("id")?, "deals.id")?,
        contact_id: parse_id(&record.text("contact_id")?, "deals.contact_id")?,
        title: record.text("title")?,
        value: record.real("value")?,
        stage,
        probability: record.real("probability")?,
        expected_close: record
            .optional_text("expected_close")?
            .map(|value| parse_date(&value, "deals.expected_close"))
            .transpose()?,
        created_at: parse_timestamp(&record.text("created_at")?, "deals.created_at")?,
        notes: record.optional_text("notes")?.unwrap_or_default(),
    };
    deal.validate()
        .map_err(|err| RepoError::InvalidData(format!("deal {}: {err}", deal.id)))?;
    Ok(deal)
}

pub fn interaction_from_record(record: &FieldRecord) -> RepoResult<Interaction> {
    let kind_text = record.text("type")?;
    let kind = InteractionKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid interaction type `{kind_text}` in interactions.type"
        ))
    })?;

    Ok(Interaction {
        id: parse_id(&record.text("id")?, "interactions.id")?,
        contact_id: parse_id(&record.text("contact_id")?, "interactions.contact_id")?,
        deal_id: record
            .optional_text("deal_id")?
            .map(|value| parse_id(&value, "interactions.deal_id"))
            .transpose()?,
        kind,
        notes: record.text("notes")?,
        outcome: record.optional_text("outcome")?.unwrap_or_default(),
        occurred_at: parse_timestamp(&record.text("occurred_at")?, "interactions.occurred_at")?,
    })
}

pub fn parse_id(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses RFC 3339, falling back to offset-less ISO-8601 read as UTC.
pub fn parse_timestamp(value: &str, column: &str) -> RepoResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, NAIVE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_DELIMITER)
}

pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(TAG_DELIMITER)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use rusqlite::types::Null;

    fn contact_record() -> FieldRecord {
        FieldRecord::new()
            .with("id", "00000000-0000-0000-0000-000000000001".to_string())
            .with("name", "Alice Ng".to_string())
            .with("email", "alice@example.com".to_string())
            .with("phone", Null)
            .with("company", "Acme Corp".to_string())
            .with("tags", "vip,,enterprise".to_string())
            .with("notes", String::new())
            .with("created_at", "2026-01-02T03:04:05.000006Z".to_string())
            .with("last_contact", Null)
    }

    #[test]
    fn contact_record_maps_optional_fields_and_drops_empty_tags() {
        let contact = contact_from_record(&contact_record()).unwrap();
        assert_eq!(contact.id, Uuid::from_u128(1));
        assert_eq!(contact.phone, "");
        assert_eq!(contact.tags, vec!["vip", "enterprise"]);
        assert_eq!(contact.created_at.nanosecond(), 6_000);
        assert_eq!(contact.last_contact, None);
    }

    #[test]
    fn contact_record_rejects_bad_uuid_and_missing_columns() {
        let record = contact_record().with("id", "nope".to_string());
        assert!(matches!(
            contact_from_record(&record),
            Err(RepoError::InvalidData(message)) if message.contains("contacts.id")
        ));

        let record = FieldRecord::new().with("id", Uuid::from_u128(1).to_string());
        assert!(matches!(
            contact_from_record(&record),
            Err(RepoError::InvalidData(message)) if message.contains("missing column `name`")
        ));
    }

    #[test]
    fn deal_record_accepts_integer_value_and_rejects_unknown_stage() {
        let record = FieldRecord::new()
            .with("id", Uuid::from_u128(2).to_string())
            .with("contact_id", Uuid::from_u128(1).to_string())
            .with("title", "Big Deal".to_string())
            .with("value", 10_000_i64)
            .with("stage", "proposal".to_string())
            .with("probability", 0.4)
            .with("expected_close", "2026-11-02".to_string())
            .with("created_at", "2026-01-02T03:04:05.000000Z".to_string())
            .with("notes", Null);
        let deal = deal_from_record(&record).unwrap();
        assert_eq!(deal.value, 10_000.0);
        assert_eq!(deal.stage, Stage::Proposal);
        assert_eq!(deal.expected_close, NaiveDate::from_ymd_opt(2026, 11, 2));

        let record = record.with("stage", "won".to_string());
        assert!(matches!(
            deal_from_record(&record),
            Err(RepoError::InvalidData(_))
        ));
    }

    #[test]
    fn timestamps_sort_lexically_and_parse_naive_iso() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(earlier), "2026-01-01T09:00:00.000000Z");

        let parsed = parse_timestamp("2026-01-01T09:00:00.5", "t").unwrap();
        assert_eq!(parsed, earlier + chrono::Duration::milliseconds(500));
        assert!(parse_timestamp("yesterday", "t").is_err());
    }

    #[test]
    fn tags_join_and_split() {
        let tags = vec!["vip".to_string(), "enterprise".to_string()];
        assert_eq!(join_tags(&tags), "vip,enterprise");
        assert_eq!(split_tags(""), Vec::<String>::new());
        assert_eq!(split_tags(",vip,"), vec!["vip"]);
    }
}
