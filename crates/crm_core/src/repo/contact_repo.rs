//! Contact repository contract and SQLite implementation.
//!
//! # Invariants
//! - `email` uniqueness is left to the store's UNIQUE constraint.
//! - `update_contact` only touches whitelisted columns and never
//!   `last_contact`, which belongs to interaction logging.

use crate::model::contact::{Contact, ContactId, ContactListQuery, ContactPatch};
use crate::repo::mapping::{contact_from_record, format_timestamp, join_tags, FieldRecord};
use crate::repo::{ensure_connection_ready, RepoResult};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    phone,
    company,
    tags,
    notes,
    created_at,
    last_contact
FROM contacts";

pub trait ContactRepository {
    fn insert_contact(&self, contact: &Contact) -> RepoResult<ContactId>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    fn find_contact_by_email(&self, email: &str) -> RepoResult<Option<Contact>>;
    /// Returns `false` for an empty patch or an unknown id.
    fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> RepoResult<bool>;
    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>>;
    /// Overwrites `last_contact` without comparing against the stored value.
    fn set_last_contact(&self, id: ContactId, at: DateTime<Utc>) -> RepoResult<bool>;
}

pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["contacts"])?;
        Ok(Self { conn })
    }

    fn query_contacts(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(contact_from_record(&FieldRecord::from_row(row)?)?);
        }
        Ok(contacts)
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn insert_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        contact.validate()?;

        self.conn.execute(
            "INSERT INTO contacts (
                id,
                name,
                email,
                phone,
                company,
                tags,
                notes,
                created_at,
                last_contact
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                contact.id.to_string(),
                contact.name.as_str(),
                contact.email.as_str(),
                contact.phone.as_str(),
                contact.company.as_str(),
                join_tags(&contact.tags),
                contact.notes.as_str(),
                format_timestamp(contact.created_at),
                contact.last_contact.map(format_timestamp),
            ],
        )?;

        Ok(contact.id)
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let contacts = self.query_contacts(
            &format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(contacts.into_iter().next())
    }

    fn find_contact_by_email(&self, email: &str) -> RepoResult<Option<Contact>> {
        let contacts = self.query_contacts(
            &format!("{CONTACT_SELECT_SQL} WHERE email = ?1;"),
            vec![Value::Text(email.to_string())],
        )?;
        Ok(contacts.into_iter().next())
    }

    fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> RepoResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }
        patch.validate()?;

        let mut assignments: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        let text_fields = [
            ("name = ?", &patch.name),
            ("email = ?", &patch.email),
            ("phone = ?", &patch.phone),
            ("company = ?", &patch.company),
            ("notes = ?", &patch.notes),
        ];
        for (assignment, value) in text_fields {
            if let Some(value) = value {
                assignments.push(assignment);
                bind_values.push(Value::Text(value.clone()));
            }
        }
        if let Some(tags) = &patch.tags {
            assignments.push("tags = ?");
            bind_values.push(Value::Text(join_tags(tags)));
        }

        let sql = format!(
            "UPDATE contacts SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        debug!(
            "event=contact_update module=repo status=ok fields={} changed={changed}",
            assignments.len()
        );
        Ok(changed > 0)
    }

    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        let mut sql = String::from(CONTACT_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(company) = query.company.as_deref().filter(|value| !value.is_empty()) {
            sql.push_str(" WHERE company = ?");
            bind_values.push(Value::Text(company.to_string()));
        } else if let Some(tag) = query.tag.as_deref().filter(|value| !value.is_empty()) {
            sql.push_str(" WHERE instr(lower(tags), lower(?)) > 0");
            bind_values.push(Value::Text(tag.to_string()));
        }

        sql.push_str(" ORDER BY name ASC, id ASC;");
        self.query_contacts(&sql, bind_values)
    }

    fn set_last_contact(&self, id: ContactId, at: DateTime<Utc>) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE contacts SET last_contact = ?1 WHERE id = ?2;",
            params![format_timestamp(at), id.to_string()],
        )?;
        Ok(changed > 0)
    }
}
