//! Interaction repository contract and SQLite implementation.

use crate::model::contact::ContactId;
use crate::model::interaction::{Interaction, InteractionId};
use crate::repo::mapping::{format_timestamp, interaction_from_record, FieldRecord};
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, Params};

const INTERACTION_SELECT_SQL: &str = "SELECT
    id,
    contact_id,
    deal_id,
    type,
    notes,
    outcome,
    occurred_at
FROM interactions";

pub trait InteractionRepository {
    /// Inserts one interaction. Does not touch the owning contact.
    fn insert_interaction(&self, interaction: &Interaction) -> RepoResult<InteractionId>;
    fn get_interaction(&self, id: InteractionId) -> RepoResult<Option<Interaction>>;
    /// Most recent interactions first, at most `limit` rows.
    fn list_for_contact(&self, contact_id: ContactId, limit: u32)
        -> RepoResult<Vec<Interaction>>;
}

pub struct SqliteInteractionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInteractionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["contacts", "deals", "interactions"])?;
        Ok(Self { conn })
    }

    fn query_interactions<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Interaction>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut interactions = Vec::new();
        while let Some(row) = rows.next()? {
            interactions.push(interaction_from_record(&FieldRecord::from_row(row)?)?);
        }
        Ok(interactions)
    }
}

impl InteractionRepository for SqliteInteractionRepository<'_> {
    fn insert_interaction(&self, interaction: &Interaction) -> RepoResult<InteractionId> {
        interaction.validate()?;

        self.conn.execute(
            "INSERT INTO interactions (
                id,
                contact_id,
                deal_id,
                type,
                notes,
                outcome,
                occurred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                interaction.id.to_string(),
                interaction.contact_id.to_string(),
                interaction.deal_id.map(|id| id.to_string()),
                interaction.kind.as_str(),
                interaction.notes.as_str(),
                interaction.outcome.as_str(),
                format_timestamp(interaction.occurred_at),
            ],
        )?;

        Ok(interaction.id)
    }

    fn get_interaction(&self, id: InteractionId) -> RepoResult<Option<Interaction>> {
        let interactions = self.query_interactions(
            &format!("{INTERACTION_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
        )?;
        Ok(interactions.into_iter().next())
    }

    fn list_for_contact(
        &self,
        contact_id: ContactId,
        limit: u32,
    ) -> RepoResult<Vec<Interaction>> {
        self.query_interactions(
            &format!(
                "{INTERACTION_SELECT_SQL}
                 WHERE contact_id = ?1
                 ORDER BY occurred_at DESC, id ASC
                 LIMIT ?2;"
            ),
            params![contact_id.to_string(), i64::from(limit)],
        )
    }
}
