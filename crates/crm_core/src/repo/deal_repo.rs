//! Deal repository contract and SQLite implementation.
//!
//! # Invariants
//! - `contact_id` must reference an existing contact (foreign key).
//! - Stage changes always rewrite `probability` from the lookup table in the
//!   same statement.

use crate::model::contact::ContactId;
use crate::model::deal::{Deal, DealId, Stage, StageProbabilities};
use crate::repo::mapping::{deal_from_record, format_date, format_timestamp, FieldRecord};
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, Params};

const DEAL_SELECT_SQL: &str = "SELECT
    id,
    contact_id,
    title,
    value,
    stage,
    probability,
    expected_close,
    notes,
    created_at
FROM deals";

pub trait DealRepository {
    fn insert_deal(&self, deal: &Deal) -> RepoResult<DealId>;
    fn get_deal(&self, id: DealId) -> RepoResult<Option<Deal>>;
    /// Deals owned by one contact, oldest first.
    fn list_deals_for_contact(&self, contact_id: ContactId) -> RepoResult<Vec<Deal>>;
    /// Moves a deal to `stage` with the table's default probability.
    ///
    /// Returns `false` when the deal does not exist.
    fn advance_stage(
        &self,
        id: DealId,
        stage: Stage,
        probabilities: &StageProbabilities,
    ) -> RepoResult<bool>;
}

pub struct SqliteDealRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDealRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["contacts", "deals"])?;
        Ok(Self { conn })
    }

    fn query_deals<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Deal>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut deals = Vec::new();
        while let Some(row) = rows.next()? {
            deals.push(deal_from_record(&FieldRecord::from_row(row)?)?);
        }
        Ok(deals)
    }
}

impl DealRepository for SqliteDealRepository<'_> {
    fn insert_deal(&self, deal: &Deal) -> RepoResult<DealId> {
        deal.validate()?;

        self.conn.execute(
            "INSERT INTO deals (
                id,
                contact_id,
                title,
                value,
                stage,
                probability,
                expected_close,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                deal.id.to_string(),
                deal.contact_id.to_string(),
                deal.title.as_str(),
                deal.value,
                deal.stage.as_str(),
                deal.probability,
                deal.expected_close.map(format_date),
                deal.notes.as_str(),
                format_timestamp(deal.created_at),
            ],
        )?;

        Ok(deal.id)
    }

    fn get_deal(&self, id: DealId) -> RepoResult<Option<Deal>> {
        let deals = self.query_deals(
            &format!("{DEAL_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
        )?;
        Ok(deals.into_iter().next())
    }

    fn list_deals_for_contact(&self, contact_id: ContactId) -> RepoResult<Vec<Deal>> {
        self.query_deals(
            &format!("{DEAL_SELECT_SQL} WHERE contact_id = ?1 ORDER BY created_at ASC, id ASC;"),
            [contact_id.to_string()],
        )
    }

    fn advance_stage(
        &self,
        id: DealId,
        stage: Stage,
        probabilities: &StageProbabilities,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE deals SET stage = ?1, probability = ?2 WHERE id = ?3;",
            params![
                stage.as_str(),
                probabilities.probability(stage),
                id.to_string()
            ],
        )?;
        Ok(changed > 0)
    }
}
