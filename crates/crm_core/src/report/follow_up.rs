//! Follow-up worklist: contacts with open deals who have gone quiet.
//!
//! # Invariants
//! - A contact without open deals never appears, however stale.
//! - One row per contact; weighted value is summed over open deals only.
//! - Ordered by summed weighted value, highest first.

use crate::model::contact::ContactId;
use crate::repo::mapping::{format_timestamp, parse_id, parse_timestamp, FieldRecord};
use crate::repo::RepoResult;
use crate::report::{round_money, CLOSED_STAGES_SQL};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowUpEntry {
    pub contact_id: ContactId,
    pub name: String,
    pub email: String,
    pub company: String,
    /// `None` when the contact was never contacted.
    pub days_since_contact: Option<i64>,
    pub open_deal_weighted_value: f64,
}

/// Lists contacts with open deals whose last contact is older than
/// `days_overdue` days before `now`, or who were never contacted.
pub fn follow_up_queue(
    conn: &Connection,
    now: DateTime<Utc>,
    days_overdue: i64,
) -> RepoResult<Vec<FollowUpEntry>> {
    let started_at = Instant::now();
    let cutoff = follow_up_cutoff(now, days_overdue);

    let sql = format!(
        "SELECT
            c.id AS id,
            c.name AS name,
            c.email AS email,
            c.company AS company,
            c.last_contact AS last_contact,
            SUM(d.value * d.probability) AS weighted
         FROM contacts c
         INNER JOIN deals d ON d.contact_id = c.id
         WHERE d.stage NOT IN ({})
           AND (c.last_contact IS NULL OR c.last_contact < ?1)
         GROUP BY c.id
         ORDER BY weighted DESC, c.name ASC, c.id ASC;",
        CLOSED_STAGES_SQL.as_str()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([format_timestamp(cutoff)])?;

    let mut queue = Vec::new();
    while let Some(row) = rows.next()? {
        let record = FieldRecord::from_row(row)?;
        let last_contact = record
            .optional_text("last_contact")?
            .map(|value| parse_timestamp(&value, "contacts.last_contact"))
            .transpose()?;
        queue.push(FollowUpEntry {
            contact_id: parse_id(&record.text("id")?, "contacts.id")?,
            name: record.text("name")?,
            email: record.text("email")?,
            company: record.optional_text("company")?.unwrap_or_default(),
            days_since_contact: last_contact.map(|at| (now - at).num_days()),
            open_deal_weighted_value: round_money(
                record.optional_real("weighted")?.unwrap_or_default(),
            ),
        });
    }

    debug!(
        "event=report_follow_up module=report status=ok days_overdue={days_overdue} contacts={} duration_ms={}",
        queue.len(),
        started_at.elapsed().as_millis()
    );
    Ok(queue)
}

/// `now - days_overdue`, clamped to four-digit years so the stored
/// timestamp text still compares lexically.
fn follow_up_cutoff(now: DateTime<Utc>, days_overdue: i64) -> DateTime<Utc> {
    let earliest = Utc
        .with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let latest = Utc
        .with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeDelta::try_days(days_overdue)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(if days_overdue < 0 { latest } else { earliest })
        .clamp(earliest, latest)
}
