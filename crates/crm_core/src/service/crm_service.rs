//! CRM use-case facade.
//!
//! # Responsibility
//! - Create contacts, deals and interactions with factory-assigned ids and
//!   clock-assigned timestamps.
//! - Validate caller arguments (stage names) before any write.
//! - Run the pipeline, forecast and follow-up reports against "now".
//!
//! # Invariants
//! - `log_interaction` inserts the interaction and overwrites the contact's
//!   `last_contact` in one transaction.
//! - Stage advances always take the probability from the stage table.

use crate::clock::{Clock, SystemClock};
use crate::config::ReportDefaults;
use crate::ids::{IdGenerator, UuidV4Generator};
use crate::model::contact::{Contact, ContactId, ContactListQuery, ContactPatch, NewContact};
use crate::model::deal::{Deal, DealId, NewDeal, Stage, StageProbabilities, DEFAULT_STAGE_PROBABILITIES};
use crate::model::interaction::{Interaction, NewInteraction};
use crate::repo::contact_repo::{ContactRepository, SqliteContactRepository};
use crate::repo::deal_repo::{DealRepository, SqliteDealRepository};
use crate::repo::interaction_repo::{InteractionRepository, SqliteInteractionRepository};
use crate::repo::RepoResult;
use crate::report::follow_up::{follow_up_queue, FollowUpEntry};
use crate::report::forecast::{forecast_revenue, RevenueForecast};
use crate::report::pipeline::{deal_pipeline, DealPipeline};
use log::{info, warn};
use rusqlite::Connection;

pub struct CrmService<'conn, C: Clock = SystemClock, G: IdGenerator = UuidV4Generator> {
    conn: &'conn Connection,
    contacts: SqliteContactRepository<'conn>,
    deals: SqliteDealRepository<'conn>,
    interactions: SqliteInteractionRepository<'conn>,
    clock: C,
    ids: G,
    probabilities: &'static StageProbabilities,
    defaults: ReportDefaults,
}

impl<'conn> CrmService<'conn> {
    /// Service over a migrated connection using the system clock and v4 ids.
    pub fn new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_parts(conn, SystemClock, UuidV4Generator)
    }
}

impl<'conn, C: Clock, G: IdGenerator> CrmService<'conn, C, G> {
    pub fn with_parts(conn: &'conn Connection, clock: C, ids: G) -> RepoResult<Self> {
        Ok(Self {
            conn,
            contacts: SqliteContactRepository::try_new(conn)?,
            deals: SqliteDealRepository::try_new(conn)?,
            interactions: SqliteInteractionRepository::try_new(conn)?,
            clock,
            ids,
            probabilities: &DEFAULT_STAGE_PROBABILITIES,
            defaults: ReportDefaults::default(),
        })
    }

    pub fn with_report_defaults(mut self, defaults: ReportDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn add_contact(&self, input: NewContact) -> RepoResult<Contact> {
        let contact = input.into_contact(self.ids.next_id(), self.clock.now());
        self.contacts.insert_contact(&contact)?;
        info!("event=contact_add module=service status=ok contact_id={}", contact.id);
        Ok(contact)
    }

    pub fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        self.contacts.get_contact(id)
    }

    pub fn find_contact_by_email(&self, email: &str) -> RepoResult<Option<Contact>> {
        self.contacts.find_contact_by_email(email)
    }

    /// Applies whitelisted field changes. `false` means nothing was updated.
    pub fn update_contact(&self, id: ContactId, patch: &ContactPatch) -> RepoResult<bool> {
        self.contacts.update_contact(id, patch)
    }

    pub fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        self.contacts.list_contacts(query)
    }

    /// Records an interaction and makes its occurrence time the contact's
    /// `last_contact`, even if the stored value is later.
    pub fn log_interaction(&self, input: NewInteraction) -> RepoResult<Interaction> {
        let interaction = input.into_interaction(self.ids.next_id(), self.clock.now());

        let tx = self.conn.unchecked_transaction()?;
        self.interactions.insert_interaction(&interaction)?;
        if !self
            .contacts
            .set_last_contact(interaction.contact_id, interaction.occurred_at)?
        {
            warn!(
                "event=interaction_log module=service status=warn reason=contact_not_updated contact_id={}",
                interaction.contact_id
            );
        }
        tx.commit()?;

        info!(
            "event=interaction_log module=service status=ok interaction_id={} type={}",
            interaction.id,
            interaction.kind.as_str()
        );
        Ok(interaction)
    }

    /// Interactions for a contact, newest first.
    pub fn get_contact_history(
        &self,
        contact_id: ContactId,
        limit: Option<u32>,
    ) -> RepoResult<Vec<Interaction>> {
        let limit = limit.unwrap_or(self.defaults.history_limit);
        self.interactions.list_for_contact(contact_id, limit)
    }

    pub fn add_deal(&self, input: NewDeal) -> RepoResult<Deal> {
        let deal = input.into_deal(self.ids.next_id(), self.clock.now(), self.probabilities);
        self.deals.insert_deal(&deal)?;
        info!(
            "event=deal_add module=service status=ok deal_id={} stage={}",
            deal.id, deal.stage
        );
        Ok(deal)
    }

    pub fn get_deal(&self, id: DealId) -> RepoResult<Option<Deal>> {
        self.deals.get_deal(id)
    }

    pub fn list_deals_for_contact(&self, contact_id: ContactId) -> RepoResult<Vec<Deal>> {
        self.deals.list_deals_for_contact(contact_id)
    }

    /// Moves a deal to `stage`, resetting its probability to the stage
    /// default. Unknown stage names fail before anything is written.
    ///
    /// Returns `false` when the deal does not exist.
    pub fn advance_deal_stage(&self, id: DealId, stage: &str) -> RepoResult<bool> {
        let stage = stage.parse::<Stage>()?;
        let changed = self.deals.advance_stage(id, stage, self.probabilities)?;
        info!(
            "event=deal_advance module=service status=ok deal_id={id} stage={stage} changed={changed}"
        );
        Ok(changed)
    }

    pub fn get_deal_pipeline(&self) -> RepoResult<DealPipeline> {
        deal_pipeline(self.conn)
    }

    /// Forecast over `days` (default from [`ReportDefaults`]) from today.
    pub fn forecast_revenue(&self, days: Option<i64>) -> RepoResult<RevenueForecast> {
        let days = days.unwrap_or(self.defaults.forecast_days);
        forecast_revenue(self.conn, self.clock.today(), days)
    }

    /// Contacts with open deals not contacted within `days_overdue` days.
    pub fn get_follow_up_queue(&self, days_overdue: Option<i64>) -> RepoResult<Vec<FollowUpEntry>> {
        let days_overdue = days_overdue.unwrap_or(self.defaults.follow_up_overdue_days);
        follow_up_queue(self.conn, self.clock.now(), days_overdue)
    }
}
