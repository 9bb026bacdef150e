//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Own every SQL statement touching `contacts`, `deals`, `interactions`.
//! - Return fully materialized entities built by [`mapping`].
//!
//! # Invariants
//! - Writes validate the entity before any SQL runs.
//! - Lookups that match nothing return `Ok(None)`, never an error.
//! - Store constraint violations surface unchanged as `RepoError::Db`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::deal::UnknownStage;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod contact_repo;
pub mod deal_repo;
pub mod interaction_repo;
pub mod mapping;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repositories, mappers and the service facade.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed its invariants before persistence.
    Validation(ValidationError),
    /// Stage name outside the canonical pipeline.
    InvalidStage(UnknownStage),
    /// Store failure, including constraint violations.
    Db(DbError),
    /// Persisted row cannot be turned into a valid entity.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl RepoError {
    /// True for duplicate emails and dangling contact/deal references.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_constraint_violation())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidStage(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted crm data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with crm_core::db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidStage(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UnknownStage> for RepoError {
    fn from(value: UnknownStage) -> Self {
        Self::InvalidStage(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that did not go through `db::open_db*`.
pub(crate) fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
