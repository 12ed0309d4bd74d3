use sqlx::sqlite::SqliteQueryResult;

use crate::interaction::InteractionKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(#[from] garde::Report),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Book does not exist or user has not commented on this book.")]
    UnknownBook,

    #[error("User has not commented on this book.")]
    UnknownReview,

    #[error("User has already commented on this book.")]
    DuplicateReview,

    #[error("Cannot update a deleted comment. Please restore it first.")]
    DeletedReview,

    #[error("Comment does not exist.")]
    UnknownComment,

    #[error("User cannot {} their own comment.", .0.verb())]
    OwnComment(InteractionKind),

    #[error("User has already {} this comment.", .0.past_tense())]
    AlreadyInteracted(InteractionKind),

    #[error("{}", missing_interaction_message(.0))]
    MissingInteraction(InteractionKind),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Write conflict on {0}")]
    WriteConflict(&'static str),

    #[error("Malformed ledger data: {0}")]
    MalformedLedger(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, Error::WriteConflict(_))
    }
}

// The flag wording differs from the like one, clients match on it.
fn missing_interaction_message(kind: &InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Like => "User has not liked this comment.",
        InteractionKind::Flag => "User has not flagged this comment before",
    }
}

/// Classifies unique constraint violations as write conflicts, so the
/// caller retries and re-reads instead of reporting a database error.
pub(crate) fn conflict_on_unique(error: sqlx::Error, entity: &'static str) -> Error {
    match &error {
        sqlx::Error::Database(e) if e.is_unique_violation() => Error::WriteConflict(entity),
        _ => Error::DatabaseError(error),
    }
}

pub(crate) fn guard_version(result: SqliteQueryResult, entity: &'static str) -> Result<()> {
    if result.rows_affected() == 0 {
        Err(Error::WriteConflict(entity))
    } else {
        Ok(())
    }
}
