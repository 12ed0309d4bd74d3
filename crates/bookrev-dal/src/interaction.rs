use serde::Serialize;
use sqlx::{Acquire as _, Pool};
use tracing::{debug, warn};

use crate::{
    MAX_TX_RETRIES,
    error::{Error, Result, conflict_on_unique, guard_version},
    review,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Like,
    Flag,
}

impl InteractionKind {
    pub fn verb(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Flag => "flag",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            InteractionKind::Like => "liked",
            InteractionKind::Flag => "flagged",
        }
    }

    /// Parses the method value of an interaction request, "like" and
    /// "unlike" for likes, "flag" and "unflag" for flags.
    pub fn parse_method(&self, method: &str) -> Option<ToggleDirection> {
        if method == self.verb() {
            Some(ToggleDirection::On)
        } else if method.strip_prefix("un") == Some(self.verb()) {
            Some(ToggleDirection::Off)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDirection {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Activated(InteractionKind),
    Cleared(InteractionKind),
}

impl InteractionOutcome {
    pub fn message(&self) -> String {
        match self {
            InteractionOutcome::Activated(kind) => {
                format!("Comment {} successfully.", kind.past_tense())
            }
            InteractionOutcome::Cleared(kind) => {
                format!("Comment un{} successfully.", kind.past_tense())
            }
        }
    }
}

/// One ledger record per (user, book) pair. Owner lists hold user guids
/// of review authors whose review within the book the user liked or
/// flagged, so each actor can vote at most once per review.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LedgerEntry {
    pub user_guid: String,
    pub book_guid: String,
    pub liked_comment_owners: Vec<String>,
    pub flagged_comment_owners: Vec<String>,
    pub version: i64,
}

impl LedgerEntry {
    fn new(user_guid: impl Into<String>, book_guid: impl Into<String>) -> Self {
        LedgerEntry {
            user_guid: user_guid.into(),
            book_guid: book_guid.into(),
            liked_comment_owners: Vec::new(),
            flagged_comment_owners: Vec::new(),
            version: 1,
        }
    }

    pub fn owners(&self, kind: InteractionKind) -> &[String] {
        match kind {
            InteractionKind::Like => &self.liked_comment_owners,
            InteractionKind::Flag => &self.flagged_comment_owners,
        }
    }

    fn owners_mut(&mut self, kind: InteractionKind) -> &mut Vec<String> {
        match kind {
            InteractionKind::Like => &mut self.liked_comment_owners,
            InteractionKind::Flag => &mut self.flagged_comment_owners,
        }
    }
}

// Owner lists are stored as JSON arrays in text columns.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    user_guid: String,
    book_guid: String,
    liked_comment_owners: String,
    flagged_comment_owners: String,
    version: i64,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = serde_json::Error;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            user_guid: row.user_guid,
            book_guid: row.book_guid,
            liked_comment_owners: serde_json::from_str(&row.liked_comment_owners)?,
            flagged_comment_owners: serde_json::from_str(&row.flagged_comment_owners)?,
            version: row.version,
        })
    }
}

pub type InteractionRepository = InteractionRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct InteractionRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> InteractionRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>
        + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn get(&self, user_guid: &str, book_guid: &str) -> Result<Option<LedgerEntry>> {
        fetch(&self.executor, user_guid, book_guid).await
    }

    /// Turns a like or flag of a review on or off on behalf of the user.
    /// The per review counter and the user ledger move in one
    /// transaction, retried on write conflicts.
    pub async fn toggle(
        &self,
        comment_guid: &str,
        user_guid: &str,
        kind: InteractionKind,
        direction: ToggleDirection,
    ) -> Result<InteractionOutcome> {
        let mut attempt = 1;
        loop {
            match self
                .toggle_once(comment_guid, user_guid, kind, direction)
                .await
            {
                Err(e) if e.is_conflict() && attempt < MAX_TX_RETRIES => {
                    warn!("Interaction write conflict on attempt {attempt}, retrying: {e}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn toggle_once(
        &self,
        comment_guid: &str,
        user_guid: &str,
        kind: InteractionKind,
        direction: ToggleDirection,
    ) -> Result<InteractionOutcome> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;

        let record = review::fetch_by_guid(&mut *transaction, comment_guid)
            .await?
            .filter(|record| !record.is_deleted)
            .ok_or(Error::UnknownComment)?;

        if record.user_guid == user_guid {
            return Err(Error::OwnComment(kind));
        }

        let entry = fetch(&mut *transaction, user_guid, &record.book_guid).await?;
        let entry_exists = entry.is_some();
        let mut entry =
            entry.unwrap_or_else(|| LedgerEntry::new(user_guid, record.book_guid.clone()));

        let owners = entry.owners_mut(kind);
        let active = owners.iter().any(|owner| owner == &record.user_guid);

        match direction {
            ToggleDirection::On if active => return Err(Error::AlreadyInteracted(kind)),
            ToggleDirection::Off if !active => return Err(Error::MissingInteraction(kind)),
            ToggleDirection::On => owners.push(record.user_guid.clone()),
            ToggleDirection::Off => owners.retain(|owner| owner != &record.user_guid),
        }

        adjust_counter(&mut *transaction, &record, kind, direction).await?;

        if entry_exists {
            update(&mut *transaction, &entry).await?;
        } else {
            insert(&mut *transaction, &entry).await?;
        }

        transaction.commit().await?;
        debug!(
            "User {user_guid} {:?} {kind:?} on review {comment_guid}",
            direction
        );

        Ok(match direction {
            ToggleDirection::On => InteractionOutcome::Activated(kind),
            ToggleDirection::Off => InteractionOutcome::Cleared(kind),
        })
    }
}

async fn adjust_counter<'c, E>(
    executor: E,
    record: &review::ReviewRecord,
    kind: InteractionKind,
    direction: ToggleDirection,
) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let count = match kind {
        InteractionKind::Like => record.num_of_likes,
        InteractionKind::Flag => record.num_of_flags,
    };
    let count = match direction {
        ToggleDirection::On => count + 1,
        ToggleDirection::Off => (count - 1).max(0),
    };
    let column = match kind {
        InteractionKind::Like => "num_of_likes",
        InteractionKind::Flag => "num_of_flags",
    };
    let sql =
        format!("UPDATE review SET {column} = ?, version = ? WHERE comment_guid = ? AND version = ?");
    let result = sqlx::query(&sql)
        .bind(count)
        .bind(record.version + 1)
        .bind(&record.comment_guid)
        .bind(record.version)
        .execute(executor)
        .await?;
    guard_version(result, "review")
}

pub(crate) async fn fetch<'c, E>(
    executor: E,
    user_guid: &str,
    book_guid: &str,
) -> Result<Option<LedgerEntry>>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let row = sqlx::query_as::<_, LedgerRow>(
        "SELECT * FROM interaction_ledger WHERE user_guid = ? AND book_guid = ?",
    )
    .bind(user_guid)
    .bind(book_guid)
    .fetch_optional(executor)
    .await?;
    row.map(LedgerEntry::try_from).transpose().map_err(Error::from)
}

async fn insert<'c, E>(executor: E, entry: &LedgerEntry) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    sqlx::query(
        "INSERT INTO interaction_ledger \
         (user_guid, book_guid, liked_comment_owners, flagged_comment_owners, version) \
         VALUES (?, ?, ?, ?, 1)",
    )
    .bind(&entry.user_guid)
    .bind(&entry.book_guid)
    .bind(serde_json::to_string(&entry.liked_comment_owners)?)
    .bind(serde_json::to_string(&entry.flagged_comment_owners)?)
    .execute(executor)
    .await
    .map_err(|e| conflict_on_unique(e, "interaction ledger"))?;
    Ok(())
}

async fn update<'c, E>(executor: E, entry: &LedgerEntry) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let result = sqlx::query(
        "UPDATE interaction_ledger SET liked_comment_owners = ?, flagged_comment_owners = ?, \
         version = ? WHERE user_guid = ? AND book_guid = ? AND version = ?",
    )
    .bind(serde_json::to_string(&entry.liked_comment_owners)?)
    .bind(serde_json::to_string(&entry.flagged_comment_owners)?)
    .bind(entry.version + 1)
    .bind(&entry.user_guid)
    .bind(&entry.book_guid)
    .bind(entry.version)
    .execute(executor)
    .await?;
    guard_version(result, "interaction ledger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(
            InteractionKind::Like.parse_method("like"),
            Some(ToggleDirection::On)
        );
        assert_eq!(
            InteractionKind::Like.parse_method("unlike"),
            Some(ToggleDirection::Off)
        );
        assert_eq!(InteractionKind::Like.parse_method("flag"), None);
        assert_eq!(InteractionKind::Like.parse_method("LIKE"), None);
        assert_eq!(
            InteractionKind::Flag.parse_method("flag"),
            Some(ToggleDirection::On)
        );
        assert_eq!(
            InteractionKind::Flag.parse_method("unflag"),
            Some(ToggleDirection::Off)
        );
        assert_eq!(InteractionKind::Flag.parse_method("unlike"), None);
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            InteractionOutcome::Activated(InteractionKind::Like).message(),
            "Comment liked successfully."
        );
        assert_eq!(
            InteractionOutcome::Cleared(InteractionKind::Like).message(),
            "Comment unliked successfully."
        );
        assert_eq!(
            InteractionOutcome::Activated(InteractionKind::Flag).message(),
            "Comment flagged successfully."
        );
        assert_eq!(
            InteractionOutcome::Cleared(InteractionKind::Flag).message(),
            "Comment unflagged successfully."
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::OwnComment(InteractionKind::Like).to_string(),
            "User cannot like their own comment."
        );
        assert_eq!(
            Error::AlreadyInteracted(InteractionKind::Flag).to_string(),
            "User has already flagged this comment."
        );
        assert_eq!(
            Error::MissingInteraction(InteractionKind::Like).to_string(),
            "User has not liked this comment."
        );
        assert_eq!(
            Error::MissingInteraction(InteractionKind::Flag).to_string(),
            "User has not flagged this comment before"
        );
    }
}
