use std::str::FromStr;

use bookrev_types::ValidGuid;
use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, Pool};
use tracing::{debug, warn};

use crate::{
    Batch, ListingParams, MAX_LIMIT, MAX_TX_RETRIES,
    book::{self, BookAggregate, Rates},
    error::{Error, Result, conflict_on_unique, guard_version},
};

/// Key of the review record, one review per user and book.
pub fn comment_guid(book_guid: &str, user_guid: &str) -> String {
    format!("{book_guid}_{user_guid}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMethod {
    Put,
    Update,
    Delete,
}

impl FromStr for ReviewMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "put" => Ok(ReviewMethod::Put),
            "update" => Ok(ReviewMethod::Update),
            "delete" => Ok(ReviewMethod::Delete),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewRecord {
    pub comment_guid: String,
    pub book_guid: String,
    pub user_guid: String,
    pub comment: String,
    pub book_rate: f64,
    pub narrator_rate: f64,
    pub num_of_likes: i64,
    pub num_of_flags: i64,
    pub is_there_comment: bool,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub version: i64,
    pub created: time::PrimitiveDateTime,
    pub modified: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewMutation {
    #[garde(dive)]
    pub book_guid: ValidGuid,
    #[garde(custom(known_method))]
    pub method: String,
    #[garde(length(max = 2000))]
    pub comment: String,
    #[garde(range(min = 0.0, max = 5.0))]
    #[serde(default)]
    pub book_rate: f64,
    #[garde(range(min = 0.0, max = 5.0))]
    #[serde(default)]
    pub narrator_rate: f64,
}

fn known_method(value: &str, _context: &()) -> garde::Result {
    value
        .parse::<ReviewMethod>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("Invalid method. Allowed values: update, put, delete"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Added,
    Restored,
    Updated,
    Deleted,
    AlreadyDeleted,
}

impl ReviewOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ReviewOutcome::Added => "Comment added successfully.",
            ReviewOutcome::Restored => "Comment restored successfully.",
            ReviewOutcome::Updated => "Comment updated successfully.",
            ReviewOutcome::Deleted => "Comment deleted successfully.",
            ReviewOutcome::AlreadyDeleted => "Comment is already deleted.",
        }
    }
}

pub type ReviewRepository = ReviewRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>
        + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Active review by its combined guid. Soft deleted reviews are not
    /// visible here.
    pub async fn get(&self, comment_guid: &str) -> Result<ReviewRecord> {
        fetch_by_guid(&self.executor, comment_guid)
            .await?
            .filter(|record| !record.is_deleted)
            .ok_or(Error::UnknownComment)
    }

    pub async fn list_for_book(
        &self,
        params: ListingParams,
        book_guid: &str,
    ) -> Result<Batch<ReviewRecord>> {
        let ordering = params.ordering(&[
            "created",
            "modified",
            "num_of_likes",
            "book_rate",
            "narrator_rate",
        ])?;
        let order_clause = if ordering.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {ordering} ")
        };
        let sql = format!(
            "SELECT * FROM review WHERE book_guid = ? AND is_deleted = 0 {order_clause}LIMIT ? OFFSET ?"
        );
        let records = sqlx::query_as::<_, ReviewRecord>(&sql)
            .bind(book_guid)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: u64 =
            sqlx::query_scalar("SELECT count(*) FROM review WHERE book_guid = ? AND is_deleted = 0")
                .bind(book_guid)
                .fetch_one(&self.executor)
                .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows: records,
        })
    }

    /// Applies one review mutation (put, update or delete) and maintains
    /// the book aggregate in the same transaction. Write conflicts with
    /// concurrent mutations are retried a few times before giving up.
    pub async fn mutate(&self, user_guid: &str, payload: ReviewMutation) -> Result<ReviewOutcome> {
        payload.validate()?;
        let method: ReviewMethod = payload.method.parse().map_err(Error::InvalidMethod)?;

        let mut attempt = 1;
        loop {
            match self.mutate_once(user_guid, &payload, method).await {
                Err(e) if e.is_conflict() && attempt < MAX_TX_RETRIES => {
                    warn!("Review write conflict on attempt {attempt}, retrying: {e}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn mutate_once(
        &self,
        user_guid: &str,
        payload: &ReviewMutation,
        method: ReviewMethod,
    ) -> Result<ReviewOutcome> {
        let book_guid = payload.book_guid.as_ref();
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;

        let (mut book, book_exists) = match book::fetch(&mut *transaction, book_guid).await? {
            Some(record) => (record, true),
            None if method == ReviewMethod::Put => (BookAggregate::new(book_guid), false),
            None => return Err(Error::UnknownBook),
        };

        let existing = fetch_by_key(&mut *transaction, book_guid, user_guid).await?;

        let new_rates = Rates {
            book: payload.book_rate,
            narrator: payload.narrator_rate,
        };

        let outcome = match method {
            ReviewMethod::Put => {
                let outcome = match existing {
                    Some(record) if !record.is_deleted => return Err(Error::DuplicateReview),
                    Some(record) => {
                        // restore of a soft deleted review, likes and
                        // flags collected before the deletion survive
                        let edited = record.comment.trim() != payload.comment.trim();
                        update_content(&mut *transaction, &record, payload, edited).await?;
                        ReviewOutcome::Restored
                    }
                    None => {
                        insert(&mut *transaction, payload, user_guid).await?;
                        ReviewOutcome::Added
                    }
                };
                book.add_review(new_rates);
                outcome
            }
            ReviewMethod::Update => {
                let Some(record) = existing else {
                    return Err(Error::UnknownReview);
                };
                if record.is_deleted {
                    return Err(Error::DeletedReview);
                }
                let edited = record.is_edited || record.comment.trim() != payload.comment.trim();
                book.change_review(
                    Rates {
                        book: record.book_rate,
                        narrator: record.narrator_rate,
                    },
                    new_rates,
                );
                update_content(&mut *transaction, &record, payload, edited).await?;
                ReviewOutcome::Updated
            }
            ReviewMethod::Delete => {
                let Some(record) = existing else {
                    return Err(Error::UnknownReview);
                };
                if record.is_deleted {
                    return Ok(ReviewOutcome::AlreadyDeleted);
                }
                book.remove_review(Rates {
                    book: record.book_rate,
                    narrator: record.narrator_rate,
                });
                soft_delete(&mut *transaction, &record).await?;
                ReviewOutcome::Deleted
            }
        };

        if book_exists {
            book::update(&mut *transaction, &book).await?;
        } else {
            book::insert(&mut *transaction, &book).await?;
        }

        transaction.commit().await?;
        debug!("Review of user {user_guid} for book {book_guid}: {outcome:?}");
        Ok(outcome)
    }
}

pub(crate) async fn fetch_by_guid<'c, E>(
    executor: E,
    comment_guid: &str,
) -> Result<Option<ReviewRecord>>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let record = sqlx::query_as::<_, ReviewRecord>("SELECT * FROM review WHERE comment_guid = ?")
        .bind(comment_guid)
        .fetch_optional(executor)
        .await?;
    Ok(record)
}

async fn fetch_by_key<'c, E>(
    executor: E,
    book_guid: &str,
    user_guid: &str,
) -> Result<Option<ReviewRecord>>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let record =
        sqlx::query_as::<_, ReviewRecord>("SELECT * FROM review WHERE book_guid = ? AND user_guid = ?")
            .bind(book_guid)
            .bind(user_guid)
            .fetch_optional(executor)
            .await?;
    Ok(record)
}

async fn insert<'c, E>(executor: E, payload: &ReviewMutation, user_guid: &str) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let book_guid = payload.book_guid.as_ref();
    sqlx::query(
        "INSERT INTO review \
         (comment_guid, book_guid, user_guid, comment, book_rate, narrator_rate, is_there_comment, version) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(comment_guid(book_guid, user_guid))
    .bind(book_guid)
    .bind(user_guid)
    .bind(&payload.comment)
    .bind(payload.book_rate)
    .bind(payload.narrator_rate)
    .bind(!payload.comment.trim().is_empty())
    .execute(executor)
    .await
    .map_err(|e| conflict_on_unique(e, "review"))?;
    Ok(())
}

/// Rewrites review content with a version guard. Used both for updates
/// and for restores, counters are left untouched.
async fn update_content<'c, E>(
    executor: E,
    record: &ReviewRecord,
    payload: &ReviewMutation,
    edited: bool,
) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let result = sqlx::query(
        "UPDATE review SET comment = ?, book_rate = ?, narrator_rate = ?, is_there_comment = ?, \
         is_deleted = 0, is_edited = ?, modified = datetime('now'), version = ? \
         WHERE comment_guid = ? AND version = ?",
    )
    .bind(&payload.comment)
    .bind(payload.book_rate)
    .bind(payload.narrator_rate)
    .bind(!payload.comment.trim().is_empty())
    .bind(edited)
    .bind(record.version + 1)
    .bind(&record.comment_guid)
    .bind(record.version)
    .execute(executor)
    .await?;
    guard_version(result, "review")
}

async fn soft_delete<'c, E>(executor: E, record: &ReviewRecord) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let result = sqlx::query(
        "UPDATE review SET is_deleted = 1, modified = datetime('now'), version = ? \
         WHERE comment_guid = ? AND version = ?",
    )
    .bind(record.version + 1)
    .bind(&record.comment_guid)
    .bind(record.version)
    .execute(executor)
    .await?;
    guard_version(result, "review")
}
