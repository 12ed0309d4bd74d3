use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::{
    error::{Error, Result, conflict_on_unique, guard_version},
    rating,
};

/// Denormalized per book rating summary, maintained incrementally by the
/// review repository. Readers get it without touching review rows.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookAggregate {
    pub book_guid: String,
    pub book_rate: f64,
    pub book_rate_number: i64,
    pub narrator_rate: f64,
    pub narrator_rate_number: i64,
    pub overall_rate: f64,
    pub number_of_comments: i64,
    pub version: i64,
}

/// Ratings carried by one review, zero meaning "not rated".
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rates {
    pub book: f64,
    pub narrator: f64,
}

impl BookAggregate {
    pub(crate) fn new(book_guid: impl Into<String>) -> Self {
        BookAggregate {
            book_guid: book_guid.into(),
            book_rate: 0.0,
            book_rate_number: 0,
            narrator_rate: 0.0,
            narrator_rate_number: 0,
            overall_rate: 0.0,
            number_of_comments: 0,
            version: 1,
        }
    }

    /// Folds a newly added (or restored) review into the aggregate.
    pub(crate) fn add_review(&mut self, rates: Rates) {
        self.number_of_comments += 1;
        if rates.book > 0.0 {
            self.book_rate = rating::rate_added(self.book_rate, self.book_rate_number, rates.book);
            self.book_rate_number += 1;
        }
        if rates.narrator > 0.0 {
            self.narrator_rate = rating::rate_added(
                self.narrator_rate,
                self.narrator_rate_number,
                rates.narrator,
            );
            self.narrator_rate_number += 1;
        }
        self.refresh_overall();
    }

    /// Applies a rating change of one existing review.
    pub(crate) fn change_review(&mut self, old: Rates, new: Rates) {
        shift_rating(&mut self.book_rate, &mut self.book_rate_number, old.book, new.book);
        shift_rating(
            &mut self.narrator_rate,
            &mut self.narrator_rate_number,
            old.narrator,
            new.narrator,
        );
        self.refresh_overall();
    }

    /// Withdraws a deleted review from the aggregate.
    pub(crate) fn remove_review(&mut self, old: Rates) {
        drop_rating(&mut self.book_rate, &mut self.book_rate_number, old.book);
        drop_rating(
            &mut self.narrator_rate,
            &mut self.narrator_rate_number,
            old.narrator,
        );
        self.number_of_comments = (self.number_of_comments - 1).max(0);
        self.refresh_overall();
    }

    fn refresh_overall(&mut self) {
        self.overall_rate = rating::overall_rate(
            self.book_rate,
            self.narrator_rate,
            self.book_rate_number,
            self.narrator_rate_number,
        );
    }
}

fn shift_rating(rate: &mut f64, count: &mut i64, old: f64, new: f64) {
    if old > 0.0 && new > 0.0 {
        *rate = rating::rate_replaced(*rate, *count, old, new);
    } else if old == 0.0 && new > 0.0 {
        *rate = rating::rate_added(*rate, *count, new);
        *count += 1;
    } else if old > 0.0 && new == 0.0 && *count > 0 {
        *rate = rating::rate_removed(*rate, *count, old);
        *count = (*count - 1).max(0);
    }
}

fn drop_rating(rate: &mut f64, count: &mut i64, old: f64) {
    if old > 0.0 && *count > 0 {
        *rate = rating::rate_removed(*rate, *count, old);
        *count = (*count - 1).max(0);
    }
}

pub type BookAggregateRepository = BookAggregateRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct BookAggregateRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookAggregateRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn get(&self, book_guid: &str) -> Result<BookAggregate> {
        fetch(&self.executor, book_guid)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("Book {book_guid}")))
    }
}

pub(crate) async fn fetch<'c, E>(executor: E, book_guid: &str) -> Result<Option<BookAggregate>>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let record =
        sqlx::query_as::<_, BookAggregate>("SELECT * FROM book_aggregate WHERE book_guid = ?")
            .bind(book_guid)
            .fetch_optional(executor)
            .await?;
    Ok(record)
}

pub(crate) async fn insert<'c, E>(executor: E, record: &BookAggregate) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    sqlx::query(
        "INSERT INTO book_aggregate \
         (book_guid, book_rate, book_rate_number, narrator_rate, narrator_rate_number, \
          overall_rate, number_of_comments, version) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(&record.book_guid)
    .bind(record.book_rate)
    .bind(record.book_rate_number)
    .bind(record.narrator_rate)
    .bind(record.narrator_rate_number)
    .bind(record.overall_rate)
    .bind(record.number_of_comments)
    .execute(executor)
    .await
    .map_err(|e| conflict_on_unique(e, "book aggregate"))?;
    Ok(())
}

pub(crate) async fn update<'c, E>(executor: E, record: &BookAggregate) -> Result<()>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let result = sqlx::query(
        "UPDATE book_aggregate SET book_rate = ?, book_rate_number = ?, narrator_rate = ?, \
         narrator_rate_number = ?, overall_rate = ?, number_of_comments = ?, version = ? \
         WHERE book_guid = ? AND version = ?",
    )
    .bind(record.book_rate)
    .bind(record.book_rate_number)
    .bind(record.narrator_rate)
    .bind(record.narrator_rate_number)
    .bind(record.overall_rate)
    .bind(record.number_of_comments)
    .bind(record.version + 1)
    .bind(&record.book_guid)
    .bind(record.version)
    .execute(executor)
    .await?;
    guard_version(result, "book aggregate")
}
