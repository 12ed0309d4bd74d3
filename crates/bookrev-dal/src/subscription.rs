use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::{
    Batch, ListingParams, MAX_LIMIT,
    error::{Error, Result},
};

/// Subscription payment waiting for manual approval. The photo with the
/// payment proof is uploaded separately, `photo_link` points to it.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Subscription {
    pub id: i64,
    pub user_guid: String,
    pub subscription_id: String,
    pub amount_paid: f64,
    pub payment_method: String,
    pub duration: String,
    pub account_sent_to: String,
    pub phone_number_sent_from: Option<String>,
    pub notes: Option<String>,
    pub photo_link: String,
    pub status: String,
    pub version: i64,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateSubscription {
    #[garde(length(min = 1, max = 255))]
    pub subscription_id: String,
    #[garde(range(min = 0.0))]
    pub amount_paid: f64,
    #[garde(length(min = 1, max = 64))]
    pub payment_method: String,
    #[garde(length(min = 1, max = 64))]
    pub duration: String,
    #[garde(length(min = 1, max = 255))]
    pub account_sent_to: String,
    #[garde(inner(length(max = 32)))]
    pub phone_number_sent_from: Option<String>,
    #[garde(inner(length(max = 2000)))]
    pub notes: Option<String>,
    #[garde(length(min = 1, max = 1023))]
    pub photo_link: String,
}

/// Request to carry a subscription over from the legacy platform.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MigrationRequest {
    pub id: i64,
    pub user_guid: String,
    pub subscription_id: String,
    pub country_code: String,
    pub end_date_of_subscription: String,
    pub photo_link: String,
    pub status: String,
    pub version: i64,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateMigrationRequest {
    #[garde(length(min = 1, max = 255))]
    pub subscription_id: String,
    #[garde(length(min = 1, max = 8))]
    pub country_code: String,
    #[garde(length(min = 1, max = 64))]
    pub end_date_of_subscription: String,
    #[garde(length(min = 1, max = 1023))]
    pub photo_link: String,
}

pub type SubscriptionRepository = SubscriptionRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct SubscriptionRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> SubscriptionRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, user_guid: &str, payload: CreateSubscription) -> Result<Subscription> {
        payload.validate()?;
        let result = sqlx::query(
            "INSERT INTO subscription_request \
             (user_guid, subscription_id, amount_paid, payment_method, duration, account_sent_to, \
              phone_number_sent_from, notes, photo_link, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(user_guid)
        .bind(&payload.subscription_id)
        .bind(payload.amount_paid)
        .bind(&payload.payment_method)
        .bind(&payload.duration)
        .bind(&payload.account_sent_to)
        .bind(&payload.phone_number_sent_from)
        .bind(&payload.notes)
        .bind(&payload.photo_link)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn create_migration(
        &self,
        user_guid: &str,
        payload: CreateMigrationRequest,
    ) -> Result<MigrationRequest> {
        payload.validate()?;
        let result = sqlx::query(
            "INSERT INTO migration_request \
             (user_guid, subscription_id, country_code, end_date_of_subscription, photo_link, version) \
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(user_guid)
        .bind(&payload.subscription_id)
        .bind(&payload.country_code)
        .bind(&payload.end_date_of_subscription)
        .bind(&payload.photo_link)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get_migration(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Subscription> {
        let record =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscription_request WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?;
        record.ok_or_else(|| Error::RecordNotFound(format!("Subscription {id}")))
    }

    pub async fn get_migration(&self, id: i64) -> Result<MigrationRequest> {
        let record =
            sqlx::query_as::<_, MigrationRequest>("SELECT * FROM migration_request WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?;
        record.ok_or_else(|| Error::RecordNotFound(format!("Migration request {id}")))
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<Subscription>> {
        let ordering = params.ordering(&["id", "created", "amount_paid", "status"])?;
        let order_clause = if ordering.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {ordering} ")
        };
        let sql = format!("SELECT * FROM subscription_request {order_clause}LIMIT ? OFFSET ?");
        let records = sqlx::query_as::<_, Subscription>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM subscription_request")
            .fetch_one(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows: records,
        })
    }

    pub async fn list_migrations(&self, params: ListingParams) -> Result<Batch<MigrationRequest>> {
        let ordering = params.ordering(&["id", "created", "status"])?;
        let order_clause = if ordering.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {ordering} ")
        };
        let sql = format!("SELECT * FROM migration_request {order_clause}LIMIT ? OFFSET ?");
        let records = sqlx::query_as::<_, MigrationRequest>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM migration_request")
            .fetch_one(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows: records,
        })
    }
}
