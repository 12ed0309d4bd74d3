use sqlx::Pool;

use crate::error::Result;

/// Read side of the ban list. The list itself is maintained by the
/// moderation backoffice, this service only consults it.
pub type ModerationRepository = ModerationRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ModerationRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ModerationRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Whether the user is currently banned. Unknown users are not banned.
    pub async fn is_banned(&self, user_guid: &str) -> Result<bool> {
        let banned: Option<bool> =
            sqlx::query_scalar("SELECT banned FROM banned_user WHERE user_guid = ?")
                .bind(user_guid)
                .fetch_optional(&self.executor)
                .await?;
        Ok(banned.unwrap_or(false))
    }
}
