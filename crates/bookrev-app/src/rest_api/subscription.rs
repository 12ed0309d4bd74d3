use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
    routing::post,
};
use axum_valid::Garde;
use bookrev_dal::subscription::{
    CreateMigrationRequest, CreateSubscription, SubscriptionRepository,
};
use bookrev_types::ValidGuid;
use bookrev_types::claim::ApiClaim;
use garde::Validate;
use http::StatusCode;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::rest_api::review::required_actor;
use crate::rest_api::{Page, Paging};
use crate::state::AppState;

crate::repository_from_request!(SubscriptionRepository);

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OpenSubscriptionRequest {
    #[serde(flatten)]
    #[garde(dive)]
    pub payload: CreateSubscription,
    #[garde(dive)]
    pub user_guid: Option<ValidGuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OpenMigrationRequest {
    #[serde(flatten)]
    #[garde(dive)]
    pub payload: CreateMigrationRequest,
    #[garde(dive)]
    pub user_guid: Option<ValidGuid>,
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Subscription", operation_id = "createSubscription",
    request_body = CreateSubscription,
    responses((status = StatusCode::CREATED, description = "Stored subscription request", body = bookrev_dal::subscription::Subscription))))]
pub async fn create(
    repository: SubscriptionRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateSubscription>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(&api_user.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Subscription", operation_id = "createSubscriptionOpen",
    request_body = OpenSubscriptionRequest,
    responses((status = StatusCode::CREATED, description = "Stored subscription request", body = bookrev_dal::subscription::Subscription))))]
pub async fn create_open(
    repository: SubscriptionRepository,
    Garde(Json(payload)): Garde<Json<OpenSubscriptionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_guid = required_actor(payload.user_guid)?;
    let record = repository.create(&user_guid, payload.payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/migration", tag = "Subscription", operation_id = "createSubscriptionMigration",
    request_body = CreateMigrationRequest,
    responses((status = StatusCode::CREATED, description = "Stored migration restore request", body = bookrev_dal::subscription::MigrationRequest))))]
pub async fn create_migration(
    repository: SubscriptionRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<CreateMigrationRequest>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create_migration(&api_user.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/migration", tag = "Subscription", operation_id = "createSubscriptionMigrationOpen",
    request_body = OpenMigrationRequest,
    responses((status = StatusCode::CREATED, description = "Stored migration restore request", body = bookrev_dal::subscription::MigrationRequest))))]
pub async fn create_migration_open(
    repository: SubscriptionRepository,
    Garde(Json(payload)): Garde<Json<OpenMigrationRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_guid = required_actor(payload.user_guid)?;
    let record = repository
        .create_migration(&user_guid, payload.payload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Subscription", operation_id = "listSubscription",
    params(Paging),
    responses((status = StatusCode::OK, description = "Pending subscription requests, paginated", body = crate::rest_api::Page<bookrev_dal::subscription::Subscription>))))]
pub async fn list(
    repository: SubscriptionRepository,
    State(state): State<AppState>,
    _api_user: ApiClaim,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size: u32 = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/migration", tag = "Subscription", operation_id = "listSubscriptionMigration",
    params(Paging),
    responses((status = StatusCode::OK, description = "Pending migration restore requests, paginated", body = crate::rest_api::Page<bookrev_dal::subscription::MigrationRequest>))))]
pub async fn list_migrations(
    repository: SubscriptionRepository,
    State(state): State<AppState>,
    _api_user: ApiClaim,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size: u32 = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list_migrations(listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create).get(list))
        .route("/migration", post(create_migration).get(list_migrations))
}

pub fn open_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(create_open))
        .route("/migration", post(create_migration_open))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(paths(create, create_migration, list, list_migrations))]
    struct ModuleDocs;

    ModuleDocs::openapi()
}

#[cfg(feature = "openapi")]
pub fn open_api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(paths(create_open, create_migration_open))]
    struct ModuleDocs;

    ModuleDocs::openapi()
}
