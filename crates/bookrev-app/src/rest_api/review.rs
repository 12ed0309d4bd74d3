use axum::{
    Json,
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
};
use axum_valid::Garde;
use bookrev_dal::interaction::{InteractionKind, InteractionRepository};
use bookrev_dal::moderation::ModerationRepository;
use bookrev_dal::review::{ReviewMutation, ReviewRepository};
use bookrev_types::ValidGuid;
use bookrev_types::claim::ApiClaim;
use garde::Validate;
use http::StatusCode;
use serde::Deserialize;

use crate::error::{ApiError, ApiMessage, ApiResult};
use crate::state::AppState;

crate::repository_from_request!(ReviewRepository);
crate::repository_from_request!(InteractionRepository);
crate::repository_from_request!(ModerationRepository);

/// Review mutation with the actor guid in the body, for callers without
/// a bearer token.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OpenReviewRequest {
    #[serde(flatten)]
    #[garde(dive)]
    pub mutation: ReviewMutation,
    #[garde(dive)]
    pub user_guid: Option<ValidGuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InteractionRequest {
    #[garde(dive)]
    pub comment_guid: ValidGuid,
    #[garde(length(min = 1, max = 32))]
    pub method: String,
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OpenInteractionRequest {
    #[serde(flatten)]
    #[garde(dive)]
    pub request: InteractionRequest,
    #[garde(dive)]
    pub user_guid: Option<ValidGuid>,
}

async fn check_not_banned(moderation: &ModerationRepository, user_guid: &str) -> ApiResult<()> {
    if moderation.is_banned(user_guid).await? {
        return Err(ApiError::BannedActor);
    }
    Ok(())
}

pub(crate) fn required_actor(user_guid: Option<ValidGuid>) -> ApiResult<String> {
    user_guid
        .map(String::from)
        .ok_or_else(|| ApiError::InvalidRequest("Missing required fields".to_string()))
}

fn invalid_method(kind: InteractionKind) -> ApiError {
    ApiError::InvalidRequest(format!(
        "Invalid method. Must be '{0}' or 'un{0}'.",
        kind.verb()
    ))
}

async fn toggle(
    interactions: &InteractionRepository,
    moderation: &ModerationRepository,
    user_guid: &str,
    request: InteractionRequest,
    kind: InteractionKind,
) -> ApiResult<ApiMessage> {
    check_not_banned(moderation, user_guid).await?;
    let direction = kind
        .parse_method(&request.method)
        .ok_or_else(|| invalid_method(kind))?;
    let outcome = interactions
        .toggle(request.comment_guid.as_ref(), user_guid, kind, direction)
        .await?;
    Ok(ApiMessage::ok(outcome.message()))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Review", operation_id = "submitReview",
    request_body = ReviewMutation,
    responses((status = StatusCode::OK, description = "Review mutation applied", body = ApiMessage))))]
pub async fn submit(
    repository: ReviewRepository,
    moderation: ModerationRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<ReviewMutation>>,
) -> ApiResult<impl IntoResponse> {
    check_not_banned(&moderation, &api_user.sub).await?;
    let outcome = repository.mutate(&api_user.sub, payload).await?;
    Ok((StatusCode::OK, Json(ApiMessage::ok(outcome.message()))))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Review", operation_id = "submitReviewOpen",
    request_body = OpenReviewRequest,
    responses((status = StatusCode::OK, description = "Review mutation applied", body = ApiMessage))))]
pub async fn submit_open(
    repository: ReviewRepository,
    moderation: ModerationRepository,
    Garde(Json(payload)): Garde<Json<OpenReviewRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_guid = required_actor(payload.user_guid)?;
    check_not_banned(&moderation, &user_guid).await?;
    let outcome = repository.mutate(&user_guid, payload.mutation).await?;
    Ok((StatusCode::OK, Json(ApiMessage::ok(outcome.message()))))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/like", tag = "Review", operation_id = "likeReview",
    request_body = InteractionRequest,
    responses((status = StatusCode::OK, description = "Like toggled", body = ApiMessage))))]
pub async fn like(
    interactions: InteractionRepository,
    moderation: ModerationRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<InteractionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let message = toggle(
        &interactions,
        &moderation,
        &api_user.sub,
        payload,
        InteractionKind::Like,
    )
    .await?;
    Ok((StatusCode::OK, Json(message)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/like", tag = "Review", operation_id = "likeReviewOpen",
    request_body = OpenInteractionRequest,
    responses((status = StatusCode::OK, description = "Like toggled", body = ApiMessage))))]
pub async fn like_open(
    interactions: InteractionRepository,
    moderation: ModerationRepository,
    Garde(Json(payload)): Garde<Json<OpenInteractionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_guid = required_actor(payload.user_guid)?;
    let message = toggle(
        &interactions,
        &moderation,
        &user_guid,
        payload.request,
        InteractionKind::Like,
    )
    .await?;
    Ok((StatusCode::OK, Json(message)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/flag", tag = "Review", operation_id = "flagReview",
    request_body = InteractionRequest,
    responses((status = StatusCode::OK, description = "Flag toggled", body = ApiMessage))))]
pub async fn flag(
    interactions: InteractionRepository,
    moderation: ModerationRepository,
    api_user: ApiClaim,
    Garde(Json(payload)): Garde<Json<InteractionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let message = toggle(
        &interactions,
        &moderation,
        &api_user.sub,
        payload,
        InteractionKind::Flag,
    )
    .await?;
    Ok((StatusCode::OK, Json(message)))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/flag", tag = "Review", operation_id = "flagReviewOpen",
    request_body = OpenInteractionRequest,
    responses((status = StatusCode::OK, description = "Flag toggled", body = ApiMessage))))]
pub async fn flag_open(
    interactions: InteractionRepository,
    moderation: ModerationRepository,
    Garde(Json(payload)): Garde<Json<OpenInteractionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user_guid = required_actor(payload.user_guid)?;
    let message = toggle(
        &interactions,
        &moderation,
        &user_guid,
        payload.request,
        InteractionKind::Flag,
    )
    .await?;
    Ok((StatusCode::OK, Json(message)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{comment_guid}", tag = "Review", operation_id = "getReview",
    responses((status = StatusCode::OK, description = "Active review record", body = bookrev_dal::review::ReviewRecord))))]
pub async fn get_one(
    Path(comment_guid): Path<String>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(&comment_guid).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(submit))
        .route("/like", post(like))
        .route("/flag", post(flag))
        .route("/{comment_guid}", get(get_one))
}

pub fn open_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(submit_open))
        .route("/like", post(like_open))
        .route("/flag", post(flag_open))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(paths(submit, like, flag, get_one))]
    struct ModuleDocs;

    ModuleDocs::openapi()
}

#[cfg(feature = "openapi")]
pub fn open_api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(paths(submit_open, like_open, flag_open))]
    struct ModuleDocs;

    ModuleDocs::openapi()
}
