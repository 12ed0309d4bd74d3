use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_valid::Garde;
use bookrev_dal::book::BookAggregateRepository;
use bookrev_dal::review::ReviewRepository;
use http::StatusCode;

use crate::error::ApiResult;
use crate::rest_api::{Page, Paging};
use crate::state::AppState;

crate::repository_from_request!(BookAggregateRepository);

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{book_guid}", tag = "Book", operation_id = "getBookAggregate",
    responses((status = StatusCode::OK, description = "Book rating aggregate", body = bookrev_dal::book::BookAggregate))))]
pub async fn get_aggregate(
    Path(book_guid): Path<String>,
    repository: BookAggregateRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(&book_guid).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{book_guid}/reviews", tag = "Book", operation_id = "listBookReviews",
    params(Paging),
    responses((status = StatusCode::OK, description = "Active reviews of the book, paginated", body = crate::rest_api::Page<bookrev_dal::review::ReviewRecord>))))]
pub async fn list_reviews(
    Path(book_guid): Path<String>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size: u32 = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list_for_book(listing_params, &book_guid).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/{book_guid}", get(get_aggregate))
        .route("/{book_guid}/reviews", get(list_reviews))
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(paths(get_aggregate, list_reviews))]
    struct ModuleDocs;

    ModuleDocs::openapi()
}
