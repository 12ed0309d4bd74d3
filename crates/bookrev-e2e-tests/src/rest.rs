use anyhow::Result;
use bookrev_app::error::ApiMessage;
use bookrev_dal::book::BookAggregate;
use bookrev_dal::review::ReviewRecord;
use reqwest::{Client, Url};
use serde_json::json;
use tracing::info;

use crate::extend_url;

pub fn review_payload(
    book_guid: &str,
    method: &str,
    comment: &str,
    book_rate: f64,
    narrator_rate: f64,
) -> serde_json::Value {
    json!({
        "book_guid": book_guid,
        "method": method,
        "comment": comment,
        "book_rate": book_rate,
        "narrator_rate": narrator_rate,
    })
}

pub fn interaction_payload(comment_guid: &str, method: &str) -> serde_json::Value {
    json!({
        "comment_guid": comment_guid,
        "method": method,
    })
}

/// Adds the actor guid for the open (noauth) endpoint variants.
pub fn with_user(mut payload: serde_json::Value, user_guid: &str) -> serde_json::Value {
    payload["user_guid"] = json!(user_guid);
    payload
}

pub async fn submit_review(
    client: &Client,
    base_url: &Url,
    payload: &serde_json::Value,
) -> Result<ApiMessage> {
    let api_url = base_url.join("api/review")?;
    let response = client.post(api_url).json(payload).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    Ok(response.json().await?)
}

pub async fn submit_review_open(
    client: &Client,
    base_url: &Url,
    payload: &serde_json::Value,
) -> Result<ApiMessage> {
    let api_url = base_url.join("api/noauth/review")?;
    let response = client.post(api_url).json(payload).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    Ok(response.json().await?)
}

pub async fn get_book(client: &Client, base_url: &Url, book_guid: &str) -> Result<BookAggregate> {
    let api_url = base_url.join("api/book")?;
    let response = client.get(extend_url(&api_url, book_guid)).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    Ok(response.json().await?)
}

pub async fn get_review(
    client: &Client,
    base_url: &Url,
    comment_guid: &str,
) -> Result<ReviewRecord> {
    let api_url = base_url.join("api/review")?;
    let response = client
        .get(extend_url(&api_url, comment_guid))
        .send()
        .await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    Ok(response.json().await?)
}
