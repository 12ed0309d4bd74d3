use axum::{RequestPartsExt, extract::FromRequestParts};
use axum_extra::TypedHeader;
use bookrev_types::claim::ApiClaim;
use headers::{Authorization, authorization::Bearer};
use http::{StatusCode, request::Parts};
use tracing::{debug, error};

use crate::state::AppState;

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_token = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .ok()
            .map(|h| h.0.token().to_string());

        match header_token {
            Some(token) => {
                let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
                    error!("Failed to validate token: {}", e);
                    StatusCode::UNAUTHORIZED
                })?;
                Ok(claim)
            }
            None => {
                debug!("No token found");
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
