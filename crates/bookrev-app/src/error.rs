use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;

pub type Error = ApiError;
pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("The user is banned")]
    BannedActor,

    #[error(transparent)]
    Dal(#[from] bookrev_dal::Error),
}

impl ApiError {
    /// Numeric code carried in the response body. Interaction failures keep
    /// the legacy codes established clients switch on.
    pub fn code(&self) -> u16 {
        use bookrev_dal::Error as DalError;
        match self {
            ApiError::InvalidRequest(_) | ApiError::InvalidQuery(_) => 400,
            ApiError::BannedActor => 507,
            ApiError::Dal(e) => match e {
                DalError::ValidationError(_)
                | DalError::InvalidMethod(_)
                | DalError::InvalidOrderByField(_) => 400,
                DalError::UnknownComment => 508,
                DalError::OwnComment(_) => 509,
                DalError::AlreadyInteracted(_) => 510,
                DalError::MissingInteraction(_) => 511,
                DalError::UnknownBook | DalError::UnknownReview | DalError::RecordNotFound(_) => {
                    404
                }
                DalError::DuplicateReview | DalError::DeletedReview => 409,
                DalError::WriteConflict(_) => 503,
                DalError::DatabaseError(_) | DalError::MalformedLedger(_) => 500,
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            // legacy behavior, the banned code travels in the body only
            ApiError::BannedActor => StatusCode::BAD_REQUEST,
            _ => StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed with server error: {self}");
        }
        let body = ApiMessage {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Stable `{code, message}` body shared by successes and failures.
#[derive(Debug, Serialize, serde::Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiMessage {
    pub code: u16,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        ApiMessage {
            code: 200,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrev_dal::interaction::InteractionKind;

    #[test]
    fn test_banned_actor_mapping() {
        let error = ApiError::BannedActor;
        assert_eq!(error.code(), 507);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "The user is banned");
    }

    #[test]
    fn test_interaction_codes_travel_as_status() {
        let cases = [
            (ApiError::from(bookrev_dal::Error::UnknownComment), 508),
            (
                ApiError::from(bookrev_dal::Error::OwnComment(InteractionKind::Like)),
                509,
            ),
            (
                ApiError::from(bookrev_dal::Error::AlreadyInteracted(InteractionKind::Flag)),
                510,
            ),
            (
                ApiError::from(bookrev_dal::Error::MissingInteraction(InteractionKind::Like)),
                511,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.code(), code);
            assert_eq!(error.status().as_u16(), code);
        }
    }

    #[test]
    fn test_review_domain_mapping() {
        assert_eq!(ApiError::from(bookrev_dal::Error::UnknownBook).code(), 404);
        assert_eq!(
            ApiError::from(bookrev_dal::Error::DuplicateReview).code(),
            409
        );
        assert_eq!(
            ApiError::from(bookrev_dal::Error::DeletedReview).code(),
            409
        );
        assert_eq!(
            ApiError::from(bookrev_dal::Error::WriteConflict("review")).code(),
            503
        );
    }
}
