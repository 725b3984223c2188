use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::APP_ID_VAR;

/// Everything that ends a lookup without a price list.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("Missing {} env var", APP_ID_VAR)]
    MissingCredential,
    #[error("Missing q")]
    MissingQuery,
    #[error("eBay HTTP {0}")]
    UpstreamStatus(u16),
    #[error("Upstream timeout")]
    UpstreamTimeout,
    #[error("{0}")]
    Transport(String),
}

impl LookupError {
    pub fn transport(err: &impl std::fmt::Display) -> Self {
        let msg = err.to_string();
        if msg.is_empty() {
            Self::Transport("Fetch error".to_string())
        } else {
            Self::Transport(msg)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingQuery => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTimeout | Self::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
