use actix_web::{http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::application::offer_service::PlaceOrderError;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderDraft;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing or empty X-User-Id header")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Service unavailable")]
    Unavailable { draft: Option<Box<OrderDraft>> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::NotFound => AppError::NotFound,
            DomainError::PermissionDenied => AppError::Forbidden,
            e @ DomainError::AlreadyResolved { .. } => AppError::Conflict(e.to_string()),
            DomainError::StoreUnavailable(msg) => {
                log::error!("store unavailable: {}", msg);
                AppError::Unavailable { draft: None }
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PlaceOrderError> for AppError {
    fn from(e: PlaceOrderError) -> Self {
        match (AppError::from(e.source), e.draft) {
            (AppError::Unavailable { .. }, Some(draft)) => AppError::Unavailable {
                draft: Some(Box::new(draft)),
            },
            (err, _) => err,
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Unavailable { draft: Some(draft) } => serde_json::json!({
                "error": self.to_string(),
                "draft": draft,
            }),
            AppError::Internal(msg) => {
                log::error!("internal error: {}", msg);
                serde_json::json!({ "error": "Internal server error" })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
