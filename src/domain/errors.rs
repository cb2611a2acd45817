use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Order not found")]
    NotFound,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Order already {status}")]
    AlreadyResolved { status: OrderStatus },
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
