// service/error.rs
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::ordermodel::OrderStatus,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Escrow {0} not found")]
    EscrowNotFound(Uuid),

    #[error("Withdrawal request {0} not found")]
    WithdrawalNotFound(Uuid),

    #[error("Record already processed: {0}")]
    AlreadyProcessed(String),

    #[error("User {0} is not authorized to perform this action")]
    Unauthorized(Uuid),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Withdrawal amount below minimum of {minimum} cents")]
    BelowMinimum { minimum: i64 },

    #[error("Order {0} cannot move from {1:?} to {2:?}")]
    InvalidOrderTransition(Uuid, OrderStatus, OrderStatus),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::OrderNotFound(_)
            | ServiceError::EscrowNotFound(_)
            | ServiceError::WithdrawalNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::AlreadyProcessed(_) => HttpError::conflict(error.to_string()),

            ServiceError::InvalidOrderTransition(_, _, _)
            | ServiceError::BelowMinimum { .. }
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::Unauthorized(_) => HttpError::forbidden(error.to_string()),

            ServiceError::InsufficientBalance { .. } => {
                HttpError::payment_required(error.to_string())
            }

            _ => HttpError::server_error(error.to_string()),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::OrderNotFound(_)
            | ServiceError::EscrowNotFound(_)
            | ServiceError::WithdrawalNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::AlreadyProcessed(_) => StatusCode::CONFLICT,

            ServiceError::InvalidOrderTransition(_, _, _)
            | ServiceError::BelowMinimum { .. }
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Unauthorized(_) => StatusCode::FORBIDDEN,

            ServiceError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,

            ServiceError::Gateway(_)
            | ServiceError::Database(_)
            | ServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let order_id = Uuid::new_v4();

        assert_eq!(
            ServiceError::OrderNotFound(order_id).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::WithdrawalNotFound(order_id).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::AlreadyProcessed("escrow".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InsufficientBalance {
                required: 5_000,
                available: 100
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ServiceError::Unauthorized(order_id).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::BelowMinimum { minimum: 1_000 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_http_error_conversion_keeps_status() {
        let err: HttpError = ServiceError::AlreadyProcessed("escrow x".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: HttpError = ServiceError::Gateway("timeout".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
