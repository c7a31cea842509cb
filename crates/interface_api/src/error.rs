//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_billing::BillingError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// HTTP status for a billing failure
pub fn billing_status(err: &BillingError) -> StatusCode {
    match err {
        BillingError::MissingCustomer | BillingError::EmptyBill | BillingError::InvalidBill(_) => {
            StatusCode::BAD_REQUEST
        }
        BillingError::InvalidQuantity { .. }
        | BillingError::InvalidDiscount { .. }
        | BillingError::InvalidCreditAmount { .. }
        | BillingError::ProductNotReturnable(_)
        | BillingError::NotASale(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BillingError::CustomerNotFound(_)
        | BillingError::ProductNotFound(_)
        | BillingError::BillNotFound(_) => StatusCode::NOT_FOUND,
        BillingError::InsufficientStock { .. }
        | BillingError::AlreadyFullyReturned(_)
        | BillingError::NothingLeftToReturn(_)
        | BillingError::ExceedsRemainingQuantity { .. }
        | BillingError::CreditLedgerShortfall { .. } => StatusCode::CONFLICT,
        BillingError::DataInconsistency(_) | BillingError::Calculation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        BillingError::Store(port) => match port {
            PortError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortError::Conflict { .. } => StatusCode::CONFLICT,
            PortError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PortError::Connection { .. } | PortError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PortError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(permission) => ApiError::Forbidden(permission),
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            ApiError::Validation(errors) => {
                let details = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| match &e.message {
                            Some(msg) => format!("{field}: {msg}"),
                            None => format!("{field}: {}", e.code),
                        })
                    })
                    .collect::<Vec<_>>();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    "Request validation failed".to_string(),
                    Some(details),
                )
            }
            ApiError::Billing(err) => (billing_status(err), err.code(), err.to_string(), None),
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ProductId;

    #[test]
    fn test_billing_status_mapping() {
        assert_eq!(billing_status(&BillingError::MissingCustomer), StatusCode::BAD_REQUEST);
        assert_eq!(
            billing_status(&BillingError::BillNotFound("X".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            billing_status(&BillingError::ExceedsRemainingQuantity {
                product_id: ProductId::new(),
                requested: 3,
                remaining: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            billing_status(&BillingError::DataInconsistency("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            billing_status(&BillingError::Store(PortError::conflict("dup"))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_billing_error_uses_domain_code() {
        let response = ApiError::from(BillingError::EmptyBill).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
