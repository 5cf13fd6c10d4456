// handler/admin.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{userdb::UserExt, withdrawaldb::WithdrawalExt},
    dtos::{
        orderdtos::{OrderResponseDto, ResolveDisputeDto},
        walletdtos::{ProcessWithdrawalDto, WithdrawalHistoryQueryDto, WithdrawalResponseDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::error::ServiceError,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/withdrawals", get(list_withdrawals))
        .route("/withdrawals/:request_id/process", post(process_withdrawal))
        .route("/orders/:order_id/resolve-dispute", post(resolve_dispute))
}

pub async fn list_withdrawals(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<WithdrawalHistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let requests = app_state
        .withdrawal_service
        .list(
            None,
            query.status,
            query.limit.unwrap_or(20),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(HttpError::from)?;

    let response: Vec<WithdrawalResponseDto> = requests.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Withdrawals retrieved", response)))
}

/// Approve sends the payout through the gateway and completes the request;
/// reject restores the seller's balance. Either path on a non-pending request
/// answers 409.
pub async fn process_withdrawal(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<ProcessWithdrawalDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Resolved up front so the completion email can go out after the payout.
    let request = app_state
        .db_client
        .get_withdrawal_request(request_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::from(ServiceError::WithdrawalNotFound(request_id)))?;

    let seller_email = app_state
        .db_client
        .get_user(Some(request.user_id), None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .map(|user| user.email);

    let processed = app_state
        .withdrawal_service
        .process(request_id, body.approve, body.notes, seller_email.as_deref())
        .await
        .map_err(HttpError::from)?;

    let message = if body.approve {
        "Withdrawal processed"
    } else {
        "Withdrawal rejected"
    };

    let response: WithdrawalResponseDto = processed.into();
    Ok(Json(ApiResponse::success(message, response)))
}

pub async fn resolve_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ResolveDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let order = app_state
        .order_service
        .resolve_dispute(order_id, auth.user.id, body.favor_seller, body.reason)
        .await
        .map_err(HttpError::from)?;

    let message = if body.favor_seller {
        "Dispute resolved in seller's favor, funds released"
    } else {
        "Dispute resolved in buyer's favor, funds refunded"
    };

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success(message, response)))
}
