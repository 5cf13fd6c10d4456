// handler/wallet.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::walletdb::WalletExt,
    dtos::{
        walletdtos::*,
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    utils::currency::units_to_cents,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/summary", get(get_wallet_summary))
        .route("/transactions", get(get_transaction_history))
        .route("/transaction/:reference", get(get_transaction_by_ref))
        .route("/withdraw", post(withdraw_funds))
        .route("/withdrawals", get(get_withdrawal_history))
}

/// Returns the caller's wallet, creating an empty one on first access.
pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let wallet = app_state
        .db_client
        .ensure_wallet(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: WalletResponseDto = wallet.into();
    Ok(Json(ApiResponse::success("Wallet retrieved", response)))
}

pub async fn get_wallet_summary(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .ensure_wallet(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let summary = app_state
        .db_client
        .get_wallet_summary(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: WalletSummaryDto = summary.into();
    Ok(Json(ApiResponse::success("Wallet summary retrieved", response)))
}

pub async fn get_transaction_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<TransactionHistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let transactions = app_state
        .db_client
        .get_wallet_transactions(
            auth.user.id,
            query.transaction_type,
            query.limit.unwrap_or(20),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<TransactionResponseDto> =
        transactions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Transactions retrieved", response)))
}

pub async fn get_transaction_by_ref(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let transaction = app_state
        .db_client
        .get_transaction_by_reference(&reference)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Transaction not found"))?;

    if transaction.user_id != auth.user.id {
        return Err(HttpError::forbidden(
            "You are not allowed to view this transaction",
        ));
    }

    let response: TransactionResponseDto = transaction.into();
    Ok(Json(ApiResponse::success("Transaction retrieved", response)))
}

pub async fn withdraw_funds(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<WithdrawalRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let request = app_state
        .withdrawal_service
        .request(
            auth.user.id,
            units_to_cents(body.amount),
            body.method,
            body.account_details,
        )
        .await
        .map_err(HttpError::from)?;

    let response: WithdrawalResponseDto = request.into();
    Ok(Json(ApiResponse::success(
        "Withdrawal request submitted",
        response,
    )))
}

pub async fn get_withdrawal_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<WithdrawalHistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let requests = app_state
        .withdrawal_service
        .list(
            Some(auth.user.id),
            query.status,
            query.limit.unwrap_or(20),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(HttpError::from)?;

    let response: Vec<WithdrawalResponseDto> = requests.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Withdrawals retrieved", response)))
}
