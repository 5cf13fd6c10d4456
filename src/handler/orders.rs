// handler/orders.rs
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
    dtos::{
        orderdtos::*,
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn orders_handler() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
        .route("/:order_id/start", post(start_order))
        .route("/:order_id/deliver", post(deliver_order))
        .route("/:order_id/complete", post(complete_order))
        .route("/:order_id/cancel", post(cancel_order))
        .route("/:order_id/dispute", post(dispute_order))
}

pub async fn list_orders(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<OrderListQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let orders = app_state
        .order_service
        .list_orders(
            auth.user.id,
            query.limit.unwrap_or(20),
            query.offset.unwrap_or(0),
        )
        .await
        .map_err(HttpError::from)?;

    let response: Vec<OrderResponseDto> = orders.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Orders retrieved", response)))
}

pub async fn get_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .get_order(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let escrow = app_state
        .escrow_service
        .get_by_order(order_id)
        .await
        .map_err(HttpError::from)?;

    let response = OrderDetailResponseDto {
        order: order.into(),
        escrow: escrow.map(Into::into),
    };

    Ok(Json(ApiResponse::success("Order retrieved", response)))
}

pub async fn start_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .start(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order started", response)))
}

pub async fn deliver_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .deliver(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order delivered", response)))
}

/// Buyer accepts the delivery. The held escrow is released to the seller as
/// part of the same operation.
pub async fn complete_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .complete(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success(
        "Order completed and funds released",
        response,
    )))
}

pub async fn cancel_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .cancel(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order cancelled", response)))
}

pub async fn dispute_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .dispute(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order disputed", response)))
}
