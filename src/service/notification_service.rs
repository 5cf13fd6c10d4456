// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::walletmodels::{Escrow, WithdrawalRequest},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn notify_order_created(
        &self,
        seller_id: Uuid,
        order_id: Uuid,
        amount: i64,
    ) -> Result<(), ServiceError> {
        tracing::info!("New order notification: order {} for seller {}", order_id, seller_id);

        self.store_notification(
            Some(seller_id),
            "order_created".to_string(),
            Some(order_id),
            Some(serde_json::json!({ "amount": amount })),
            "You have a new order".to_string(),
        )
        .await
    }

    pub async fn notify_escrow_released(
        &self,
        escrow: &Escrow,
        net_amount: i64,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Escrow release notification: escrow {} for seller {}",
            escrow.id,
            escrow.seller_id
        );

        self.store_notification(
            Some(escrow.seller_id),
            "escrow_released".to_string(),
            Some(escrow.order_id),
            Some(serde_json::json!({
                "escrow_id": escrow.id,
                "net_amount": net_amount,
            })),
            "Funds for your order have been released to your balance".to_string(),
        )
        .await
    }

    pub async fn notify_escrow_refunded(&self, escrow: &Escrow) -> Result<(), ServiceError> {
        tracing::info!(
            "Escrow refund notification: escrow {} for buyer {}",
            escrow.id,
            escrow.buyer_id
        );

        self.store_notification(
            Some(escrow.buyer_id),
            "escrow_refunded".to_string(),
            Some(escrow.order_id),
            Some(serde_json::json!({ "escrow_id": escrow.id, "amount": escrow.amount })),
            "Your order payment has been refunded".to_string(),
        )
        .await?;

        self.store_notification(
            Some(escrow.seller_id),
            "escrow_refunded".to_string(),
            Some(escrow.order_id),
            Some(serde_json::json!({ "escrow_id": escrow.id, "amount": escrow.amount })),
            "An order's escrow has been refunded to the buyer".to_string(),
        )
        .await
    }

    pub async fn notify_order_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        status: &str,
    ) -> Result<(), ServiceError> {
        self.store_notification(
            Some(user_id),
            format!("order_{}", status),
            Some(order_id),
            None,
            format!("Order status changed to {}", status),
        )
        .await
    }

    pub async fn notify_withdrawal_update(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Withdrawal notification: request {} is now {:?}",
            request.id,
            request.status
        );

        self.store_notification(
            Some(request.user_id),
            "withdrawal_update".to_string(),
            None,
            Some(serde_json::json!({
                "withdrawal_request_id": request.id,
                "status": request.status,
                "net_amount": request.net_amount,
            })),
            format!("Withdrawal {} update", request.reference),
        )
        .await
    }

    /// Broadcast to admins (user_id NULL rows are picked up by the admin feed).
    pub async fn notify_admins(&self, message: String) -> Result<(), ServiceError> {
        self.store_notification(None, "admin_alert".to_string(), None, None, message)
            .await
    }

    async fn store_notification(
        &self,
        user_id: Option<Uuid>,
        kind: String,
        order_id: Option<Uuid>,
        payload: Option<serde_json::Value>,
        message: String,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, order_id, payload, message)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(order_id)
        .bind(payload)
        .bind(message)
        .execute(&self.db_client.pool)
        .await
        .map_err(|e| ServiceError::Notification(e.to_string()))?;

        Ok(())
    }
}
