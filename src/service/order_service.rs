// service/order_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, escrowdb::EscrowExt, orderdb::OrderExt},
    models::ordermodel::{Order, OrderStatus},
    service::{
        error::ServiceError,
        escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Who may drive a given lifecycle action.
enum Actor {
    Buyer,
    Seller,
    Either,
}

#[derive(Debug, Clone)]
pub struct OrderService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl OrderService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
        }
    }

    pub async fn get_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        let order = self
            .db_client
            .get_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        if order.buyer_id != user_id && order.seller_id != user_id {
            return Err(ServiceError::Unauthorized(user_id));
        }

        Ok(order)
    }

    pub async fn list_orders(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .db_client
            .get_orders_for_user(user_id, limit, offset)
            .await?)
    }

    /// Seller accepts the order and starts work.
    pub async fn start(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        self.transition(order_id, user_id, OrderStatus::InProgress, Actor::Seller)
            .await
    }

    /// Seller marks the work delivered.
    pub async fn deliver(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        self.transition(order_id, user_id, OrderStatus::Delivered, Actor::Seller)
            .await
    }

    /// Buyer accepts the delivery; the held escrow is released to the seller.
    pub async fn complete(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        let order = self
            .transition(order_id, user_id, OrderStatus::Completed, Actor::Buyer)
            .await?;

        if let Some(escrow) = self.db_client.get_escrow_by_order_id(order_id).await? {
            // The auto-release job may beat the buyer to the escrow; the
            // seller has the funds either way, so the completion stands.
            tolerate_already_processed(
                self.escrow_service.release(escrow.id, user_id, false).await,
            )?;
        }

        Ok(order)
    }

    /// Either party can cancel a not-yet-delivered order. A paid order's
    /// escrow is refunded to the buyer.
    pub async fn cancel(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        let order = self
            .transition(order_id, user_id, OrderStatus::Cancelled, Actor::Either)
            .await?;

        if let Some(escrow) = self.db_client.get_escrow_by_order_id(order_id).await? {
            if !EscrowService::is_terminal(&escrow) {
                self.escrow_service
                    .refund(
                        escrow.id,
                        "Order cancelled".to_string(),
                        order.buyer_id,
                        false,
                    )
                    .await?;
            }
        }

        Ok(order)
    }

    pub async fn dispute(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        self.transition(order_id, user_id, OrderStatus::Disputed, Actor::Either)
            .await
    }

    /// Admin resolution of a disputed order: release pays the seller
    /// (order completes), refund pays the buyer back (order cancels).
    pub async fn resolve_dispute(
        &self,
        order_id: Uuid,
        admin_id: Uuid,
        favor_seller: bool,
        reason: String,
    ) -> Result<Order, ServiceError> {
        let order = self
            .db_client
            .get_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        if order.status != OrderStatus::Disputed {
            return Err(ServiceError::InvalidOrderTransition(
                order_id,
                order.status,
                if favor_seller {
                    OrderStatus::Completed
                } else {
                    OrderStatus::Cancelled
                },
            ));
        }

        let escrow = self
            .db_client
            .get_escrow_by_order_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        let target = if favor_seller {
            self.escrow_service.release(escrow.id, admin_id, true).await?;
            OrderStatus::Completed
        } else {
            self.escrow_service
                .refund(escrow.id, reason, admin_id, true)
                .await?;
            OrderStatus::Cancelled
        };

        let updated = self
            .db_client
            .update_order_status(order_id, OrderStatus::Disputed, target)
            .await?
            .ok_or_else(|| {
                ServiceError::AlreadyProcessed(format!("order {} already resolved", order_id))
            })?;

        let _ = self
            .notification_service
            .notify_order_status(updated.buyer_id, order_id, updated.status.to_str())
            .await;
        let _ = self
            .notification_service
            .notify_order_status(updated.seller_id, order_id, updated.status.to_str())
            .await;

        Ok(updated)
    }

    async fn transition(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        to: OrderStatus,
        actor: Actor,
    ) -> Result<Order, ServiceError> {
        let order = self
            .db_client
            .get_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        let authorized = match actor {
            Actor::Buyer => order.buyer_id == user_id,
            Actor::Seller => order.seller_id == user_id,
            Actor::Either => order.buyer_id == user_id || order.seller_id == user_id,
        };
        if !authorized {
            return Err(ServiceError::Unauthorized(user_id));
        }

        if !order.status.can_transition_to(&to) {
            return Err(ServiceError::InvalidOrderTransition(order_id, order.status, to));
        }

        // Guarded update: a concurrent transition away from the observed
        // status surfaces as AlreadyProcessed, not a double-apply.
        let updated = self
            .db_client
            .update_order_status(order_id, order.status, to)
            .await?
            .ok_or_else(|| {
                ServiceError::AlreadyProcessed(format!(
                    "order {} changed state concurrently",
                    order_id
                ))
            })?;

        let other_party = if updated.buyer_id == user_id {
            updated.seller_id
        } else {
            updated.buyer_id
        };
        let _ = self
            .notification_service
            .notify_order_status(other_party, order_id, updated.status.to_str())
            .await;

        Ok(updated)
    }
}

/// Collapses a lost race on a guarded transition into success: the other
/// attempt already applied the same outcome.
fn tolerate_already_processed<T>(result: Result<T, ServiceError>) -> Result<(), ServiceError> {
    match result {
        Ok(_) => Ok(()),
        Err(ServiceError::AlreadyProcessed(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_tolerates_concurrent_release() {
        assert!(tolerate_already_processed::<()>(Ok(())).is_ok());
        assert!(tolerate_already_processed::<()>(Err(ServiceError::AlreadyProcessed(
            "escrow is no longer held".to_string()
        )))
        .is_ok());
    }

    #[test]
    fn test_other_release_errors_still_propagate() {
        let result = tolerate_already_processed::<()>(Err(ServiceError::Validation(
            "bad amount".to_string(),
        )));
        assert!(result.is_err());
    }
}
