// service/escrow_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        escrowdb::EscrowExt,
        orderdb::{CheckoutOrder, OrderExt},
        userdb::UserExt,
    },
    mail::mails,
    models::{
        ordermodel::{Order, OrderStatus, PaymentStatus},
        walletmodels::{Escrow, EscrowStatus, WalletTransaction},
    },
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        payment_provider::PaymentProviderService,
    },
    utils::currency::percentage_fee,
};

/// Moves a confirmed payment from "buyer paid" to exactly one of
/// {seller balance, buyer refund}. All fund movement is delegated to the
/// database layer, which serializes concurrent attempts; this service adds
/// precondition checks, authorization, and the post-commit gateway calls.
#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
    payment_provider: Arc<PaymentProviderService>,
    platform_fee_percent: f64,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        notification_service: Arc<NotificationService>,
        payment_provider: Arc<PaymentProviderService>,
        platform_fee_percent: f64,
    ) -> Self {
        Self {
            db_client,
            notification_service,
            payment_provider,
            platform_fee_percent,
        }
    }

    /// Turn a confirmed checkout into an order with held funds. The event
    /// dedup row, the order, and the escrow hold commit together, so a
    /// failure rolls all three back and the gateway's retry is a clean first
    /// delivery. Ok(None) means the event id was already processed.
    pub async fn ingest_checkout(
        &self,
        gateway: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        checkout: CheckoutOrder,
    ) -> Result<Option<(Order, Escrow)>, ServiceError> {
        if checkout.total_amount <= 0 {
            return Err(ServiceError::Validation(
                "Escrow amount must be positive".to_string(),
            ));
        }

        let ingested = self
            .db_client
            .ingest_checkout_completed(
                gateway,
                event_id,
                event_type,
                payload,
                checkout,
                self.platform_fee_percent,
            )
            .await
            .map_err(|e| map_unique_violation(e, event_id))?;

        let (order, escrow) = match ingested {
            Some(pair) => pair,
            None => return Ok(None),
        };

        tracing::info!(
            "Escrow {} held: order {}, amount {} cents",
            escrow.id,
            order.id,
            escrow.amount
        );

        let _ = self
            .notification_service
            .notify_order_created(escrow.seller_id, order.id, escrow.amount)
            .await;

        Ok(Some((order, escrow)))
    }

    /// Release held funds to the seller. Only the order's buyer (or an admin)
    /// may release.
    pub async fn release(
        &self,
        escrow_id: Uuid,
        released_by: Uuid,
        is_admin: bool,
    ) -> Result<(Escrow, WalletTransaction), ServiceError> {
        let escrow = self
            .db_client
            .get_escrow_by_id(escrow_id)
            .await?
            .ok_or(ServiceError::EscrowNotFound(escrow_id))?;

        if !is_admin && released_by != escrow.buyer_id {
            return Err(ServiceError::Unauthorized(released_by));
        }

        self.release_inner(escrow, released_by, None).await
    }

    /// Release on the buyer's behalf after the grace period elapsed. Also
    /// moves the order out of delivered, the same step a buyer's acceptance
    /// would have taken.
    pub async fn auto_release(&self, escrow: Escrow) -> Result<(), ServiceError> {
        let buyer_id = escrow.buyer_id;
        let order_id = escrow.order_id;
        self.release_inner(
            escrow,
            buyer_id,
            Some("Auto-release after grace period".to_string()),
        )
        .await?;

        let completed = self
            .db_client
            .update_order_status(order_id, OrderStatus::Delivered, OrderStatus::Completed)
            .await?;
        if completed.is_none() {
            tracing::warn!(
                "Order {} was not in delivered when its escrow auto-released",
                order_id
            );
        }

        Ok(())
    }

    async fn release_inner(
        &self,
        escrow: Escrow,
        released_by: Uuid,
        reason: Option<String>,
    ) -> Result<(Escrow, WalletTransaction), ServiceError> {
        let (released, ledger_tx) = self
            .db_client
            .release_escrow(escrow.id, released_by, reason)
            .await?
            .ok_or_else(|| {
                ServiceError::AlreadyProcessed(format!(
                    "escrow {} is no longer held",
                    escrow.id
                ))
            })?;

        let platform_fee = percentage_fee(released.amount, released.platform_fee_percent);
        tracing::info!(
            "Escrow {} released: {} cents to seller {}, {} cents platform fee",
            released.id,
            released.amount - platform_fee,
            released.seller_id,
            platform_fee
        );

        let _ = self
            .notification_service
            .notify_escrow_released(&released, released.amount - platform_fee)
            .await;

        if let Ok(Some(seller)) = self.db_client.get_user(Some(released.seller_id), None).await {
            if let Err(e) = mails::send_escrow_released_email(
                &seller.email,
                &released.order_id.to_string(),
                released.amount - platform_fee,
            )
            .await
            {
                tracing::warn!("Escrow release email failed for {}: {}", seller.email, e);
            }
        }

        Ok((released, ledger_tx))
    }

    /// Refund held funds to the buyer. The ledger commits first; the
    /// gateway-side refund follows and a failure there is logged for manual
    /// replay rather than rolling the ledger back.
    pub async fn refund(
        &self,
        escrow_id: Uuid,
        reason: String,
        refunded_by: Uuid,
        is_admin: bool,
    ) -> Result<(Escrow, WalletTransaction), ServiceError> {
        let escrow = self
            .db_client
            .get_escrow_by_id(escrow_id)
            .await?
            .ok_or(ServiceError::EscrowNotFound(escrow_id))?;

        if !is_admin && refunded_by != escrow.buyer_id {
            return Err(ServiceError::Unauthorized(refunded_by));
        }

        let (refunded, ledger_tx) = self
            .db_client
            .refund_escrow(escrow_id, refunded_by, reason)
            .await?
            .ok_or_else(|| {
                ServiceError::AlreadyProcessed(format!(
                    "escrow {} is no longer held",
                    escrow_id
                ))
            })?;

        tracing::info!(
            "Escrow {} refunded: {} cents back to buyer {}",
            refunded.id,
            refunded.amount,
            refunded.buyer_id
        );

        // Gateway-side refund and order payment state, after the ledger commit.
        if let Some(order) = self.db_client.get_order(refunded.order_id).await? {
            if order.payment_status.can_transition_to(&PaymentStatus::Refunded) {
                let _ = self
                    .db_client
                    .update_payment_status(order.id, order.payment_status, PaymentStatus::Refunded)
                    .await;
            }

            if let Some(payment_intent_id) = order.payment_intent_id.as_deref() {
                if let Err(e) = self
                    .payment_provider
                    .refund_payment(payment_intent_id, refunded.amount)
                    .await
                {
                    tracing::error!(
                        "Gateway refund failed for escrow {} (intent {}): {} - requires manual replay",
                        refunded.id,
                        payment_intent_id,
                        e
                    );
                }
            }
        }

        let _ = self
            .notification_service
            .notify_escrow_refunded(&refunded)
            .await;

        Ok((refunded, ledger_tx))
    }

    pub async fn get_by_order(&self, order_id: Uuid) -> Result<Option<Escrow>, ServiceError> {
        Ok(self.db_client.get_escrow_by_order_id(order_id).await?)
    }

    pub fn is_terminal(escrow: &Escrow) -> bool {
        escrow.status != EscrowStatus::Held
    }
}

fn map_unique_violation(e: sqlx::Error, event_id: &str) -> ServiceError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ServiceError::AlreadyProcessed(format!(
                "checkout event {} already ingested",
                event_id
            ))
        }
        _ => ServiceError::Database(e),
    }
}
