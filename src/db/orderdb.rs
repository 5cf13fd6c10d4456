// db/orderdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use super::escrowdb::hold_escrow_tx;
use crate::models::ordermodel::*;
use crate::models::walletmodels::Escrow;

const ORDER_COLUMNS: &str = r#"
    id,
    gig_id,
    buyer_id,
    seller_id,
    status,
    payment_status,
    total_amount,
    service_fee,
    payment_intent_id,
    package_type,
    delivery_date,
    completed_at,
    created_at,
    updated_at
"#;

/// Parsed checkout payload, ready to persist.
#[derive(Debug)]
pub struct CheckoutOrder {
    pub gig_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub total_amount: i64,
    pub service_fee: i64,
    pub payment_intent_id: Option<String>,
    pub package_type: Option<String>,
}

#[async_trait]
pub trait OrderExt {
    /// Records a gateway event. Returns false when (gateway, event_id) was
    /// already seen; the caller must treat the delivery as a replay and skip
    /// all side effects.
    async fn record_webhook_event(
        &self,
        gateway: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, Error>;

    /// Records the gateway event, creates the order, and holds the escrow in
    /// one transaction. Ok(None) means the event id was already seen and
    /// nothing was written. A failure anywhere rolls the dedup row back with
    /// the rest, so the gateway's retry starts from a clean slate.
    async fn ingest_checkout_completed(
        &self,
        gateway: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        checkout: CheckoutOrder,
        platform_fee_percent: f64,
    ) -> Result<Option<(Order, Escrow)>, Error>;

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, Error>;

    async fn get_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, Error>;

    async fn get_orders_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, Error>;

    /// Guarded status move: the row only changes while it still carries
    /// `expected`, so two racing transitions cannot both apply.
    async fn update_order_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, Error>;

    async fn update_payment_status(
        &self,
        order_id: Uuid,
        expected: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, Error>;
}

#[async_trait]
impl OrderExt for DBClient {
    async fn record_webhook_event(
        &self,
        gateway: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (gateway, event_id, event_type, payload, processed_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (gateway, event_id) DO NOTHING
            "#,
        )
        .bind(gateway)
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ingest_checkout_completed(
        &self,
        gateway: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        checkout: CheckoutOrder,
        platform_fee_percent: f64,
    ) -> Result<Option<(Order, Escrow)>, Error> {
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query(
            r#"
            INSERT INTO webhook_events (gateway, event_id, event_type, payload, processed_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (gateway, event_id) DO NOTHING
            "#,
        )
        .bind(gateway)
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        // Replay: nothing to write, and the open transaction is discarded.
        if recorded.rows_affected() == 0 {
            return Ok(None);
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
            (gig_id, buyer_id, seller_id, total_amount, service_fee,
             payment_intent_id, package_type, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'completed')
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(checkout.gig_id)
        .bind(checkout.buyer_id)
        .bind(checkout.seller_id)
        .bind(checkout.total_amount)
        .bind(checkout.service_fee)
        .bind(checkout.payment_intent_id)
        .bind(checkout.package_type)
        .fetch_one(&mut *tx)
        .await?;

        // The seller may never have earned before; the wallet row must exist
        // before it can be locked.
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(checkout.seller_id)
        .execute(&mut *tx)
        .await?;

        let escrow = hold_escrow_tx(
            &mut tx,
            order.id,
            checkout.buyer_id,
            checkout.seller_id,
            checkout.total_amount,
            platform_fee_percent,
        )
        .await?;

        tx.commit().await?;
        Ok(Some((order, escrow)))
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE payment_intent_id = $1",
            ORDER_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_orders_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $3,
                completed_at = CASE WHEN $3 = 'completed'::order_status THEN NOW() ELSE completed_at END,
                delivery_date = CASE WHEN $3 = 'delivered'::order_status THEN NOW() ELSE delivery_date END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(expected)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_payment_status(
        &self,
        order_id: Uuid,
        expected: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Order>, Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET payment_status = $3, updated_at = NOW()
            WHERE id = $1 AND payment_status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(expected)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }
}
