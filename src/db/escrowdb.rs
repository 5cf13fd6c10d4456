// db/escrowdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, Postgres, Row, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::walletmodels::*;
use crate::utils::currency::percentage_fee;

const ESCROW_COLUMNS: &str = r#"
    id,
    order_id,
    buyer_id,
    seller_id,
    amount,
    platform_fee_percent,
    status,
    held_at,
    resolved_at,
    resolved_by,
    resolution_reason
"#;

const LEDGER_COLUMNS: &str = r#"
    id, wallet_id, user_id, order_id, transaction_type,
    amount, balance_before, balance_after, pending_before, pending_after,
    status, reference, description, metadata, created_at
"#;

/// Escrow fund movements. Each operation is a single database transaction:
/// the escrow row carries a guarded terminal UPDATE (zero rows affected means
/// the record already left HELD) and the seller wallet row is locked FOR
/// UPDATE before its balances move, so concurrent release/refund calls against
/// the same escrow serialize and exactly one wins.
#[async_trait]
pub trait EscrowExt {
    /// HELD -> RELEASED. Returns Ok(None) when the record is already terminal.
    /// On success: pending_clearance -= amount, balance += amount - fee,
    /// total_earnings += amount - fee, plus escrow_release and platform_fee
    /// ledger rows.
    async fn release_escrow(
        &self,
        escrow_id: Uuid,
        resolved_by: Uuid,
        reason: Option<String>,
    ) -> Result<Option<(Escrow, WalletTransaction)>, Error>;

    /// HELD -> REFUNDED. Returns Ok(None) when the record is already terminal.
    /// On success: pending_clearance -= amount; available balance untouched.
    async fn refund_escrow(
        &self,
        escrow_id: Uuid,
        resolved_by: Uuid,
        reason: String,
    ) -> Result<Option<(Escrow, WalletTransaction)>, Error>;

    async fn get_escrow_by_id(&self, escrow_id: Uuid) -> Result<Option<Escrow>, Error>;

    async fn get_escrow_by_order_id(&self, order_id: Uuid) -> Result<Option<Escrow>, Error>;

    /// HELD escrows older than the cutoff, for the auto-release job.
    async fn get_held_escrows_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Escrow>, Error>;
}

#[async_trait]
impl EscrowExt for DBClient {
    async fn release_escrow(
        &self,
        escrow_id: Uuid,
        resolved_by: Uuid,
        reason: Option<String>,
    ) -> Result<Option<(Escrow, WalletTransaction)>, Error> {
        let mut tx = self.pool.begin().await?;

        // Guarded terminal transition: zero rows means a concurrent or prior
        // release/refund already won.
        let escrow = sqlx::query_as::<_, Escrow>(&format!(
            r#"
            UPDATE escrows
            SET status = 'released',
                resolved_at = NOW(),
                resolved_by = $2,
                resolution_reason = $3
            WHERE id = $1 AND status = 'held'
            RETURNING {}
            "#,
            ESCROW_COLUMNS
        ))
        .bind(escrow_id)
        .bind(resolved_by)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await?;

        let escrow = match escrow {
            Some(escrow) => escrow,
            None => return Ok(None),
        };

        let platform_fee = percentage_fee(escrow.amount, escrow.platform_fee_percent);
        let net_amount = escrow.amount - platform_fee;

        let wallet = lock_wallet(&mut tx, escrow.seller_id).await?;
        let balance_after = wallet.balance + net_amount;
        let pending_after = wallet.pending_clearance - escrow.amount;

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2,
                pending_clearance = $3,
                total_earnings = total_earnings + $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(balance_after)
        .bind(pending_after)
        .bind(net_amount)
        .execute(&mut *tx)
        .await?;

        let release_tx = insert_ledger_row(
            &mut tx,
            &wallet,
            Some(escrow.order_id),
            TransactionType::EscrowRelease,
            net_amount,
            wallet.balance,
            balance_after,
            wallet.pending_clearance,
            pending_after,
            format!("Escrow release for order {}", escrow.order_id),
            Some(serde_json::json!({
                "escrow_id": escrow.id,
                "gross_amount": escrow.amount,
                "platform_fee": platform_fee,
            })),
        )
        .await?;

        // Fee row keeps the audit trail double-sided: gross hold out of
        // pending, net credit plus fee accounted separately.
        insert_ledger_row(
            &mut tx,
            &wallet,
            Some(escrow.order_id),
            TransactionType::PlatformFee,
            platform_fee,
            balance_after,
            balance_after,
            pending_after,
            pending_after,
            format!("Platform fee for order {}", escrow.order_id),
            Some(serde_json::json!({
                "escrow_id": escrow.id,
                "fee_percent": escrow.platform_fee_percent,
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(Some((escrow, release_tx)))
    }

    async fn refund_escrow(
        &self,
        escrow_id: Uuid,
        resolved_by: Uuid,
        reason: String,
    ) -> Result<Option<(Escrow, WalletTransaction)>, Error> {
        let mut tx = self.pool.begin().await?;

        let escrow = sqlx::query_as::<_, Escrow>(&format!(
            r#"
            UPDATE escrows
            SET status = 'refunded',
                resolved_at = NOW(),
                resolved_by = $2,
                resolution_reason = $3
            WHERE id = $1 AND status = 'held'
            RETURNING {}
            "#,
            ESCROW_COLUMNS
        ))
        .bind(escrow_id)
        .bind(resolved_by)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await?;

        let escrow = match escrow {
            Some(escrow) => escrow,
            None => return Ok(None),
        };

        let wallet = lock_wallet(&mut tx, escrow.seller_id).await?;
        let pending_after = wallet.pending_clearance - escrow.amount;

        sqlx::query(
            r#"
            UPDATE wallets
            SET pending_clearance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(pending_after)
        .execute(&mut *tx)
        .await?;

        let refund_tx = insert_ledger_row(
            &mut tx,
            &wallet,
            Some(escrow.order_id),
            TransactionType::EscrowRefund,
            escrow.amount,
            wallet.balance,
            wallet.balance,
            wallet.pending_clearance,
            pending_after,
            format!("Escrow refund for order {}", escrow.order_id),
            Some(serde_json::json!({ "escrow_id": escrow.id })),
        )
        .await?;

        tx.commit().await?;
        Ok(Some((escrow, refund_tx)))
    }

    async fn get_escrow_by_id(&self, escrow_id: Uuid) -> Result<Option<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>(&format!(
            "SELECT {} FROM escrows WHERE id = $1",
            ESCROW_COLUMNS
        ))
        .bind(escrow_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_escrow_by_order_id(&self, order_id: Uuid) -> Result<Option<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>(&format!(
            "SELECT {} FROM escrows WHERE order_id = $1",
            ESCROW_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_held_escrows_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Escrow>, Error> {
        sqlx::query_as::<_, Escrow>(&format!(
            r#"
            SELECT {}
            FROM escrows
            WHERE status = 'held' AND held_at < $1
            ORDER BY held_at ASC
            "#,
            ESCROW_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }
}

/// Creates the HELD record and moves `amount` into the seller's pending
/// clearance, inside the caller's transaction. The UNIQUE constraint on
/// escrows.order_id rejects a second hold for the same order with a
/// unique-violation error.
pub(super) async fn hold_escrow_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    amount: i64,
    platform_fee_percent: f64,
) -> Result<Escrow, Error> {
    let escrow = sqlx::query_as::<_, Escrow>(&format!(
        r#"
        INSERT INTO escrows (order_id, buyer_id, seller_id, amount, platform_fee_percent)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        ESCROW_COLUMNS
    ))
    .bind(order_id)
    .bind(buyer_id)
    .bind(seller_id)
    .bind(amount)
    .bind(platform_fee_percent)
    .fetch_one(&mut **tx)
    .await?;

    let wallet = lock_wallet(tx, seller_id).await?;
    let pending_before = wallet.pending_clearance;
    let pending_after = pending_before + amount;

    sqlx::query(
        r#"
        UPDATE wallets
        SET pending_clearance = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(wallet.id)
    .bind(pending_after)
    .execute(&mut **tx)
    .await?;

    insert_ledger_row(
        tx,
        &wallet,
        Some(order_id),
        TransactionType::EscrowHold,
        amount,
        wallet.balance,
        wallet.balance,
        pending_before,
        pending_after,
        format!("Escrow hold for order {}", order_id),
        None,
    )
    .await?;

    Ok(escrow)
}

/// Lock the seller's wallet row for the remainder of the transaction.
pub(super) async fn lock_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<LockedWallet, Error> {
    let row = sqlx::query(
        "SELECT id, balance, pending_clearance FROM wallets WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(LockedWallet {
        id: row.get::<Uuid, _>("id"),
        user_id,
        balance: row.get::<i64, _>("balance"),
        pending_clearance: row.get::<i64, _>("pending_clearance"),
    })
}

#[derive(Debug)]
pub(super) struct LockedWallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub pending_clearance: i64,
}

#[allow(clippy::too_many_arguments)]
pub(super) async fn insert_ledger_row(
    tx: &mut Transaction<'_, Postgres>,
    wallet: &LockedWallet,
    order_id: Option<Uuid>,
    transaction_type: TransactionType,
    amount: i64,
    balance_before: i64,
    balance_after: i64,
    pending_before: i64,
    pending_after: i64,
    description: String,
    metadata: Option<serde_json::Value>,
) -> Result<WalletTransaction, Error> {
    sqlx::query_as::<_, WalletTransaction>(&format!(
        r#"
        INSERT INTO wallet_transactions
        (wallet_id, user_id, order_id, transaction_type, amount,
         balance_before, balance_after, pending_before, pending_after,
         reference, description, metadata, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'completed')
        RETURNING {}
        "#,
        LEDGER_COLUMNS
    ))
    .bind(wallet.id)
    .bind(wallet.user_id)
    .bind(order_id)
    .bind(transaction_type)
    .bind(amount)
    .bind(balance_before)
    .bind(balance_after)
    .bind(pending_before)
    .bind(pending_after)
    .bind(generate_transaction_reference())
    .bind(description)
    .bind(metadata)
    .fetch_one(&mut **tx)
    .await
}
