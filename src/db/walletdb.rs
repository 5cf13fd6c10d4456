// db/walletdb.rs
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use sqlx::{Error, Row};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::walletmodels::*;

#[async_trait]
pub trait WalletExt {
    /// Fetch the user's wallet, creating an empty one on first access.
    async fn ensure_wallet(&self, user_id: Uuid) -> Result<Wallet, Error>;

    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, Error>;

    async fn get_wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, Error>;

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        transaction_type: Option<TransactionType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error>;

    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, Error>;
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct WalletSummary {
    pub balance: i64,
    pub pending_clearance: i64,
    pub total_earnings: i64,
    pub total_withdrawals: i64,
    pub held_escrows: i64,
    pub pending_withdrawals: i64,
    pub lifetime_platform_fees: i64,
}

const WALLET_COLUMNS: &str = r#"
    id,
    user_id,
    balance,
    pending_clearance,
    total_earnings,
    total_withdrawals,
    created_at,
    updated_at
"#;

#[async_trait]
impl WalletExt for DBClient {
    async fn ensure_wallet(&self, user_id: Uuid) -> Result<Wallet, Error> {
        // user_id is unique; a concurrent first access loses the insert race
        // and falls through to the select.
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, Error> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, Error> {
        let wallet = sqlx::query(
            r#"
            SELECT balance, pending_clearance, total_earnings, total_withdrawals
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let held_escrows = sqlx::query(
            "SELECT COUNT(*) as count FROM escrows WHERE seller_id = $1 AND status = 'held'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let pending_withdrawals = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM withdrawal_requests
            WHERE user_id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let fees = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0) as total
            FROM wallet_transactions
            WHERE user_id = $1 AND transaction_type = 'platform_fee'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(WalletSummary {
            balance: wallet.get::<i64, _>("balance"),
            pending_clearance: wallet.get::<i64, _>("pending_clearance"),
            total_earnings: wallet.get::<i64, _>("total_earnings"),
            total_withdrawals: wallet.get::<i64, _>("total_withdrawals"),
            held_escrows: held_escrows.get::<Option<i64>, _>("count").unwrap_or(0),
            pending_withdrawals: pending_withdrawals
                .get::<Option<i64>, _>("count")
                .unwrap_or(0),
            lifetime_platform_fees: fees
                .get::<Option<BigDecimal>, _>("total")
                .and_then(|bd| bd.to_i64())
                .unwrap_or(0),
        })
    }

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        transaction_type: Option<TransactionType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error> {
        let base = r#"
            SELECT
                id, wallet_id, user_id, order_id, transaction_type,
                amount, balance_before, balance_after, pending_before, pending_after,
                status, reference, description, metadata, created_at
            FROM wallet_transactions
            WHERE user_id = $1
        "#;

        match transaction_type {
            Some(tx_type) => {
                let query = format!(
                    "{} AND transaction_type = $2 ORDER BY created_at DESC LIMIT $3 OFFSET $4",
                    base
                );
                sqlx::query_as::<_, WalletTransaction>(&query)
                    .bind(user_id)
                    .bind(tx_type)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!(
                    "{} ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    base
                );
                sqlx::query_as::<_, WalletTransaction>(&query)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
        }
    }

    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, Error> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT
                id, wallet_id, user_id, order_id, transaction_type,
                amount, balance_before, balance_after, pending_before, pending_after,
                status, reference, description, metadata, created_at
            FROM wallet_transactions
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }
}
