// db/withdrawaldb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use super::escrowdb::{insert_ledger_row, lock_wallet};
use crate::models::walletmodels::*;

const WITHDRAWAL_COLUMNS: &str = r#"
    id,
    user_id,
    wallet_id,
    amount,
    fee,
    net_amount,
    method,
    account_details,
    status,
    reference,
    external_reference,
    admin_notes,
    created_at,
    processed_at,
    flagged_at
"#;

/// Outcome of a withdrawal request attempt. The balance check happens under
/// the wallet row lock, so two concurrent identical requests serialize and the
/// second sees the already-reduced balance.
#[derive(Debug)]
pub enum WithdrawalAttempt {
    Created(WithdrawalRequest),
    InsufficientBalance { required: i64, available: i64 },
}

#[async_trait]
pub trait WithdrawalExt {
    /// Debits the gross amount and records a PENDING request plus a
    /// withdrawal ledger row, all in one transaction.
    async fn create_withdrawal_request(
        &self,
        user_id: Uuid,
        amount: i64,
        fee: i64,
        method: PayoutMethod,
        account_details: serde_json::Value,
    ) -> Result<WithdrawalAttempt, Error>;

    /// PENDING -> PROCESSING. Ok(None) when the request already left PENDING.
    async fn mark_withdrawal_processing(
        &self,
        request_id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, Error>;

    /// PROCESSING -> COMPLETED with the payout rail's reference.
    async fn complete_withdrawal(
        &self,
        request_id: Uuid,
        external_reference: String,
    ) -> Result<Option<WithdrawalRequest>, Error>;

    /// PROCESSING -> FAILED; restores the debited amount with a reversal
    /// ledger row in the same transaction.
    async fn fail_withdrawal(
        &self,
        request_id: Uuid,
        notes: String,
    ) -> Result<Option<WithdrawalRequest>, Error>;

    /// PENDING -> REJECTED; restores the debited amount with a reversal
    /// ledger row in the same transaction.
    async fn reject_withdrawal(
        &self,
        request_id: Uuid,
        notes: String,
    ) -> Result<Option<WithdrawalRequest>, Error>;

    async fn get_withdrawal_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, Error>;

    async fn get_withdrawal_requests(
        &self,
        user_id: Option<Uuid>,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, Error>;

    /// PROCESSING requests untouched since the cutoff that have not been
    /// flagged yet, for the stale sweep.
    async fn get_stale_processing_withdrawals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>, Error>;

    /// Marks a request as flagged so the sweep alerts admins about it once.
    async fn flag_stale_withdrawal(&self, request_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl WithdrawalExt for DBClient {
    async fn create_withdrawal_request(
        &self,
        user_id: Uuid,
        amount: i64,
        fee: i64,
        method: PayoutMethod,
        account_details: serde_json::Value,
    ) -> Result<WithdrawalAttempt, Error> {
        let mut tx = self.pool.begin().await?;

        let wallet = lock_wallet(&mut tx, user_id).await?;
        if wallet.balance < amount {
            return Ok(WithdrawalAttempt::InsufficientBalance {
                required: amount,
                available: wallet.balance,
            });
        }

        let balance_after = wallet.balance - amount;
        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2,
                total_withdrawals = total_withdrawals + $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(balance_after)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        let reference = generate_transaction_reference();
        let request = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            INSERT INTO withdrawal_requests
            (user_id, wallet_id, amount, fee, net_amount, method, account_details, reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        ))
        .bind(user_id)
        .bind(wallet.id)
        .bind(amount)
        .bind(fee)
        .bind(amount - fee)
        .bind(method)
        .bind(account_details)
        .bind(&reference)
        .fetch_one(&mut *tx)
        .await?;

        insert_ledger_row(
            &mut tx,
            &wallet,
            None,
            TransactionType::Withdrawal,
            amount,
            wallet.balance,
            balance_after,
            wallet.pending_clearance,
            wallet.pending_clearance,
            format!("Withdrawal request {}", reference),
            Some(serde_json::json!({
                "withdrawal_request_id": request.id,
                "fee": fee,
                "net_amount": amount - fee,
                "method": method.to_str(),
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(WithdrawalAttempt::Created(request))
    }

    async fn mark_withdrawal_processing(
        &self,
        request_id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            UPDATE withdrawal_requests
            SET status = 'processing'
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_withdrawal(
        &self,
        request_id: Uuid,
        external_reference: String,
    ) -> Result<Option<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            UPDATE withdrawal_requests
            SET status = 'completed',
                external_reference = $2,
                processed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        ))
        .bind(request_id)
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn fail_withdrawal(
        &self,
        request_id: Uuid,
        notes: String,
    ) -> Result<Option<WithdrawalRequest>, Error> {
        restore_and_close(self, request_id, "processing", "failed", notes).await
    }

    async fn reject_withdrawal(
        &self,
        request_id: Uuid,
        notes: String,
    ) -> Result<Option<WithdrawalRequest>, Error> {
        restore_and_close(self, request_id, "pending", "rejected", notes).await
    }

    async fn get_withdrawal_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {} FROM withdrawal_requests WHERE id = $1",
            WITHDRAWAL_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_withdrawal_requests(
        &self,
        user_id: Option<Uuid>,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, Error> {
        let base = format!(
            "SELECT {} FROM withdrawal_requests WHERE 1=1",
            WITHDRAWAL_COLUMNS
        );

        match (user_id, status) {
            (Some(user_id), Some(status)) => {
                let query = format!(
                    "{} AND user_id = $1 AND status = $2 ORDER BY created_at DESC LIMIT $3 OFFSET $4",
                    base
                );
                sqlx::query_as::<_, WithdrawalRequest>(&query)
                    .bind(user_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            (Some(user_id), None) => {
                let query = format!(
                    "{} AND user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    base
                );
                sqlx::query_as::<_, WithdrawalRequest>(&query)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, Some(status)) => {
                let query = format!(
                    "{} AND status = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    base
                );
                sqlx::query_as::<_, WithdrawalRequest>(&query)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, None) => {
                let query = format!("{} ORDER BY created_at DESC LIMIT $1 OFFSET $2", base);
                sqlx::query_as::<_, WithdrawalRequest>(&query)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
        }
    }

    async fn get_stale_processing_withdrawals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            SELECT {}
            FROM withdrawal_requests
            WHERE status = 'processing' AND created_at < $1 AND flagged_at IS NULL
            ORDER BY created_at ASC
            "#,
            WITHDRAWAL_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    async fn flag_stale_withdrawal(&self, request_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE withdrawal_requests SET flagged_at = NOW() WHERE id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Close out a request from `from_status` to `to_status` and put the debited
/// amount back on the wallet with a reversal ledger row. Guarded the same way
/// as the escrow transitions: zero rows affected means someone else already
/// moved the request.
async fn restore_and_close(
    client: &DBClient,
    request_id: Uuid,
    from_status: &str,
    to_status: &str,
    notes: String,
) -> Result<Option<WithdrawalRequest>, Error> {
    let mut tx = client.pool.begin().await?;

    let request = sqlx::query_as::<_, WithdrawalRequest>(&format!(
        r#"
        UPDATE withdrawal_requests
        SET status = $2::withdrawal_status,
            admin_notes = $3,
            processed_at = NOW()
        WHERE id = $1 AND status = $4::withdrawal_status
        RETURNING {}
        "#,
        WITHDRAWAL_COLUMNS
    ))
    .bind(request_id)
    .bind(to_status)
    .bind(notes)
    .bind(from_status)
    .fetch_optional(&mut *tx)
    .await?;

    let request = match request {
        Some(request) => request,
        None => return Ok(None),
    };

    let wallet = lock_wallet(&mut tx, request.user_id).await?;
    let balance_after = wallet.balance + request.amount;

    sqlx::query(
        r#"
        UPDATE wallets
        SET balance = $2,
            total_withdrawals = total_withdrawals - $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(wallet.id)
    .bind(balance_after)
    .bind(request.amount)
    .execute(&mut *tx)
    .await?;

    insert_ledger_row(
        &mut tx,
        &wallet,
        None,
        TransactionType::WithdrawalReversal,
        request.amount,
        wallet.balance,
        balance_after,
        wallet.pending_clearance,
        wallet.pending_clearance,
        format!("Reversal of withdrawal {}", request.reference),
        Some(serde_json::json!({
            "withdrawal_request_id": request.id,
            "outcome": to_status,
        })),
    )
    .await?;

    tx.commit().await?;
    Ok(Some(request))
}
