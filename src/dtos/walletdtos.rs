// dtos/walletdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::walletdb::WalletSummary;
use crate::models::walletmodels::*;
use crate::utils::currency::cents_to_units;

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponseDto {
    pub id: Uuid,
    pub balance: f64,
    pub pending_clearance: f64,
    pub total_earnings: f64,
    pub total_withdrawals: f64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletSummaryDto {
    pub balance: f64,
    pub pending_clearance: f64,
    pub total_earnings: f64,
    pub total_withdrawals: f64,
    pub held_escrows: i64,
    pub pending_withdrawals: i64,
    pub lifetime_platform_fees: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponseDto {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub pending_before: f64,
    pub pending_after: f64,
    pub status: TransactionStatus,
    pub reference: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TransactionHistoryQueryDto {
    pub transaction_type: Option<TransactionType>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must be non-negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WithdrawalRequestDto {
    #[validate(range(min = 10.0, max = 50000.0, message = "Amount must be between $10 and $50,000"))]
    pub amount: f64,

    pub method: PayoutMethod,

    pub account_details: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawalResponseDto {
    pub id: Uuid,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub method: PayoutMethod,
    pub status: WithdrawalStatus,
    pub reference: String,
    pub external_reference: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WithdrawalHistoryQueryDto {
    pub status: Option<WithdrawalStatus>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must be non-negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProcessWithdrawalDto {
    pub approve: bool,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

// Conversion helpers
impl From<Wallet> for WalletResponseDto {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            balance: wallet.balance_in_units(),
            pending_clearance: wallet.pending_clearance_in_units(),
            total_earnings: wallet.total_earnings_in_units(),
            total_withdrawals: wallet.total_withdrawals_in_units(),
            created_at: wallet.created_at,
        }
    }
}

impl From<WalletSummary> for WalletSummaryDto {
    fn from(summary: WalletSummary) -> Self {
        Self {
            balance: cents_to_units(summary.balance),
            pending_clearance: cents_to_units(summary.pending_clearance),
            total_earnings: cents_to_units(summary.total_earnings),
            total_withdrawals: cents_to_units(summary.total_withdrawals),
            held_escrows: summary.held_escrows,
            pending_withdrawals: summary.pending_withdrawals,
            lifetime_platform_fees: cents_to_units(summary.lifetime_platform_fees),
        }
    }
}

impl From<WalletTransaction> for TransactionResponseDto {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            order_id: tx.order_id,
            transaction_type: tx.transaction_type,
            amount: tx.amount_in_units(),
            balance_before: cents_to_units(tx.balance_before),
            balance_after: cents_to_units(tx.balance_after),
            pending_before: cents_to_units(tx.pending_before),
            pending_after: cents_to_units(tx.pending_after),
            status: tx.status.unwrap_or(TransactionStatus::Completed),
            reference: tx.reference,
            description: tx.description,
            metadata: tx.metadata,
            created_at: tx.created_at,
        }
    }
}

impl From<WithdrawalRequest> for WithdrawalResponseDto {
    fn from(request: WithdrawalRequest) -> Self {
        Self {
            id: request.id,
            amount: cents_to_units(request.amount),
            fee: cents_to_units(request.fee),
            net_amount: cents_to_units(request.net_amount),
            method: request.method,
            status: request.status,
            reference: request.reference,
            external_reference: request.external_reference,
            admin_notes: request.admin_notes,
            created_at: request.created_at,
            processed_at: request.processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_withdrawal_response_converts_cents_to_units() {
        let request = WithdrawalRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            amount: 10_000,
            fee: 200,
            net_amount: 9_800,
            method: PayoutMethod::Paypal,
            account_details: serde_json::json!({ "email": "seller@example.com" }),
            status: WithdrawalStatus::Pending,
            reference: "GMK_TEST".to_string(),
            external_reference: None,
            admin_notes: None,
            created_at: None,
            processed_at: None,
            flagged_at: None,
        };

        let dto: WithdrawalResponseDto = request.into();
        assert_eq!(dto.amount, 100.0);
        assert_eq!(dto.fee, 2.0);
        assert_eq!(dto.net_amount, 98.0);
    }

    #[test]
    fn test_transaction_response_converts_cents_to_units() {
        let tx = WalletTransaction {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_id: None,
            transaction_type: TransactionType::EscrowRelease,
            amount: 90_000,
            balance_before: 0,
            balance_after: 90_000,
            pending_before: 100_000,
            pending_after: 0,
            status: Some(TransactionStatus::Completed),
            reference: "GMK_TEST".to_string(),
            description: "Escrow release".to_string(),
            metadata: None,
            created_at: None,
        };

        let dto: TransactionResponseDto = tx.into();
        assert_eq!(dto.amount, 900.0);
        assert_eq!(dto.balance_after, 900.0);
        assert_eq!(dto.pending_before, 1000.0);
        assert_eq!(dto.pending_after, 0.0);
    }
}
