// models/walletmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
pub enum TransactionType {
    EscrowHold,
    EscrowRelease,
    EscrowRefund,
    PlatformFee,
    Withdrawal,
    WithdrawalReversal,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

impl EscrowStatus {
    /// Held -> Released and Held -> Refunded are the only legal transitions;
    /// both targets are terminal.
    pub fn can_transition_to(&self, to: &EscrowStatus) -> bool {
        matches!(
            (self, to),
            (EscrowStatus::Held, EscrowStatus::Released)
                | (EscrowStatus::Held, EscrowStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EscrowStatus::Held)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "withdrawal_status", rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payout_method", rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Paypal,
    Stripe,
}

impl PayoutMethod {
    pub fn to_str(&self) -> &str {
        match self {
            PayoutMethod::BankTransfer => "bank_transfer",
            PayoutMethod::Paypal => "paypal",
            PayoutMethod::Stripe => "stripe",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,           // available funds, in cents
    pub pending_clearance: i64, // funds held in escrow, in cents
    pub total_earnings: i64,
    pub total_withdrawals: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Append-only ledger row. Every wallet mutation writes one of these inside
/// the same database transaction.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub amount: i64, // in cents
    pub balance_before: i64,
    pub balance_after: i64,
    pub pending_before: i64,
    pub pending_after: i64,
    pub status: Option<TransactionStatus>,
    pub reference: String, // Unique transaction reference
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Escrow {
    pub id: Uuid,
    pub order_id: Uuid, // UNIQUE: one escrow per order
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub amount: i64, // in cents
    pub platform_fee_percent: f64,
    pub status: EscrowStatus,
    pub held_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolution_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64, // gross amount debited, in cents
    pub fee: i64,
    pub net_amount: i64,
    pub method: PayoutMethod,
    pub account_details: serde_json::Value,
    pub status: WithdrawalStatus,
    pub reference: String,
    pub external_reference: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub flagged_at: Option<DateTime<Utc>>,
}

/// Idempotency record for gateway callbacks; (gateway, event_id) is UNIQUE.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub gateway: String,
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
}

// Helper functions for amount conversion
impl Wallet {
    pub fn balance_in_units(&self) -> f64 {
        self.balance as f64 / 100.0
    }

    pub fn pending_clearance_in_units(&self) -> f64 {
        self.pending_clearance as f64 / 100.0
    }

    pub fn total_earnings_in_units(&self) -> f64 {
        self.total_earnings as f64 / 100.0
    }

    pub fn total_withdrawals_in_units(&self) -> f64 {
        self.total_withdrawals as f64 / 100.0
    }
}

impl WalletTransaction {
    pub fn amount_in_units(&self) -> f64 {
        self.amount as f64 / 100.0
    }
}

pub fn generate_transaction_reference() -> String {
    format!(
        "GMK_{}",
        uuid::Uuid::new_v4()
            .to_string()
            .replace("-", "")
            .to_uppercase()[..16]
            .to_string()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_transitions() {
        assert!(EscrowStatus::Held.can_transition_to(&EscrowStatus::Released));
        assert!(EscrowStatus::Held.can_transition_to(&EscrowStatus::Refunded));

        // release and refund are mutually exclusive terminals
        assert!(!EscrowStatus::Released.can_transition_to(&EscrowStatus::Refunded));
        assert!(!EscrowStatus::Refunded.can_transition_to(&EscrowStatus::Released));
        assert!(!EscrowStatus::Released.can_transition_to(&EscrowStatus::Held));
    }

    #[test]
    fn test_escrow_terminal_states() {
        assert!(!EscrowStatus::Held.is_terminal());
        assert!(EscrowStatus::Released.is_terminal());
        assert!(EscrowStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_transaction_reference_format() {
        let reference = generate_transaction_reference();
        assert!(reference.starts_with("GMK_"));
        assert_eq!(reference.len(), 20);
        assert!(reference[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
