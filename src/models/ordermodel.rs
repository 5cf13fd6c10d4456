// models/ordermodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Delivered,
    Completed,
    Cancelled,
    Disputed,
}

impl OrderStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Disputed => "disputed",
        }
    }

    /// Transition table for the order lifecycle. Completed and cancelled are
    /// terminal.
    pub fn can_transition_to(&self, to: &OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Pending, OrderStatus::InProgress)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Delivered)
                | (OrderStatus::InProgress, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Disputed)
                | (OrderStatus::Delivered, OrderStatus::Completed)
                | (OrderStatus::Delivered, OrderStatus::Disputed)
                | (OrderStatus::Disputed, OrderStatus::Completed)
                | (OrderStatus::Disputed, OrderStatus::Cancelled)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Refunded,
}

impl PaymentStatus {
    /// Payment status moves forward only: pending -> processing -> completed,
    /// with refunded reachable from processing or completed.
    pub fn can_transition_to(&self, to: &PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Processing, PaymentStatus::Completed)
                | (PaymentStatus::Processing, PaymentStatus::Refunded)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: i64, // in cents
    pub service_fee: i64,  // in cents
    pub payment_intent_id: Option<String>,
    pub package_type: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn total_amount_in_units(&self) -> f64 {
        self.total_amount as f64 / 100.0
    }

    pub fn service_fee_in_units(&self) -> f64 {
        self.service_fee as f64 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::InProgress));
        assert!(OrderStatus::InProgress.can_transition_to(&OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(&OrderStatus::Completed));
        assert!(OrderStatus::Delivered.can_transition_to(&OrderStatus::Disputed));
        assert!(OrderStatus::Disputed.can_transition_to(&OrderStatus::Cancelled));

        // terminal states
        assert!(!OrderStatus::Completed.can_transition_to(&OrderStatus::Disputed));
        assert!(!OrderStatus::Cancelled.can_transition_to(&OrderStatus::InProgress));
        // no skipping delivery
        assert!(!OrderStatus::InProgress.can_transition_to(&OrderStatus::Completed));
    }

    #[test]
    fn test_payment_status_is_monotonic() {
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Processing));
        assert!(PaymentStatus::Processing.can_transition_to(&PaymentStatus::Completed));
        assert!(PaymentStatus::Completed.can_transition_to(&PaymentStatus::Refunded));

        assert!(!PaymentStatus::Completed.can_transition_to(&PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_transition_to(&PaymentStatus::Completed));
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Completed));
    }
}
