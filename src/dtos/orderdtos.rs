// dtos/orderdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ordermodel::{Order, OrderStatus, PaymentStatus};
use crate::models::walletmodels::{Escrow, EscrowStatus};
use crate::utils::currency::cents_to_units;

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponseDto {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: f64,
    pub service_fee: f64,
    pub package_type: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EscrowResponseDto {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub platform_fee_percent: f64,
    pub status: EscrowStatus,
    pub held_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderDetailResponseDto {
    pub order: OrderResponseDto,
    pub escrow: Option<EscrowResponseDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderListQueryDto {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(range(min = 0, message = "Offset must be non-negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResolveDisputeDto {
    /// true pays the seller (order completes), false refunds the buyer
    /// (order cancels).
    pub favor_seller: bool,

    #[validate(length(min = 1, max = 500, message = "Reason must be between 1 and 500 characters"))]
    pub reason: String,
}

impl From<Order> for OrderResponseDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            gig_id: order.gig_id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount_in_units(),
            service_fee: order.service_fee_in_units(),
            package_type: order.package_type,
            delivery_date: order.delivery_date,
            completed_at: order.completed_at,
            created_at: order.created_at,
        }
    }
}

impl From<Escrow> for EscrowResponseDto {
    fn from(escrow: Escrow) -> Self {
        Self {
            id: escrow.id,
            order_id: escrow.order_id,
            amount: cents_to_units(escrow.amount),
            platform_fee_percent: escrow.platform_fee_percent,
            status: escrow.status,
            held_at: escrow.held_at,
            resolved_at: escrow.resolved_at,
            resolution_reason: escrow.resolution_reason,
        }
    }
}
