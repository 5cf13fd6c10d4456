// dtos/paymentdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCheckoutDto {
    pub gig_id: Uuid,

    pub seller_id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Package type is required"))]
    pub package_type: String,

    #[validate(range(min = 1.0, max = 100000.0, message = "Amount must be between $1 and $100,000"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponseDto {
    pub session_id: String,
    pub checkout_url: String,
    pub amount: f64,
    pub service_fee: f64,
}

/// Gateway event envelope. The raw body is what the signature covers; this is
/// only deserialized after verification succeeds.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayEventDto {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub data: GatewayEventDataDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayEventDataDto {
    pub object: serde_json::Value,
}

/// Metadata echoed back on `checkout.session.completed`. The gateway stores
/// metadata values as strings, so ids and amounts arrive stringly typed.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutMetadataDto {
    pub gig_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub package_type: String,
    pub service_fee: String,
}
