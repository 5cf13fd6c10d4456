// handler/payments.rs
use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        orderdb::{CheckoutOrder, OrderExt},
        userdb::UserExt,
    },
    dtos::{
        paymentdtos::*,
        ApiResponse,
    },
    error::HttpError,
    mail::mails,
    middleware::JWTAuthMiddeware,
    models::{
        ordermodel::PaymentStatus,
        walletmodels::EscrowStatus,
    },
    utils::currency::{percentage_fee, units_to_cents},
    AppState,
};

const GATEWAY_NAME: &str = "stripe";

pub fn payments_handler() -> Router {
    Router::new().route("/checkout", post(create_checkout))
}

pub fn payments_public_handler() -> Router {
    Router::new().route("/webhook", post(gateway_webhook))
}

/// Creates a hosted checkout session for a gig purchase. The order itself is
/// only created when the gateway confirms payment on the webhook.
pub async fn create_checkout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateCheckoutDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.seller_id == auth.user.id {
        return Err(HttpError::bad_request("You cannot order your own gig"));
    }

    let amount_cents = units_to_cents(body.amount);
    let service_fee_cents = percentage_fee(amount_cents, app_state.env.platform_fee_percent);

    let session = app_state
        .payment_provider
        .create_checkout_session(
            &body.gig_id.to_string(),
            &auth.user.id.to_string(),
            &body.seller_id.to_string(),
            &body.package_type,
            amount_cents,
            service_fee_cents,
        )
        .await
        .map_err(HttpError::from)?;

    let response = CheckoutResponseDto {
        session_id: session.session_id,
        checkout_url: session.checkout_url,
        amount: session.amount,
        service_fee: service_fee_cents as f64 / 100.0,
    };

    Ok(Json(ApiResponse::success(
        "Checkout session created",
        response,
    )))
}

/// Gateway webhook. The raw body is verified against the signature header
/// before anything is deserialized; replays are absorbed by the
/// webhook_events unique constraint.
pub async fn gateway_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing or invalid gateway signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    if !verify_gateway_signature(&body, signature, &app_state.env.gateway_webhook_secret) {
        tracing::warn!("Invalid gateway webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event: GatewayEventDto = serde_json::from_str(&body)
        .map_err(|e| HttpError::bad_request(format!("Malformed webhook payload: {}", e)))?;

    let payload: serde_json::Value =
        serde_json::from_str(&body).unwrap_or_else(|_| serde_json::Value::Null);

    match event.event_type.as_str() {
        // The dedup row commits together with the order and escrow hold, so
        // a failed delivery rolls everything back and the gateway retry
        // starts clean.
        "checkout.session.completed" => {
            let first_delivery = process_checkout_completed(&app_state, &event, &payload).await?;
            if !first_delivery {
                tracing::info!("Webhook event {} already processed, skipping", event.id);
                return Ok(Json(ApiResponse::success(
                    "Event already processed",
                    serde_json::json!({ "event_id": event.id }),
                )));
            }
        }
        other => {
            // First delivery wins; every replay of the same event id is
            // acknowledged without side effects.
            let first_delivery = app_state
                .db_client
                .record_webhook_event(GATEWAY_NAME, &event.id, &event.event_type, &payload)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            if !first_delivery {
                tracing::info!("Webhook event {} already processed, skipping", event.id);
                return Ok(Json(ApiResponse::success(
                    "Event already processed",
                    serde_json::json!({ "event_id": event.id }),
                )));
            }

            if other == "charge.refunded" {
                process_charge_refunded(&app_state, &event).await?;
            } else {
                tracing::debug!("Ignoring webhook event type {}", other);
            }
        }
    }

    Ok(Json(ApiResponse::success(
        "Event processed",
        serde_json::json!({ "event_id": event.id }),
    )))
}

/// Returns false when the event id was already processed. A true return
/// means the order and its escrow committed in this delivery.
async fn process_checkout_completed(
    app_state: &Arc<AppState>,
    event: &GatewayEventDto,
    payload: &serde_json::Value,
) -> Result<bool, HttpError> {
    let checkout = parse_checkout_session(event)?;
    let buyer_id = checkout.buyer_id;
    let amount_total = checkout.total_amount;

    let ingested = app_state
        .escrow_service
        .ingest_checkout(GATEWAY_NAME, &event.id, &event.event_type, payload, checkout)
        .await
        .map_err(HttpError::from)?;

    let (order, _escrow) = match ingested {
        Some(pair) => pair,
        None => return Ok(false),
    };

    tracing::info!(
        "Order {} created from webhook event {}: {} cents",
        order.id,
        event.id,
        amount_total
    );

    if let Ok(Some(buyer)) = app_state.db_client.get_user(Some(buyer_id), None).await {
        if let Err(e) =
            mails::send_order_confirmation_email(&buyer.email, &order.id.to_string(), amount_total)
                .await
        {
            tracing::warn!("Order confirmation email failed for {}: {}", buyer.email, e);
        }
    }

    Ok(true)
}

fn parse_checkout_session(event: &GatewayEventDto) -> Result<CheckoutOrder, HttpError> {
    let object = &event.data.object;

    let amount_total = object["amount_total"]
        .as_i64()
        .ok_or_else(|| HttpError::bad_request("Missing amount_total in checkout session"))?;
    let payment_intent_id = object["payment_intent"].as_str().map(|s| s.to_string());

    let metadata: CheckoutMetadataDto = serde_json::from_value(object["metadata"].clone())
        .map_err(|e| HttpError::bad_request(format!("Malformed checkout metadata: {}", e)))?;

    let service_fee: i64 = metadata
        .service_fee
        .parse()
        .map_err(|_| HttpError::bad_request("Malformed service_fee in metadata"))?;

    Ok(CheckoutOrder {
        gig_id: parse_metadata_uuid(&metadata.gig_id, "gig_id")?,
        buyer_id: parse_metadata_uuid(&metadata.buyer_id, "buyer_id")?,
        seller_id: parse_metadata_uuid(&metadata.seller_id, "seller_id")?,
        total_amount: amount_total,
        service_fee,
        payment_intent_id,
        package_type: Some(metadata.package_type),
    })
}

async fn process_charge_refunded(
    app_state: &Arc<AppState>,
    event: &GatewayEventDto,
) -> Result<(), HttpError> {
    let payment_intent_id = match event.data.object["payment_intent"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("charge.refunded event {} without payment_intent", event.id);
            return Ok(());
        }
    };

    let order = match app_state
        .db_client
        .get_order_by_payment_intent(payment_intent_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
    {
        Some(order) => order,
        None => {
            tracing::warn!(
                "charge.refunded for unknown payment intent {}",
                payment_intent_id
            );
            return Ok(());
        }
    };

    // The ledger refund is the source of truth; this event only confirms the
    // gateway side. A refund the ledger never issued is flagged, not applied.
    let escrow = app_state
        .escrow_service
        .get_by_order(order.id)
        .await
        .map_err(HttpError::from)?;

    match escrow {
        Some(escrow) if escrow.status == EscrowStatus::Refunded => {
            if order.payment_status.can_transition_to(&PaymentStatus::Refunded) {
                let _ = app_state
                    .db_client
                    .update_payment_status(order.id, order.payment_status, PaymentStatus::Refunded)
                    .await;
            }
        }
        _ => {
            tracing::warn!(
                "Gateway refund for order {} without a matching ledger refund",
                order.id
            );
        }
    }

    Ok(())
}

fn parse_metadata_uuid(value: &str, field: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(value)
        .map_err(|_| HttpError::bad_request(format!("Malformed {} in metadata", field)))
}

fn verify_gateway_signature(payload: &str, signature: &str, secret: &str) -> bool {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());

    let expected_signature_hex = hex::encode(mac.finalize().into_bytes());

    // Constant-time compare to prevent timing attacks
    ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &str, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_roundtrip() {
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let signature = sign(payload, "whsec_test");

        assert!(verify_gateway_signature(payload, &signature, "whsec_test"));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let payload = r#"{"id":"evt_1"}"#;
        let signature = sign(payload, "whsec_test");

        assert!(!verify_gateway_signature(payload, &signature, "whsec_other"));
    }

    #[test]
    fn test_signature_rejects_tampered_payload() {
        let signature = sign(r#"{"amount_total":5000}"#, "whsec_test");

        assert!(!verify_gateway_signature(
            r#"{"amount_total":50000}"#,
            &signature,
            "whsec_test"
        ));
    }

    fn checkout_event(object: serde_json::Value) -> GatewayEventDto {
        serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": object },
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_checkout_session() {
        let gig_id = Uuid::new_v4();
        let buyer_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();

        let event = checkout_event(serde_json::json!({
            "amount_total": 10_000,
            "payment_intent": "pi_123",
            "metadata": {
                "gig_id": gig_id.to_string(),
                "buyer_id": buyer_id.to_string(),
                "seller_id": seller_id.to_string(),
                "package_type": "standard",
                "service_fee": "1000",
            },
        }));

        let checkout = parse_checkout_session(&event).unwrap();
        assert_eq!(checkout.gig_id, gig_id);
        assert_eq!(checkout.buyer_id, buyer_id);
        assert_eq!(checkout.seller_id, seller_id);
        assert_eq!(checkout.total_amount, 10_000);
        assert_eq!(checkout.service_fee, 1_000);
        assert_eq!(checkout.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_parse_checkout_session_missing_amount() {
        let event = checkout_event(serde_json::json!({
            "payment_intent": "pi_123",
            "metadata": {},
        }));

        assert!(parse_checkout_session(&event).is_err());
    }

    #[test]
    fn test_parse_checkout_session_bad_service_fee() {
        let gig_id = Uuid::new_v4().to_string();

        let event = checkout_event(serde_json::json!({
            "amount_total": 10_000,
            "metadata": {
                "gig_id": &gig_id,
                "buyer_id": &gig_id,
                "seller_id": &gig_id,
                "package_type": "standard",
                "service_fee": "ten",
            },
        }));

        assert!(parse_checkout_session(&event).is_err());
    }

    #[test]
    fn test_metadata_uuid_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_metadata_uuid(&id.to_string(), "gig_id").unwrap(), id);
        assert!(parse_metadata_uuid("not-a-uuid", "gig_id").is_err());
    }
}
