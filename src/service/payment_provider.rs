// service/payment_provider.rs
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::models::walletmodels::PayoutMethod;
use crate::service::error::ServiceError;
use crate::utils::currency::cents_to_units;

/// Thin client over the payment gateway's HTTP API. Checkout sessions,
/// gateway-side refunds, and the three payout rails all go through here; the
/// gateway's own semantics stay on its side of the boundary.
#[derive(Debug, Clone)]
pub struct PaymentProviderService {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
    app_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutResult {
    pub external_reference: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefundResult {
    pub refund_id: String,
    pub status: String,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.gateway_base_url.clone(),
            secret_key: config.gateway_secret_key.clone(),
            app_url: config.app_url.clone(),
        }
    }

    /// Create a hosted checkout session for an order. Metadata round-trips
    /// through the gateway and comes back on the webhook.
    pub async fn create_checkout_session(
        &self,
        gig_id: &str,
        buyer_id: &str,
        seller_id: &str,
        package_type: &str,
        amount_cents: i64,
        service_fee_cents: i64,
    ) -> Result<CheckoutSession, ServiceError> {
        let body = json!({
            "mode": "payment",
            "amount": amount_cents,
            "currency": "usd",
            "success_url": format!("{}/orders?checkout=success", self.app_url),
            "cancel_url": format!("{}/orders?checkout=cancelled", self.app_url),
            "metadata": {
                "gig_id": gig_id,
                "buyer_id": buyer_id,
                "seller_id": seller_id,
                "package_type": package_type,
                "service_fee": service_fee_cents,
            },
        });

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Gateway(format!(
                "checkout session creation failed ({}): {}",
                status, payload
            )));
        }

        let session_id = payload["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Gateway("missing session id".to_string()))?
            .to_string();
        let checkout_url = payload["url"]
            .as_str()
            .ok_or_else(|| ServiceError::Gateway("missing checkout url".to_string()))?
            .to_string();

        Ok(CheckoutSession {
            session_id,
            checkout_url,
            amount: cents_to_units(amount_cents),
        })
    }

    /// Issue a gateway-side refund against the original payment intent.
    pub async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount_cents: i64,
    ) -> Result<RefundResult, ServiceError> {
        let body = json!({
            "payment_intent": payment_intent_id,
            "amount": amount_cents,
        });

        let response = self
            .client
            .post(format!("{}/refunds", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Gateway(format!(
                "refund failed ({}): {}",
                status, payload
            )));
        }

        Ok(RefundResult {
            refund_id: payload["id"].as_str().unwrap_or("unknown").to_string(),
            status: payload["status"].as_str().unwrap_or("pending").to_string(),
        })
    }

    /// Dispatch a payout to the rail selected by the withdrawal's method tag.
    pub async fn initiate_payout(
        &self,
        method: PayoutMethod,
        net_amount_cents: i64,
        reference: &str,
        account_details: &serde_json::Value,
    ) -> Result<PayoutResult, ServiceError> {
        let path = match method {
            PayoutMethod::BankTransfer => "payouts/bank",
            PayoutMethod::Paypal => "payouts/paypal",
            PayoutMethod::Stripe => "payouts/stripe",
        };

        let body = json!({
            "amount": net_amount_cents,
            "currency": "usd",
            "reference": reference,
            "destination": account_details,
        });

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Gateway(format!(
                "payout via {} failed ({}): {}",
                method.to_str(),
                status,
                payload
            )));
        }

        Ok(PayoutResult {
            external_reference: payload["id"].as_str().unwrap_or(reference).to_string(),
            status: payload["status"].as_str().unwrap_or("pending").to_string(),
        })
    }
}
