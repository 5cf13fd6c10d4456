// service/withdrawal_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        walletdb::WalletExt,
        withdrawaldb::{WithdrawalAttempt, WithdrawalExt},
    },
    mail::mails,
    models::walletmodels::{PayoutMethod, WithdrawalRequest},
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        payment_provider::PaymentProviderService,
    },
    utils::currency::percentage_fee,
};

#[derive(Debug, Clone)]
pub struct WithdrawalService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
    payment_provider: Arc<PaymentProviderService>,
    fee_percent: f64,
    minimum_cents: i64,
}

impl WithdrawalService {
    pub fn new(
        db_client: Arc<DBClient>,
        notification_service: Arc<NotificationService>,
        payment_provider: Arc<PaymentProviderService>,
        fee_percent: f64,
        minimum_cents: i64,
    ) -> Self {
        Self {
            db_client,
            notification_service,
            payment_provider,
            fee_percent,
            minimum_cents,
        }
    }

    /// Record a withdrawal intent and debit the wallet. The balance check and
    /// the debit share one transaction and one wallet row lock, so the check
    /// holds unconditionally even under concurrent identical requests.
    pub async fn request(
        &self,
        user_id: Uuid,
        amount: i64,
        method: PayoutMethod,
        account_details: serde_json::Value,
    ) -> Result<WithdrawalRequest, ServiceError> {
        if amount < self.minimum_cents {
            return Err(ServiceError::BelowMinimum {
                minimum: self.minimum_cents,
            });
        }

        self.db_client.ensure_wallet(user_id).await?;

        let fee = percentage_fee(amount, self.fee_percent);
        let attempt = self
            .db_client
            .create_withdrawal_request(user_id, amount, fee, method, account_details)
            .await?;

        match attempt {
            WithdrawalAttempt::Created(request) => {
                tracing::info!(
                    "Withdrawal {} requested: user {}, {} cents gross, {} cents net",
                    request.reference,
                    user_id,
                    request.amount,
                    request.net_amount
                );
                let _ = self
                    .notification_service
                    .notify_withdrawal_update(&request)
                    .await;
                Ok(request)
            }
            WithdrawalAttempt::InsufficientBalance {
                required,
                available,
            } => Err(ServiceError::InsufficientBalance {
                required,
                available,
            }),
        }
    }

    /// Admin decision on a pending request. Approval dispatches the payout to
    /// the rail named by the request's method; a rail failure flips the
    /// request to FAILED and restores the debited balance. Rejection restores
    /// the balance immediately.
    pub async fn process(
        &self,
        request_id: Uuid,
        approve: bool,
        notes: Option<String>,
        seller_email: Option<&str>,
    ) -> Result<WithdrawalRequest, ServiceError> {
        if !approve {
            let rejected = self
                .db_client
                .reject_withdrawal(request_id, notes.unwrap_or_else(|| "Rejected".to_string()))
                .await?
                .ok_or_else(|| {
                    ServiceError::AlreadyProcessed(format!(
                        "withdrawal {} is not pending",
                        request_id
                    ))
                })?;

            let _ = self
                .notification_service
                .notify_withdrawal_update(&rejected)
                .await;
            return Ok(rejected);
        }

        let processing = self
            .db_client
            .mark_withdrawal_processing(request_id)
            .await?
            .ok_or_else(|| {
                ServiceError::AlreadyProcessed(format!(
                    "withdrawal {} is not pending",
                    request_id
                ))
            })?;

        let payout = self
            .payment_provider
            .initiate_payout(
                processing.method,
                processing.net_amount,
                &processing.reference,
                &processing.account_details,
            )
            .await;

        let request = match payout {
            Ok(result) => {
                let completed = self
                    .db_client
                    .complete_withdrawal(request_id, result.external_reference)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::AlreadyProcessed(format!(
                            "withdrawal {} left processing concurrently",
                            request_id
                        ))
                    })?;

                if let Some(email) = seller_email {
                    if let Err(e) = mails::send_withdrawal_completed_email(
                        email,
                        &completed.reference,
                        completed.net_amount,
                    )
                    .await
                    {
                        tracing::warn!("Withdrawal email failed for {}: {}", email, e);
                    }
                }

                completed
            }
            Err(e) => {
                tracing::error!("Payout failed for withdrawal {}: {}", request_id, e);

                // The failed payout must not eat the seller's balance.
                self.db_client
                    .fail_withdrawal(request_id, format!("Payout failed: {}", e))
                    .await?
                    .ok_or_else(|| {
                        ServiceError::AlreadyProcessed(format!(
                            "withdrawal {} left processing concurrently",
                            request_id
                        ))
                    })?
            }
        };

        let _ = self
            .notification_service
            .notify_withdrawal_update(&request)
            .await;

        Ok(request)
    }

    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<crate::models::walletmodels::WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, ServiceError> {
        Ok(self
            .db_client
            .get_withdrawal_requests(user_id, status, limit, offset)
            .await?)
    }
}
