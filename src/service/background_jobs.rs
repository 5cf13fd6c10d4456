// service/background_jobs.rs
use std::sync::Arc;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration};

use crate::{
    db::{escrowdb::EscrowExt, withdrawaldb::WithdrawalExt},
    models::walletmodels::WithdrawalRequest,
    AppState,
};

/// Release escrows that have been held longer than the configured grace
/// period, on the buyer's behalf.
pub async fn start_auto_release_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600)); // Run every hour

    loop {
        interval.tick().await;

        tracing::info!("Running escrow auto-release job at {}", Utc::now());

        let cutoff = Utc::now() - ChronoDuration::days(app_state.env.auto_release_days);
        let escrows = match app_state.db_client.get_held_escrows_before(cutoff).await {
            Ok(escrows) => escrows,
            Err(e) => {
                tracing::error!("Auto-release job failed to fetch escrows: {}", e);
                continue;
            }
        };

        let mut released = 0;
        for escrow in escrows {
            let escrow_id = escrow.id;
            match app_state.escrow_service.auto_release(escrow).await {
                Ok(_) => released += 1,
                // A buyer release racing the job is expected; anything else is not.
                Err(crate::service::error::ServiceError::AlreadyProcessed(_)) => {}
                Err(e) => tracing::error!("Auto-release of escrow {} failed: {}", escrow_id, e),
            }
        }

        tracing::info!("Auto-release job completed: {} escrows released", released);
    }
}

/// Flag withdrawal requests stuck in PROCESSING so an admin can reconcile
/// them against the payout rail. No state is changed silently.
pub async fn start_stale_withdrawal_sweep(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(21600)); // Run every 6 hours

    loop {
        interval.tick().await;

        tracing::info!("Running stale withdrawal sweep at {}", Utc::now());

        let cutoff = Utc::now() - ChronoDuration::hours(24);
        match app_state
            .db_client
            .get_stale_processing_withdrawals(cutoff)
            .await
        {
            Ok(stale) if stale.is_empty() => {}
            Ok(stale) => {
                tracing::warn!("{} withdrawal(s) stuck in processing", stale.len());
                for request in &stale {
                    if app_state
                        .notification_service
                        .notify_admins(stale_withdrawal_alert(request))
                        .await
                        .is_ok()
                    {
                        // Flagged requests are skipped by the next sweep, so
                        // admins hear about each stuck request once.
                        if let Err(e) =
                            app_state.db_client.flag_stale_withdrawal(request.id).await
                        {
                            tracing::error!(
                                "Failed to flag withdrawal {}: {}",
                                request.reference,
                                e
                            );
                        }
                    }
                }
            }
            Err(e) => tracing::error!("Stale withdrawal sweep failed: {}", e),
        }
    }
}

fn stale_withdrawal_alert(request: &WithdrawalRequest) -> String {
    format!(
        "Withdrawal {} has been processing since {:?} - reconcile with the payout provider",
        request.reference, request.created_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::walletmodels::{PayoutMethod, WithdrawalStatus};
    use uuid::Uuid;

    #[test]
    fn test_stale_withdrawal_alert_names_the_request() {
        let request = WithdrawalRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            amount: 10_000,
            fee: 200,
            net_amount: 9_800,
            method: PayoutMethod::Paypal,
            account_details: serde_json::json!({}),
            status: WithdrawalStatus::Processing,
            reference: "GMK_STUCK".to_string(),
            external_reference: None,
            admin_notes: None,
            created_at: None,
            processed_at: None,
            flagged_at: None,
        };

        assert!(stale_withdrawal_alert(&request).contains("GMK_STUCK"));
    }
}
