pub mod background_jobs;
pub mod error;
pub mod escrow_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_provider;
pub mod withdrawal_service;
