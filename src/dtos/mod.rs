pub mod orderdtos;
pub mod paymentdtos;
pub mod walletdtos;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Standard success envelope, mirrored by ErrorResponse for failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
