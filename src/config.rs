// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    // Payment gateway configuration
    pub gateway_secret_key: String,
    pub gateway_webhook_secret: String,
    pub gateway_base_url: String,
    // Ledger configuration
    pub platform_fee_percent: f64,
    pub withdrawal_fee_percent: f64,
    pub minimum_withdrawal_cents: i64,
    pub auto_release_days: i64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        // Payment gateway configuration (with defaults for local development)
        let gateway_secret_key = std::env::var("GATEWAY_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let gateway_webhook_secret = std::env::var("GATEWAY_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "test_webhook_secret".to_string());
        let gateway_base_url = std::env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());

        let platform_fee_percent = std::env::var("PLATFORM_FEE_PERCENT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(10.0);
        let withdrawal_fee_percent = std::env::var("WITHDRAWAL_FEE_PERCENT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(2.0);
        let minimum_withdrawal_cents = std::env::var("MINIMUM_WITHDRAWAL_CENTS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1_000);
        let auto_release_days = std::env::var("AUTO_RELEASE_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(14);

        Config {
            database_url,
            app_url,
            jwt_secret,
            port: 8000,
            gateway_secret_key,
            gateway_webhook_secret,
            gateway_base_url,
            platform_fee_percent,
            withdrawal_fee_percent,
            minimum_withdrawal_cents,
            auto_release_days,
        }
    }
}
