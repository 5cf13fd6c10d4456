mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use service::{
    escrow_service::EscrowService,
    notification_service::NotificationService,
    order_service::OrderService,
    payment_provider::PaymentProviderService,
    withdrawal_service::WithdrawalService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub payment_provider: Arc<PaymentProviderService>,
    pub notification_service: Arc<NotificationService>,
    pub escrow_service: Arc<EscrowService>,
    pub order_service: Arc<OrderService>,
    pub withdrawal_service: Arc<WithdrawalService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let payment_provider = Arc::new(PaymentProviderService::new(&config));
        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));

        let escrow_service = Arc::new(EscrowService::new(
            db_client_arc.clone(),
            notification_service.clone(),
            payment_provider.clone(),
            config.platform_fee_percent,
        ));

        let order_service = Arc::new(OrderService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
        ));

        let withdrawal_service = Arc::new(WithdrawalService::new(
            db_client_arc.clone(),
            notification_service.clone(),
            payment_provider.clone(),
            config.withdrawal_fee_percent,
            config.minimum_withdrawal_cents,
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            payment_provider,
            notification_service,
            escrow_service,
            order_service,
            withdrawal_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");

            let max_connections = 20;

            // Background task to monitor pool health
            let pool_for_monitoring = pool.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
                loop {
                    interval.tick().await;
                    let size = pool_for_monitoring.size();
                    let idle = pool_for_monitoring.num_idle();
                    tracing::debug!(
                        "Pool status - active: {}, idle: {}, total: {}",
                        size - idle as u32,
                        idle,
                        size
                    );

                    if size >= max_connections * 8 / 10 {
                        tracing::warn!(
                            "Connection pool at 80% capacity! Consider increasing max_connections"
                        );
                    }
                }
            });

            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let allowed_origins = vec![
        config.app_url.parse::<HeaderValue>().unwrap(),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    println!("🚀 Server is running on http://localhost:{}", config.port);

    // Start background jobs
    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_auto_release_job(app_state_clone).await;
    });

    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_stale_withdrawal_sweep(app_state_clone).await;
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
