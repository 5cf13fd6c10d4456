// models/notificationmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>, // None = broadcast
    pub kind: String,
    pub order_id: Option<Uuid>,
    pub payload: Option<serde_json::Value>,
    pub message: String,
    pub read: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}
