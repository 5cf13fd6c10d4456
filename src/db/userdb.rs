// db/userdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, Error> {
        if let Some(user_id) = user_id {
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, role, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
        } else if let Some(email) = email {
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, role, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
        } else {
            Ok(None)
        }
    }
}
