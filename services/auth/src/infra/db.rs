use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter,
};

use digiinsta_auth_schema::sessions;

use crate::domain::repository::SessionRepository;
use crate::domain::types::SessionRecord;
use crate::error::AuthServiceError;
use crate::infra::bounded;

// ── Session repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

#[async_trait]
impl SessionRepository for DbSessionRepository {
    async fn insert(&self, session: &SessionRecord) -> Result<(), AuthServiceError> {
        let model = sessions::ActiveModel {
            session_token: Set(session.session_token.clone()),
            email: Set(session.email.clone()),
            created_at: Set(session.created_at),
            expires_at: Set(session.expires_at),
        };
        bounded(self.timeout, "insert session", model.insert(&self.db)).await?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, AuthServiceError> {
        let model = bounded(
            self.timeout,
            "find session",
            sessions::Entity::find_by_id(token.to_owned()).one(&self.db),
        )
        .await?;
        Ok(model.map(session_from_model))
    }

    async fn extend_if_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        // Single conditional UPDATE: a concurrent sweep either deleted the row
        // first (0 rows) or runs after the extension.
        let result = bounded(
            self.timeout,
            "extend session",
            sessions::Entity::update_many()
                .col_expr(sessions::Column::ExpiresAt, Expr::value(new_expires_at))
                .filter(sessions::Column::SessionToken.eq(token))
                .filter(sessions::Column::ExpiresAt.gt(now))
                .filter(sessions::Column::ExpiresAt.lte(new_expires_at))
                .exec(&self.db),
        )
        .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, token: &str) -> Result<bool, AuthServiceError> {
        let result = bounded(
            self.timeout,
            "delete session",
            sessions::Entity::delete_many()
                .filter(sessions::Column::SessionToken.eq(token))
                .exec(&self.db),
        )
        .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_if_expired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let result = bounded(
            self.timeout,
            "delete expired session",
            sessions::Entity::delete_many()
                .filter(sessions::Column::SessionToken.eq(token))
                .filter(sessions::Column::ExpiresAt.lte(now))
                .exec(&self.db),
        )
        .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let result = bounded(
            self.timeout,
            "sweep expired sessions",
            sessions::Entity::delete_many()
                .filter(sessions::Column::ExpiresAt.lt(now))
                .exec(&self.db),
        )
        .await?;
        Ok(result.rows_affected)
    }

    async fn ping(&self) -> Result<(), AuthServiceError> {
        bounded(self.timeout, "database ping", self.db.ping()).await
    }
}

fn session_from_model(model: sessions::Model) -> SessionRecord {
    SessionRecord {
        session_token: model.session_token,
        email: model.email,
        created_at: model.created_at,
        expires_at: model.expires_at,
    }
}
