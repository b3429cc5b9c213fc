use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};

use crate::domain::repository::OtpStore;
use crate::domain::types::OtpRecord;
use crate::error::AuthServiceError;
use crate::infra::bounded;

/// Delete the key only if it still holds the value the caller read.
const CONSUME_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

#[derive(Clone)]
pub struct RedisOtpStore {
    pub pool: Pool,
    pub timeout: Duration,
}

fn otp_key(email: &str) -> String {
    format!("otp:{}", email)
}

/// Kept past `expires_at` so verify can tell "expired" from "not found".
fn key_ttl_ms(record: &OtpRecord) -> u64 {
    u64::try_from(record.retention().num_milliseconds()).unwrap_or(0).max(1)
}

impl RedisOtpStore {
    async fn conn(&self) -> Result<deadpool_redis::Connection, AuthServiceError> {
        bounded(self.timeout, "redis pool get", self.pool.get()).await
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, record: &OtpRecord) -> Result<(), AuthServiceError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(record).context("serialize otp record")?;
        let (): () = bounded(
            self.timeout,
            "redis set otp",
            conn.pset_ex(otp_key(&record.email), value, key_ttl_ms(record)),
        )
        .await?;
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AuthServiceError> {
        let mut conn = self.conn().await?;
        let value: Option<String> =
            bounded(self.timeout, "redis get otp", conn.get(otp_key(email))).await?;
        value
            .map(|v| serde_json::from_str(&v).context("deserialize otp record"))
            .transpose()
            .map_err(AuthServiceError::from)
    }

    async fn consume(&self, record: &OtpRecord) -> Result<bool, AuthServiceError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(record).context("serialize otp record")?;
        let deleted: i64 = bounded(
            self.timeout,
            "redis consume otp",
            redis::cmd("EVAL")
                .arg(CONSUME_SCRIPT)
                .arg(1)
                .arg(otp_key(&record.email))
                .arg(value)
                .query_async(&mut conn),
        )
        .await?;
        Ok(deleted == 1)
    }

    async fn ping(&self) -> Result<(), AuthServiceError> {
        let mut conn = self.conn().await?;
        let _: String = bounded(
            self.timeout,
            "redis ping",
            redis::cmd("PING").query_async(&mut conn),
        )
        .await?;
        Ok(())
    }
}
