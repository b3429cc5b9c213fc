use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use deadpool_redis::redis;
use uuid::Uuid;

use crate::domain::repository::RateLimitStore;
use crate::domain::types::WindowHit;
use crate::error::AuthServiceError;
use crate::infra::bounded;

/// Sliding log in a sorted set scored by request time (ms). Runs atomically
/// on the Redis server, so concurrent requests never overshoot the limit.
const SLIDING_WINDOW_SCRIPT: &str = r"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]
redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
redis.call('ZADD', key, now, member)
local count = redis.call('ZCARD', key)
if count > limit then
    redis.call('ZREM', key, member)
end
redis.call('PEXPIRE', key, window)
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest_score = -1
if oldest[2] then
    oldest_score = tonumber(oldest[2])
end
return {count, oldest_score}
";

#[derive(Clone)]
pub struct RedisRateLimitStore {
    pub pool: Pool,
    pub timeout: Duration,
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowHit, AuthServiceError> {
        let mut conn = bounded(self.timeout, "rate limit pool get", self.pool.get()).await?;
        let member = format!("{now_ms}-{}", Uuid::new_v4());
        let (count, oldest): (i64, i64) = bounded(
            self.timeout,
            "rate limit hit",
            redis::cmd("EVAL")
                .arg(SLIDING_WINDOW_SCRIPT)
                .arg(1)
                .arg(key)
                .arg(now_ms)
                .arg(window_ms)
                .arg(limit)
                .arg(member)
                .query_async(&mut conn),
        )
        .await?;
        Ok(WindowHit {
            count: u64::try_from(count).unwrap_or(0),
            oldest_ms: (oldest >= 0).then_some(oldest),
        })
    }
}
