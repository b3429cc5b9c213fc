pub mod cache;
pub mod db;
pub mod mailer;
pub mod rate_limit;

use std::future::Future;
use std::time::Duration;

use anyhow::Context as _;

use crate::error::AuthServiceError;

/// Run a store call under a deadline; overruns surface as internal errors.
pub(crate) async fn bounded<T, E, F>(
    limit: Duration,
    what: &'static str,
    fut: F,
) -> Result<T, AuthServiceError>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let result = tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow::anyhow!("{what}: timed out after {}ms", limit.as_millis()))?;
    Ok(result.context(what)?)
}
