use crate::types::ServerError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Runs `future` to completion, or fails with [`ServerError::Timeout`] once
/// `duration` elapses. `None` waits forever.
pub async fn timeout_result<F, T>(duration: Option<Duration>, future: F) -> Result<T, ServerError>
where
    F: Future<Output = Result<T, ServerError>>,
{
    if let Some(dur) = duration {
        match timeout(dur, future).await {
            Ok(result) => result,
            Err(_) => Err(ServerError::Timeout),
        }
    } else {
        future.await
    }
}
