//! Timeout defaults and an async deadline wrapper.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Default timeout for establishing a connection
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time to wait for the response to a request
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default passive poll interval for server-pushed notifications
pub const ASYNC_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Run `fut`, failing with [`ProtocolError::Timeout`] once `duration` elapses
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn test_with_timeout_completes() {
        let result = with_timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
