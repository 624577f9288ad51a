use crate::error::ConfigError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lazily built `reqwest::Client`; clones share the same instance.
#[derive(Debug, Clone)]
pub struct SharedHttpClient {
    cell: Arc<OnceCell<Client>>,
    timeout: Duration,
}

impl Default for SharedHttpClient {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

impl SharedHttpClient {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            timeout,
        }
    }

    pub async fn get(&self) -> Result<&Client, ConfigError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!(timeout_secs = self.timeout.as_secs(), "building http client");
                Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(|error| ConfigError::HttpClient(error.to_string()))
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::SharedHttpClient;

    #[tokio::test]
    async fn client_is_built_once_and_shared_between_clones() {
        let shared = SharedHttpClient::default();
        let clone = shared.clone();
        assert!(!shared.is_initialized());

        let first = shared.get().await.expect("client builds") as *const _;
        assert!(clone.is_initialized());
        let second = clone.get().await.expect("client builds") as *const _;
        assert_eq!(first, second);
    }
}
