// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::GatewayConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client is cheap to clone and safe to share between delivery tasks.
pub fn create_async_client(config: &GatewayConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_default_config() {
        assert!(create_async_client(&GatewayConfig::default()).is_ok());
    }
}
