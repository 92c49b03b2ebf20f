// src/services/gateway.rs

//! Push gateway client.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::error::{AppError, Result};
use crate::models::{GatewayConfig, GatewayResponse, PushMessage};
use crate::utils::http::create_async_client;

/// Outbound push-messaging transport.
///
/// `Err` means the attempt failed at the transport level and may be
/// retried. An application-level rejection comes back as `Ok` with
/// [`GatewayResponse::application_error`] set.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<GatewayResponse>;
}

/// JSON-over-HTTP gateway using a server key.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PushGateway for HttpGateway {
    async fn send(&self, message: &PushMessage) -> Result<GatewayResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("key={}", self.api_key))
            .json(message)
            .send()
            .await
            .map_err(AppError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(AppError::transport)?;

        match serde_json::from_slice::<GatewayResponse>(&body) {
            Ok(decoded) if status.is_success() || decoded.application_error().is_some() => Ok(decoded),
            Ok(_) => Err(AppError::transport(format!("gateway answered {status}"))),
            Err(e) => Err(AppError::transport(format!(
                "gateway answered {status} with an unreadable body: {e}"
            ))),
        }
    }
}
