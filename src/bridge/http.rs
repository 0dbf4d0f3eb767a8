//! HTTP bridge client
//!
//! Talks to a locally running bridge daemon over its REST API. The daemon
//! owns the actual WhatsApp session; this client only hits `POST /api/send`
//! and `GET /api/messages`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BridgeClient, BridgeError, BridgeResult, InboundMessage};

/// Bridge daemon connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Base URL of the bridge daemon's REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8066".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Bridge client over the daemon's REST API
#[derive(Debug)]
pub struct HttpBridge {
    settings: BridgeSettings,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    recipient: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl HttpBridge {
    /// Build a client for the daemon at `settings.base_url`.
    pub fn connect(settings: BridgeSettings) -> BridgeResult<Self> {
        if settings.base_url.trim().is_empty() {
            return Err(BridgeError::Setup("bridge base_url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| BridgeError::Setup(e.to_string()))?;
        info!(base_url = %settings.base_url, "bridge client ready");
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn request_error(e: reqwest::Error) -> BridgeError {
    if e.is_connect() {
        BridgeError::Connection(e.to_string())
    } else if e.is_timeout() {
        BridgeError::Api(format!("request timed out: {}", e))
    } else {
        BridgeError::Api(e.to_string())
    }
}

#[async_trait]
impl BridgeClient for HttpBridge {
    async fn send_message(&self, chat_jid: &str, text: &str) -> BridgeResult<()> {
        debug!(chat = %chat_jid, "sending message via bridge");
        let response = self
            .client
            .post(self.endpoint("api/send"))
            .json(&SendRequest {
                recipient: chat_jid,
                message: text,
            })
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(BridgeError::Api(format!(
                "send returned HTTP {}",
                response.status()
            )));
        }

        let body: SendResponse = response.json().await.map_err(request_error)?;
        if !body.success {
            return Err(BridgeError::SendFailed(
                body.error
                    .unwrap_or_else(|| "bridge rejected the message".to_string()),
            ));
        }
        Ok(())
    }

    async fn poll_messages(&self) -> BridgeResult<Vec<InboundMessage>> {
        let response = self
            .client
            .get(self.endpoint("api/messages"))
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(BridgeError::Api(format!(
                "poll returned HTTP {}",
                response.status()
            )));
        }

        response.json().await.map_err(request_error)
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        info!("disconnecting from bridge");
        let response = self
            .client
            .post(self.endpoint("api/disconnect"))
            .send()
            .await
            .map_err(request_error)?;
        if !response.status().is_success() {
            return Err(BridgeError::Api(format!(
                "disconnect returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
