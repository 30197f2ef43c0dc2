use std::sync::Mutex;

use async_trait::async_trait;
use skynet_core::config::DeviceChannelConfig;
use skynet_protocol::dispatch::WakeSignal;
use tracing::{info, warn};

use crate::{channel::Channel, error::ChannelError, types::ChannelStatus};

/// Outbound Channels (C8): a one-shot control-plane push to the edge
/// device over an authenticated HTTP endpoint. The device, on receipt,
/// opens a new session against the session gateway.
pub struct DeviceChannel {
    http: reqwest::Client,
    endpoint: Option<String>,
    auth_token: Option<String>,
    status: Mutex<ChannelStatus>,
}

impl DeviceChannel {
    pub fn new(config: &DeviceChannelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.wake_endpoint.clone(),
            auth_token: config.auth_token.clone(),
            status: Mutex::new(ChannelStatus::Disconnected),
        }
    }
}

#[async_trait]
impl Channel for DeviceChannel {
    fn name(&self) -> &str {
        "device"
    }

    async fn connect(&self) -> Result<(), ChannelError> {
        if self.endpoint.is_none() {
            let msg = "no wake_endpoint configured".to_string();
            *self.status.lock().unwrap() = ChannelStatus::Error(msg.clone());
            return Err(ChannelError::ConfigError(msg));
        }
        *self.status.lock().unwrap() = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChannelError> {
        *self.status.lock().unwrap() = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, signal: &WakeSignal) -> Result<(), ChannelError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| ChannelError::ConfigError("no wake_endpoint configured".to_string()))?;

        let mut req = self.http.post(endpoint).json(signal);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(user_id = %signal.user_id, %status, "device wake push rejected");
            return Err(ChannelError::SendFailed(format!("device responded {status}")));
        }

        info!(user_id = %signal.user_id, reason = ?signal.reason, "wake signal delivered to device");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.lock().unwrap().clone()
    }
}
