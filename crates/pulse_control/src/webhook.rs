//! Webhook client — posts a trigger message to the agent-runner
//! (spec.md §6's "External interfaces" webhook contract). Errors are
//! logged and counted as `trigger_failure`; there is no retry within the
//! same tick (§5).

use pulse_core::config::OpenclawConfig;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TriggerPayload {
    pub message: String,
    pub name: String,
    #[serde(rename = "wakeMode")]
    pub wake_mode: String,
    pub deliver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug)]
pub struct WebhookResult {
    pub success: bool,
    pub run_id: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
}

pub struct WebhookClient {
    client: Client,
    config: OpenclawConfig,
}

impl WebhookClient {
    pub fn new(config: OpenclawConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(TIMEOUT_SECS)).build()?;
        Ok(Self { client, config })
    }

    pub fn build_payload(&self, reason: &str, top_drive: &str, top_drive_pressure: f32, sensor_context: &str) -> TriggerPayload {
        let message = format!(
            "{prefix} Self-initiated turn.\n\
             Trigger reason: {reason}\n\
             Top drive: {top_drive} (pressure: {top_drive_pressure:.2})\n\
             Suggested focus: {sensor_context}\n\
             Check if there's something worth doing. If nothing needs attention, reply HEARTBEAT_OK.",
            prefix = self.config.message_prefix,
        );
        let isolated = matches!(self.config.session_mode, pulse_core::config::SessionMode::Isolated);
        TriggerPayload {
            message,
            name: "pulse".to_string(),
            wake_mode: "now".to_string(),
            deliver: self.config.deliver.clone(),
            isolated: isolated.then_some(true),
            model: isolated.then(|| self.config.isolated_model.clone()).flatten(),
        }
    }

    pub async fn send(&self, payload: &TriggerPayload) -> WebhookResult {
        let mut request = self.client.post(&self.config.webhook_url).json(payload);
        if let Some(token) = &self.config.webhook_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() == 202 {
                    let run_id = response
                        .json::<serde_json::Value>()
                        .await
                        .ok()
                        .and_then(|v| v.get("runId").and_then(|r| r.as_str()).map(str::to_string));
                    WebhookResult {
                        success: true,
                        run_id,
                        status: Some(status.as_u16()),
                        error: None,
                    }
                } else {
                    tracing::warn!(status = status.as_u16(), "webhook returned non-202 status");
                    WebhookResult {
                        success: false,
                        run_id: None,
                        status: Some(status.as_u16()),
                        error: Some(format!("unexpected status {}", status.as_u16())),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "webhook request failed");
                WebhookResult {
                    success: false,
                    run_id: None,
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
