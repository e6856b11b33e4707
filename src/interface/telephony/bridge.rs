use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::shared::entities::CallId;
use crate::shared::error::TelephonyError;
use crate::shared::ports::telephony::TelephonyResult;
use crate::shared::ports::{PortFuture, TelephonyPort};

/// Sends call-control commands to the platform as
/// `POST {base_url}/calls/{call_id}/{command}` with a JSON body.
pub struct HttpTelephonyBridge {
    base_url: String,
    client: Client,
}

impl HttpTelephonyBridge {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn command_url(&self, call_id: &CallId, command: &str) -> String {
        format!("{}/calls/{}/{}", self.base_url, call_id, command)
    }

    fn send(&self, call_id: CallId, command: &'static str, body: Value) -> PortFuture<TelephonyResult> {
        let url = self.command_url(&call_id, command);
        let client = self.client.clone();
        Box::pin(async move {
            let resp = client.post(&url).json(&body).send().await.map_err(|err| {
                if err.is_timeout() {
                    TelephonyError::Timeout { command }
                } else {
                    TelephonyError::CommandFailed {
                        command,
                        reason: err.to_string(),
                    }
                }
            })?;
            let status = resp.status();
            if status.is_success() {
                log::debug!("[telephony] call_id={} {} ok", call_id, command);
                return Ok(());
            }
            if status == StatusCode::NOT_FOUND {
                return Err(TelephonyError::CallNotFound);
            }
            let body = resp.text().await.unwrap_or_default();
            Err(TelephonyError::CommandFailed {
                command,
                reason: format!("{} {}", status, body),
            })
        })
    }
}

impl TelephonyPort for HttpTelephonyBridge {
    fn answer(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        self.send(call_id, "answer", json!({}))
    }

    fn say(&self, call_id: CallId, text: String, voice: String) -> PortFuture<TelephonyResult> {
        self.send(call_id, "say", json!({ "text": text, "voice": voice }))
    }

    fn start_recognition(&self, call_id: CallId, language: String) -> PortFuture<TelephonyResult> {
        self.send(call_id, "asr/start", json!({ "language": language }))
    }

    fn stop_recognition(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        self.send(call_id, "asr/stop", json!({}))
    }

    fn start_forwarding(&self, call_id: CallId, phone_number: String) -> PortFuture<TelephonyResult> {
        self.send(
            call_id,
            "forward",
            json!({ "phone_number": phone_number, "scheme": "pstn" }),
        )
    }

    fn hangup(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        self.send(call_id, "hangup", json!({}))
    }
}
