use std::time::Duration;

use reqwest::Client;

use crate::service::webhook::{parse_reply, ReplyAction, WebhookEventType, WebhookReply, WebhookRequest};
use crate::shared::error::WebhookError;
use crate::shared::ports::{PortFuture, WebhookPort};

/// POSTs the webhook envelope as JSON to one fixed tenant endpoint. No retry.
pub struct HttpWebhookClient {
    url: String,
    client: Client,
}

impl HttpWebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl WebhookPort for HttpWebhookClient {
    fn post(&self, request: WebhookRequest) -> PortFuture<Result<WebhookReply, WebhookError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move {
            let resp = client.post(&url).json(&request).send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            log::debug!(
                "[webhook] {} call_id={} status={} body_len={}",
                request.event_type.as_str(),
                request.call_id,
                status,
                body.len()
            );
            if !status.is_success() {
                return Err(WebhookError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            // call_ended replies carry nothing the call needs.
            if request.event_type == WebhookEventType::CallEnded && body.trim().is_empty() {
                return Ok(WebhookReply {
                    text: None,
                    action: ReplyAction::Speak,
                });
            }
            parse_reply(&body)
        })
    }
}
