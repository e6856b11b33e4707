use crate::service::webhook::{WebhookReply, WebhookRequest};
use crate::shared::error::WebhookError;

use super::PortFuture;

pub trait WebhookPort: Send + Sync {
    fn post(&self, request: WebhookRequest) -> PortFuture<Result<WebhookReply, WebhookError>>;
}
