//! Webhook envelope for the tenant AI backend: one POST per lifecycle event
//! (`call_started`, `speech_recognized`, `call_ended`) and the reply it answers with.

mod reply;

use serde::Serialize;

use crate::shared::entities::{CallId, TenantSlug};

pub use reply::{parse_reply, ReplyAction, WebhookReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CallStarted,
    SpeechRecognized,
    CallEnded,
}

impl WebhookEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallStarted => "call_started",
            Self::SpeechRecognized => "speech_recognized",
            Self::CallEnded => "call_ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookRequest {
    pub event_type: WebhookEventType,
    pub call_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub tenant_slug: String,
}

impl WebhookRequest {
    pub fn call_started(call_id: &CallId, phone_number: Option<&str>, tenant: &TenantSlug) -> Self {
        Self {
            event_type: WebhookEventType::CallStarted,
            call_id: call_id.to_string(),
            phone_number: phone_number.map(str::to_string),
            text: None,
            tenant_slug: tenant.to_string(),
        }
    }

    pub fn speech_recognized(call_id: &CallId, text: &str, tenant: &TenantSlug) -> Self {
        Self {
            event_type: WebhookEventType::SpeechRecognized,
            call_id: call_id.to_string(),
            phone_number: None,
            text: Some(text.to_string()),
            tenant_slug: tenant.to_string(),
        }
    }

    pub fn call_ended(call_id: &CallId, tenant: &TenantSlug) -> Self {
        Self {
            event_type: WebhookEventType::CallEnded,
            call_id: call_id.to_string(),
            phone_number: None,
            text: None,
            tenant_slug: tenant.to_string(),
        }
    }
}
