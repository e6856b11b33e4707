use serde_json::{Map, Value};

use crate::shared::error::WebhookError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    Speak,
    Transfer { phone_number: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub text: Option<String>,
    pub action: ReplyAction,
}

impl WebhookReply {
    pub fn speak(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            action: ReplyAction::Speak,
        }
    }

    pub fn text_or(&self, fallback: &str) -> String {
        self.text.clone().unwrap_or_else(|| fallback.to_string())
    }

    pub fn transfer_number(&self) -> Option<&str> {
        match &self.action {
            ReplyAction::Transfer { phone_number } => Some(phone_number.as_str()),
            ReplyAction::Speak => None,
        }
    }
}

/// Parses a webhook reply body.
///
/// Serverless gateways wrap the function output as `{"statusCode": .., "body": "<json>"}`,
/// so a string `body` is decoded a second time. An object `body` is used as is, and a
/// reply without `body` is its own payload. An envelope `statusCode` of 400 or above is an
/// error even when the HTTP status was 200.
pub fn parse_reply(raw: &str) -> Result<WebhookReply, WebhookError> {
    let outer: Value = serde_json::from_str(raw.trim())?;

    if let Some(status) = outer.get("statusCode").and_then(Value::as_u64) {
        if status >= 400 {
            let body = match outer.get("body") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Err(WebhookError::Status {
                status: u16::try_from(status).unwrap_or(500),
                body,
            });
        }
    }

    let inner = match outer.get("body") {
        Some(Value::String(s)) => Some(serde_json::from_str::<Value>(s)?),
        Some(v @ Value::Object(_)) => Some(v.clone()),
        _ => None,
    };
    let payload = inner.unwrap_or(outer);
    let Value::Object(fields) = payload else {
        return Err(WebhookError::InvalidReply(
            "reply payload is not a JSON object".to_string(),
        ));
    };

    let text = non_empty_str(&fields, "text").or_else(|| non_empty_str(&fields, "response"));
    let action = match non_empty_str(&fields, "action") {
        Some(action) if action.eq_ignore_ascii_case("transfer") => {
            match non_empty_str(&fields, "phone_number") {
                Some(phone_number) => ReplyAction::Transfer { phone_number },
                None => {
                    log::warn!("[webhook] transfer requested without phone_number, speaking only");
                    ReplyAction::Speak
                }
            }
        }
        _ => ReplyAction::Speak,
    };

    Ok(WebhookReply { text, action })
}

fn non_empty_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
