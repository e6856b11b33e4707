use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook transport failed: {0}")]
    Transport(String),
    #[error("Webhook timed out")]
    Timeout,
    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid webhook reply: {0}")]
    InvalidReply(String),
}

impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidReply(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Telephony command {command} failed: {reason}")]
    CommandFailed {
        command: &'static str,
        reason: String,
    },
    #[error("Telephony command {command} timed out")]
    Timeout { command: &'static str },
    #[error("Call not found on platform")]
    CallNotFound,
}
