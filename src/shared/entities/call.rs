use chrono::{DateTime, Utc};

use crate::shared::entities::identifiers::{CallId, SessionId};

/// The transient call attributes the controller needs (caller id + platform call id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub call_id: CallId,
    pub caller_id: Option<String>,
}

impl CallInfo {
    pub fn new(call_id: CallId, caller_id: Option<String>) -> Self {
        let caller_id = caller_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { call_id, caller_id }
    }
}

/// Why a call session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Caller or platform disconnected the call.
    Disconnected,
    /// The platform reported a failed call.
    Failed(String),
    /// The session hung up itself (apology + hangup path).
    Hangup,
    /// Forwarded to an operator; the bot leg is done.
    Transferred,
}

/// Summary kept for the final log line of a session.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub info: CallInfo,
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub turns: u32,
}

impl CallRecord {
    pub fn new(info: CallInfo) -> Self {
        Self {
            info,
            session_id: SessionId::new(),
            started_at: Utc::now(),
            turns: 0,
        }
    }

    pub fn duration_sec(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}
