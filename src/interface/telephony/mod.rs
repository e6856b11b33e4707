//! Telephony platform adapters: the HTTP media-control bridge and a log-only dry run.

mod bridge;

pub use bridge::HttpTelephonyBridge;

use crate::shared::entities::CallId;
use crate::shared::ports::telephony::TelephonyResult;
use crate::shared::ports::{PortFuture, TelephonyPort};
use crate::shared::utils::mask_phone;

/// Used when no control URL is configured: every command is logged and acknowledged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyTelephony;

impl LogOnlyTelephony {
    pub fn new() -> Self {
        Self
    }

    fn ack(call_id: &CallId, command: &str, detail: String) -> PortFuture<TelephonyResult> {
        log::info!("[telephony dry-run] call_id={} {} {}", call_id, command, detail);
        Box::pin(async { Ok(()) })
    }
}

impl TelephonyPort for LogOnlyTelephony {
    fn answer(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "answer", String::new())
    }

    fn say(&self, call_id: CallId, text: String, voice: String) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "say", format!("voice={} text={}", voice, text))
    }

    fn start_recognition(&self, call_id: CallId, language: String) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "asr/start", format!("language={}", language))
    }

    fn stop_recognition(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "asr/stop", String::new())
    }

    fn start_forwarding(&self, call_id: CallId, phone_number: String) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "forward", format!("to={}", mask_phone(&phone_number)))
    }

    fn hangup(&self, call_id: CallId) -> PortFuture<TelephonyResult> {
        Self::ack(&call_id, "hangup", String::new())
    }
}
