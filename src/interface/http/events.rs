use serde::Deserialize;

use crate::protocol::session::types::CallEvent;
use crate::shared::entities::{CallId, CallInfo};

/// JSON body of `POST /events`.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub call_id: String,
    pub event: String,
    #[serde(default)]
    pub caller_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug)]
pub enum InboundEvent {
    Alerting(CallInfo),
    Call(CallId, CallEvent),
}

fn reason_or_unknown(reason: Option<String>) -> String {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Maps a platform event name (snake_case or the platform's dotted `ASR.Result` form)
/// to a session input.
pub fn to_inbound(payload: EventPayload) -> Result<InboundEvent, String> {
    let call_id = CallId::new(payload.call_id).map_err(|err| err.to_string())?;
    let name = payload.event.trim().to_ascii_lowercase().replace('.', "_");
    let event = match name.as_str() {
        "call_alerting" | "callalerting" | "appevents_callalerting" => {
            return Ok(InboundEvent::Alerting(CallInfo::new(
                call_id,
                payload.caller_id,
            )));
        }
        "connected" | "callevents_connected" => CallEvent::Connected,
        "playback_finished" | "playbackfinished" | "callevents_playbackfinished" => {
            CallEvent::PlaybackFinished
        }
        "asr_capture_started" | "asr_capturestarted" => CallEvent::RecognitionStarted,
        "asr_result" => CallEvent::RecognitionResult {
            text: payload.text.unwrap_or_default(),
            confidence: payload.confidence.filter(|c| c.is_finite()),
        },
        "asr_error" => CallEvent::RecognitionError {
            reason: reason_or_unknown(payload.reason),
        },
        "forwarding_failed" => CallEvent::ForwardingFailed {
            reason: reason_or_unknown(payload.reason),
        },
        "disconnected" | "callevents_disconnected" => CallEvent::Disconnected,
        "failed" | "callevents_failed" => CallEvent::Failed {
            reason: reason_or_unknown(payload.reason),
        },
        other => return Err(format!("unknown event {:?}", other)),
    };
    Ok(InboundEvent::Call(call_id, event))
}
