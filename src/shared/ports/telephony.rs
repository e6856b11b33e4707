use crate::shared::entities::CallId;
use crate::shared::error::TelephonyError;

use super::PortFuture;

pub type TelephonyResult = Result<(), TelephonyError>;

/// Commands the call controller issues to the telephony platform.
///
/// Everything here is fire-and-acknowledge: playback completion, recognition results and
/// forwarding failures come back later as inbound call events, not as return values.
pub trait TelephonyPort: Send + Sync {
    fn answer(&self, call_id: CallId) -> PortFuture<TelephonyResult>;
    fn say(&self, call_id: CallId, text: String, voice: String) -> PortFuture<TelephonyResult>;
    fn start_recognition(&self, call_id: CallId, language: String)
        -> PortFuture<TelephonyResult>;
    fn stop_recognition(&self, call_id: CallId) -> PortFuture<TelephonyResult>;
    /// Redirects the live call leg to a PSTN number.
    fn start_forwarding(&self, call_id: CallId, phone_number: String)
        -> PortFuture<TelephonyResult>;
    fn hangup(&self, call_id: CallId) -> PortFuture<TelephonyResult>;
}
