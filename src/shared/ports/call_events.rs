use crate::protocol::session::types::CallEvent;
use crate::shared::entities::{CallId, CallInfo};

/// Where inbound platform events are delivered.
pub trait CallEventSink: Send + Sync {
    /// A new inbound call is ringing. Returns false when the call is already known.
    fn call_alerting(&self, info: CallInfo) -> bool;
    /// An event for a live call. Returns false when no session owns the call.
    fn call_event(&self, call_id: &CallId, event: CallEvent) -> bool;
}
