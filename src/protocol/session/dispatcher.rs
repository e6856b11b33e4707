use std::sync::Arc;

use crate::protocol::session::coordinator::{CallSession, SessionDeps, SessionHandle};
use crate::protocol::session::registry::CallRegistry;
use crate::protocol::session::types::CallEvent;
use crate::shared::config::VoiceConfig;
use crate::shared::entities::{CallId, CallInfo, TenantSlug};
use crate::shared::ports::{CallEventSink, TelephonyPort, WebhookPort};

/// Entry point for platform events: starts a session per alerting call and routes
/// everything else to the owning session.
#[derive(Clone)]
pub struct CallDispatcher {
    deps: SessionDeps,
}

impl CallDispatcher {
    pub fn new(
        tenant: TenantSlug,
        telephony: Arc<dyn TelephonyPort>,
        webhook: Arc<dyn WebhookPort>,
        voice: Arc<VoiceConfig>,
    ) -> Self {
        Self {
            deps: SessionDeps {
                tenant,
                telephony,
                webhook,
                voice,
                registry: CallRegistry::new(),
            },
        }
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.deps.registry
    }

    pub fn on_call_alerting(&self, info: CallInfo) -> Option<SessionHandle> {
        let call_id = info.call_id.clone();
        let handle = CallSession::spawn(info, self.deps.clone());
        if handle.is_none() {
            log::warn!("[dispatcher] duplicate alerting for live call_id={}", call_id);
        }
        handle
    }

    pub fn on_event(&self, call_id: &CallId, event: CallEvent) -> bool {
        let name = event.name();
        let delivered = self.deps.registry.dispatch(call_id, event);
        if !delivered {
            log::debug!(
                "[dispatcher] dropped {} for unknown call_id={}",
                name,
                call_id
            );
        }
        delivered
    }
}

impl CallEventSink for CallDispatcher {
    fn call_alerting(&self, info: CallInfo) -> bool {
        self.on_call_alerting(info).is_some()
    }

    fn call_event(&self, call_id: &CallId, event: CallEvent) -> bool {
        self.on_event(call_id, event)
    }
}
