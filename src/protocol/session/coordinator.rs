use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::protocol::session::registry::CallRegistry;
use crate::protocol::session::state_machine::CallStateMachine;
use crate::protocol::session::types::{AfterPlayback, CallEffect, CallEvent, CallState};
use crate::service::webhook::{WebhookReply, WebhookRequest};
use crate::shared::config::VoiceConfig;
use crate::shared::entities::{CallId, CallInfo, CallRecord, EndReason, SessionId, TenantSlug};
use crate::shared::error::WebhookError;
use crate::shared::ports::{TelephonyPort, WebhookPort};
use crate::shared::utils::{mask_phone, mask_pii};

/// Everything a call session needs from the outside. Cheap to clone (all shared handles).
#[derive(Clone)]
pub struct SessionDeps {
    pub tenant: TenantSlug,
    pub telephony: Arc<dyn TelephonyPort>,
    pub webhook: Arc<dyn WebhookPort>,
    pub voice: Arc<VoiceConfig>,
    pub registry: CallRegistry,
}

#[derive(Clone)]
pub struct SessionHandle {
    pub call_id: CallId,
    pub session_id: SessionId,
    pub tx_in: UnboundedSender<CallEvent>,
}

/// One inbound call, owned by a single tokio task.
///
/// The task receives platform events and webhook completions on one channel and handles
/// them one at a time, so a second recognition session or a duplicate AI request cannot be
/// started while a turn is in flight. Transitions come from [`CallStateMachine`]; this type
/// only carries out the resulting effects.
pub struct CallSession {
    record: CallRecord,
    machine: CallStateMachine,
    deps: SessionDeps,
    tx_in: UnboundedSender<CallEvent>,
    rx_in: UnboundedReceiver<CallEvent>,
    recognition_active: bool,
    end_reason: Option<EndReason>,
}

type ReplyEvent = fn(Result<WebhookReply, WebhookError>) -> CallEvent;

impl CallSession {
    /// Registers the call and spawns its task. Returns `None` when the call id is already live.
    pub fn spawn(info: CallInfo, deps: SessionDeps) -> Option<SessionHandle> {
        let (tx_in, rx_in) = unbounded_channel();
        if !deps
            .registry
            .insert_if_absent(info.call_id.clone(), tx_in.clone())
        {
            return None;
        }
        let record = CallRecord::new(info);
        let handle = SessionHandle {
            call_id: record.info.call_id.clone(),
            session_id: record.session_id,
            tx_in: tx_in.clone(),
        };
        let session = Self {
            record,
            machine: CallStateMachine::new(),
            deps,
            tx_in,
            rx_in,
            recognition_active: false,
            end_reason: None,
        };
        tokio::spawn(session.run());
        Some(handle)
    }

    fn call_id(&self) -> &CallId {
        &self.record.info.call_id
    }

    async fn run(mut self) {
        let caller = self
            .record
            .info
            .caller_id
            .as_deref()
            .map(mask_phone)
            .unwrap_or_else(|| "<unknown>".to_string());
        log::info!(
            "[call {}] incoming call from {} tenant={} session={}",
            self.call_id(),
            caller,
            self.deps.tenant,
            self.record.session_id
        );

        if let Err(err) = self.deps.telephony.answer(self.call_id().clone()).await {
            log::warn!("[call {}] answer failed: {}", self.call_id(), err);
            let _ = self.tx_in.send(CallEvent::Failed {
                reason: format!("answer failed: {err}"),
            });
        }

        while let Some(event) = self.rx_in.recv().await {
            self.handle_event(event).await;
            if self.machine.state().is_ended() {
                break;
            }
        }

        self.deps.registry.remove(self.call_id());
        log::info!(
            "[call {}] session finished reason={:?} turns={} duration_sec={}",
            self.call_id(),
            self.end_reason,
            self.record.turns,
            self.record.duration_sec(Utc::now())
        );
    }

    async fn handle_event(&mut self, event: CallEvent) {
        let prev = self.machine.state().clone();
        if let Some(reason) = end_reason_for(&prev, &event) {
            self.end_reason.get_or_insert(reason);
        }
        if let CallEvent::RecognitionError { reason } = &event {
            log::warn!("[call {}] recognition error: {}", self.call_id(), reason);
            self.recognition_active = false;
        }

        let effects = self.machine.advance(&event, &self.deps.voice);
        let next = self.machine.state();
        if &prev != next {
            log::debug!(
                "[call {}] {} --{}--> {}",
                self.call_id(),
                prev.name(),
                event.name(),
                next.name()
            );
        } else if effects.is_empty() {
            log::debug!(
                "[call {}] ignored {} in {}",
                self.call_id(),
                event.name(),
                prev.name()
            );
        }

        for effect in effects {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&mut self, effect: CallEffect) {
        let call_id = self.call_id().clone();
        match effect {
            CallEffect::PostCallStarted => {
                let request = WebhookRequest::call_started(
                    &call_id,
                    self.record.info.caller_id.as_deref(),
                    &self.deps.tenant,
                );
                self.spawn_webhook(request, CallEvent::GreetingReady);
            }
            CallEffect::Say(text) => {
                log::info!("[call {}] speaking: {}", call_id, text);
                let voice = self.deps.voice.tts_voice.clone();
                if let Err(err) = self.deps.telephony.say(call_id.clone(), text, voice).await {
                    // Nothing will play, so nothing will report the end of playback.
                    log::warn!("[call {}] say failed: {}", call_id, err);
                    let _ = self.tx_in.send(CallEvent::PlaybackFinished);
                }
            }
            CallEffect::StartRecognition => {
                if self.recognition_active {
                    if let Err(err) = self.deps.telephony.stop_recognition(call_id.clone()).await {
                        log::debug!("[call {}] restart: stop failed: {}", call_id, err);
                    }
                }
                let language = self.deps.voice.asr_language.clone();
                match self
                    .deps
                    .telephony
                    .start_recognition(call_id.clone(), language)
                    .await
                {
                    Ok(()) => {
                        self.recognition_active = true;
                        log::debug!("[call {}] listening", call_id);
                    }
                    Err(err) => {
                        self.recognition_active = false;
                        let _ = self.tx_in.send(CallEvent::RecognitionError {
                            reason: err.to_string(),
                        });
                    }
                }
            }
            CallEffect::StopRecognition => {
                if !self.recognition_active {
                    return;
                }
                self.recognition_active = false;
                if let Err(err) = self.deps.telephony.stop_recognition(call_id.clone()).await {
                    log::warn!("[call {}] stop recognition failed: {}", call_id, err);
                }
            }
            CallEffect::PostSpeechRecognized(text) => {
                self.record.turns += 1;
                log::info!(
                    "[call {}] turn {} recognized {}",
                    call_id,
                    self.record.turns,
                    mask_pii(&text)
                );
                log::debug!("[call {}] recognized text: {}", call_id, text);
                let request = WebhookRequest::speech_recognized(&call_id, &text, &self.deps.tenant);
                self.spawn_webhook(request, CallEvent::TurnReady);
            }
            CallEffect::StartForwarding(phone_number) => {
                log::info!(
                    "[call {}] forwarding to {}",
                    call_id,
                    mask_phone(&phone_number)
                );
                if let Err(err) = self
                    .deps
                    .telephony
                    .start_forwarding(call_id.clone(), phone_number)
                    .await
                {
                    let _ = self.tx_in.send(CallEvent::ForwardingFailed {
                        reason: err.to_string(),
                    });
                }
            }
            CallEffect::Hangup => {
                if let Err(err) = self.deps.telephony.hangup(call_id.clone()).await {
                    log::warn!("[call {}] hangup failed: {}", call_id, err);
                }
            }
            CallEffect::PostCallEnded => {
                let request = WebhookRequest::call_ended(&call_id, &self.deps.tenant);
                let fut = self.deps.webhook.post(request);
                tokio::spawn(async move {
                    if let Err(err) = fut.await {
                        log::warn!("[call {}] call_ended webhook failed: {}", call_id, err);
                    }
                });
            }
        }
    }

    /// Posts to the webhook off the session task and feeds the outcome back as an event.
    fn spawn_webhook(&self, request: WebhookRequest, into_event: ReplyEvent) {
        let call_id = self.call_id().clone();
        let event_type = request.event_type;
        let fut = self.deps.webhook.post(request);
        let tx = self.tx_in.clone();
        tokio::spawn(async move {
            let result = fut.await;
            if let Err(err) = &result {
                log::warn!(
                    "[call {}] {} webhook failed: {}",
                    call_id,
                    event_type.as_str(),
                    err
                );
            }
            let _ = tx.send(into_event(result));
        });
    }
}

fn end_reason_for(state: &CallState, event: &CallEvent) -> Option<EndReason> {
    match (state, event) {
        (CallState::Ended, _) => None,
        (CallState::Transferring { .. }, CallEvent::Disconnected) => Some(EndReason::Transferred),
        (_, CallEvent::Disconnected) => Some(EndReason::Disconnected),
        // A failed forward keeps the call alive.
        (CallState::Transferring { .. }, CallEvent::Failed { .. }) => None,
        (_, CallEvent::Failed { reason }) => Some(EndReason::Failed(reason.clone())),
        (
            CallState::Speaking {
                then: AfterPlayback::Hangup,
            },
            CallEvent::PlaybackFinished,
        ) => Some(EndReason::Hangup),
        _ => None,
    }
}
