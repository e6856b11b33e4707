use crate::protocol::session::types::{
    AfterPlayback, CallEffect, CallEvent, CallState, Transition,
};
use crate::shared::config::{FailurePolicy, VoiceConfig};
use crate::shared::utils::strip_emojis;

fn after_failure(policy: FailurePolicy) -> AfterPlayback {
    match policy {
        FailurePolicy::Hangup => AfterPlayback::Hangup,
        FailurePolicy::ResumeListening => AfterPlayback::Listen,
    }
}

fn speak(text: String, then: AfterPlayback) -> Transition {
    Transition::to(CallState::Speaking { then }, vec![CallEffect::Say(text)])
}

fn spoken_text(raw: Option<&str>, fallback: &str) -> String {
    let cleaned = raw.map(strip_emojis).unwrap_or_default();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

fn transfer_failed(cfg: &VoiceConfig) -> Transition {
    speak(cfg.prompts.transfer_failed.clone(), AfterPlayback::Listen)
}

/// Recognition may still be running from a reprompt, so it is always stopped.
fn end() -> Transition {
    Transition::to(
        CallState::Ended,
        vec![CallEffect::StopRecognition, CallEffect::PostCallEnded],
    )
}

/// Computes the next state and the effects to run for one event. No I/O.
pub fn transition(state: &CallState, event: &CallEvent, cfg: &VoiceConfig) -> Transition {
    let prompts = &cfg.prompts;
    match (state, event) {
        (CallState::Ended, _) => Transition::stay(state),
        // The platform reports a failed forward as a call failure while the caller stays on the line.
        (CallState::Transferring { .. }, CallEvent::Failed { .. }) => transfer_failed(cfg),
        (_, CallEvent::Disconnected | CallEvent::Failed { .. }) => end(),

        (CallState::Ringing, CallEvent::Connected) => {
            Transition::to(CallState::Greeting, vec![CallEffect::PostCallStarted])
        }

        (CallState::Greeting, CallEvent::GreetingReady(Ok(reply))) => speak(
            spoken_text(reply.text.as_deref(), &prompts.greeting),
            AfterPlayback::Listen,
        ),
        (CallState::Greeting, CallEvent::GreetingReady(Err(_))) => speak(
            prompts.service_unavailable.clone(),
            after_failure(cfg.failure_policy),
        ),

        (CallState::Speaking { then }, CallEvent::PlaybackFinished) => match then {
            AfterPlayback::Listen => {
                Transition::to(CallState::Listening, vec![CallEffect::StartRecognition])
            }
            AfterPlayback::Transfer { phone_number } => Transition::to(
                CallState::Transferring {
                    phone_number: phone_number.clone(),
                },
                vec![CallEffect::StartForwarding(phone_number.clone())],
            ),
            AfterPlayback::Hangup => Transition::to(
                CallState::Ended,
                vec![CallEffect::Hangup, CallEffect::PostCallEnded],
            ),
        },

        (CallState::Listening, CallEvent::RecognitionResult { text, confidence }) => {
            let text = text.trim();
            if text.is_empty() {
                return Transition::to(
                    CallState::Speaking {
                        then: AfterPlayback::Listen,
                    },
                    vec![
                        CallEffect::StopRecognition,
                        CallEffect::Say(prompts.no_input.clone()),
                    ],
                );
            }
            if let Some(confidence) = confidence {
                if *confidence <= cfg.min_confidence {
                    return Transition::to(
                        CallState::Listening,
                        vec![CallEffect::StartRecognition],
                    );
                }
            }
            Transition::to(
                CallState::Processing,
                vec![
                    CallEffect::StopRecognition,
                    CallEffect::PostSpeechRecognized(text.to_string()),
                ],
            )
        }
        (CallState::Listening, CallEvent::RecognitionError { .. }) => speak(
            prompts.recognition_failed.clone(),
            after_failure(cfg.failure_policy),
        ),

        (CallState::Processing, CallEvent::TurnReady(Ok(reply))) => {
            let text = spoken_text(reply.text.as_deref(), &prompts.turn_fallback);
            let then = match reply.transfer_number() {
                Some(phone_number) => AfterPlayback::Transfer {
                    phone_number: phone_number.to_string(),
                },
                None => AfterPlayback::Listen,
            };
            speak(text, then)
        }
        (CallState::Processing, CallEvent::TurnReady(Err(_))) => speak(
            prompts.turn_failed.clone(),
            after_failure(cfg.failure_policy),
        ),

        // Forwarding failures always go back to listening, whatever the failure policy says.
        (CallState::Transferring { .. }, CallEvent::ForwardingFailed { .. }) => {
            transfer_failed(cfg)
        }

        _ => Transition::stay(state),
    }
}

pub fn next_call_state(state: &CallState, event: &CallEvent, cfg: &VoiceConfig) -> CallState {
    transition(state, event, cfg).next
}

/// Pure call state machine: transitions and effect plans only, no I/O.
pub struct CallStateMachine {
    state: CallState,
}

impl CallStateMachine {
    pub fn new() -> Self {
        Self {
            state: CallState::Ringing,
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn next_state(&self, event: &CallEvent, cfg: &VoiceConfig) -> CallState {
        next_call_state(&self.state, event, cfg)
    }

    pub fn advance(&mut self, event: &CallEvent, cfg: &VoiceConfig) -> Vec<CallEffect> {
        let Transition { next, effects } = transition(&self.state, event, cfg);
        self.state = next;
        effects
    }
}

impl Default for CallStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
