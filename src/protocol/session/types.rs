use crate::service::webhook::WebhookReply;
use crate::shared::error::WebhookError;

/// What happens once the phrase currently being played has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterPlayback {
    Listen,
    Transfer { phone_number: String },
    Hangup,
}

/// Per-call state (Ringing → Greeting → Speaking ⇄ Listening ⇄ Processing → Transferring → Ended).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    /// Call alerted and answered, media not connected yet.
    Ringing,
    /// `call_started` webhook in flight.
    Greeting,
    /// A phrase is playing; `then` runs on `PlaybackFinished`.
    Speaking { then: AfterPlayback },
    /// Recognition session active.
    Listening,
    /// `speech_recognized` webhook in flight.
    Processing,
    /// Call leg redirected to an operator.
    Transferring { phone_number: String },
    Ended,
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Greeting => "greeting",
            Self::Speaking { .. } => "speaking",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Transferring { .. } => "transferring",
            Self::Ended => "ended",
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// Inputs of a call session: platform events plus webhook completions.
#[derive(Debug)]
pub enum CallEvent {
    Connected,
    PlaybackFinished,
    RecognitionStarted,
    RecognitionResult {
        text: String,
        /// Percent (0-100). `None` when the platform does not report one.
        confidence: Option<f32>,
    },
    RecognitionError {
        reason: String,
    },
    ForwardingFailed {
        reason: String,
    },
    Disconnected,
    Failed {
        reason: String,
    },
    GreetingReady(Result<WebhookReply, WebhookError>),
    TurnReady(Result<WebhookReply, WebhookError>),
}

impl CallEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::PlaybackFinished => "playback_finished",
            Self::RecognitionStarted => "recognition_started",
            Self::RecognitionResult { .. } => "recognition_result",
            Self::RecognitionError { .. } => "recognition_error",
            Self::ForwardingFailed { .. } => "forwarding_failed",
            Self::Disconnected => "disconnected",
            Self::Failed { .. } => "failed",
            Self::GreetingReady(_) => "greeting_ready",
            Self::TurnReady(_) => "turn_ready",
        }
    }
}

/// Side effects a transition asks the session to carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEffect {
    PostCallStarted,
    Say(String),
    StartRecognition,
    StopRecognition,
    PostSpeechRecognized(String),
    StartForwarding(String),
    Hangup,
    PostCallEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: CallState,
    pub effects: Vec<CallEffect>,
}

impl Transition {
    pub fn stay(state: &CallState) -> Self {
        Self {
            next: state.clone(),
            effects: Vec::new(),
        }
    }

    pub fn to(next: CallState, effects: Vec<CallEffect>) -> Self {
        Self { next, effects }
    }
}
