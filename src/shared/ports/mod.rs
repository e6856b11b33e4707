pub mod call_events;
pub mod telephony;
pub mod webhook;

use std::future::Future;
use std::pin::Pin;

pub type PortFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub use call_events::CallEventSink;
pub use telephony::TelephonyPort;
pub use webhook::WebhookPort;
