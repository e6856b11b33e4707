pub mod call;

pub use call::{TelephonyError, WebhookError};
