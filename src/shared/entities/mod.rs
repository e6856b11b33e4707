pub mod call;
pub mod identifiers;

pub use call::{CallInfo, CallRecord, EndReason};
pub use identifiers::{CallId, IdentifierError, SessionId, TenantSlug};
