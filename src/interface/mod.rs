pub mod http;
pub mod telephony;
