pub mod interface;
pub mod protocol;
pub mod service;
pub mod shared;

// Short paths for the most used modules.
pub use interface::{http, telephony};
pub use protocol::session;
pub use service::webhook;
pub use shared::{config, entities, error, logging, ports, utils};
