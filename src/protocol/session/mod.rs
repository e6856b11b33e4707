pub mod coordinator;
pub mod dispatcher;
pub mod registry;
pub mod state_machine;
pub mod types;


pub use coordinator::{CallSession, SessionDeps, SessionHandle};
pub use dispatcher::CallDispatcher;
pub use registry::CallRegistry;
pub use state_machine::{next_call_state, transition, CallStateMachine};
pub use types::{AfterPlayback, CallEffect, CallEvent, CallState, Transition};
