use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::session::types::CallEvent;
use crate::shared::entities::CallId;

pub type CallMap = Arc<Mutex<HashMap<CallId, UnboundedSender<CallEvent>>>>;

/// Live call sessions keyed by call id.
#[derive(Clone, Default)]
pub struct CallRegistry {
    inner: CallMap,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, UnboundedSender<CallEvent>>> {
        // A panicked holder cannot leave the map half-written; keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(
        &self,
        call_id: CallId,
        tx: UnboundedSender<CallEvent>,
    ) -> Option<UnboundedSender<CallEvent>> {
        self.lock().insert(call_id, tx)
    }

    /// Registers a session unless the call id is already live. Check and insert share one lock.
    pub fn insert_if_absent(&self, call_id: CallId, tx: UnboundedSender<CallEvent>) -> bool {
        let mut map = self.lock();
        if map.contains_key(&call_id) {
            return false;
        }
        map.insert(call_id, tx);
        true
    }

    pub fn contains(&self, call_id: &CallId) -> bool {
        self.lock().contains_key(call_id)
    }

    pub fn get(&self, call_id: &CallId) -> Option<UnboundedSender<CallEvent>> {
        self.lock().get(call_id).cloned()
    }

    pub fn remove(&self, call_id: &CallId) -> Option<UnboundedSender<CallEvent>> {
        self.lock().remove(call_id)
    }

    pub fn list(&self) -> Vec<CallId> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delivers an event to a live session. False when the call is unknown or its task is gone.
    pub fn dispatch(&self, call_id: &CallId, event: CallEvent) -> bool {
        match self.get(call_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}
