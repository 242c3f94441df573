//! Free list of reset session states.

use crate::builder::SessionState;
use std::sync::{Mutex, PoisonError};

/// Bounded pool of reusable [`SessionState`]s.
///
/// States are reset before they go back, so [`SessionPool::acquire`] always hands
/// out a clean state. Once the pool holds `capacity` states, released ones are
/// dropped.
#[derive(Debug)]
pub(crate) struct SessionPool {
    free: Mutex<Vec<SessionState>>,
    capacity: usize,
}

impl SessionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn acquire(&self) -> SessionState {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    pub fn release(&self, mut state: SessionState) {
        state.reset();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(state);
        }
    }

    /// Number of states currently pooled.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
