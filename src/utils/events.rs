//! Dispatch event log
//!
//! Bounded in-memory ring of recent dispatch/relay events, owned by the
//! application state and shared behind a lock. Capacity is fixed at
//! construction; pushing beyond it evicts the oldest entry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::RwLock;
use uuid::Uuid;

/// One observability event
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub at: DateTime<Utc>,
    pub correlation_id: Uuid,
    /// Pipeline stage that produced the event (dispatch, relay, adapter, usage)
    pub stage: &'static str,
    pub detail: String,
}

impl DispatchEvent {
    pub fn new(correlation_id: Uuid, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            correlation_id,
            stage,
            detail: detail.into(),
        }
    }
}

/// Ring buffer of recent dispatch events
#[derive(Debug)]
pub struct DispatchLog {
    capacity: usize,
    events: RwLock<VecDeque<DispatchEvent>>,
}

impl DispatchLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record an event, evicting the oldest entry when full
    pub fn push(&self, event: DispatchEvent) {
        if let Ok(mut events) = self.events.write() {
            if events.len() == self.capacity {
                events.pop_front();
            }
            events.push_back(event);
        }
    }

    /// Snapshot of the buffered events, oldest first
    pub fn recent(&self) -> Vec<DispatchEvent> {
        self.events
            .read()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
