//! Progress and diagnostic events emitted by table transforms.
//!
//! Transforms never log through a global; they report to whatever
//! `Observer` the caller hands them.

use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started {
        operation: &'static str,
    },
    Finished {
        operation: &'static str,
        rows_before: usize,
        rows_after: usize,
    },
    /// Independent groups processed so far (Extend works per witness)
    Progress {
        operation: &'static str,
        done: usize,
        total: usize,
    },
    Note {
        operation: &'static str,
        message: String,
    },
    Warning {
        operation: &'static str,
        message: String,
    },
}

/// Receiver of transform events. Must be shareable across worker threads.
pub trait Observer: Sync {
    fn on_event(&self, event: &Event);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &Event) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::Started { operation } => info!(operation, "Started"),
            Event::Finished {
                operation,
                rows_before,
                rows_after,
            } => info!(operation, rows_before, rows_after, "Finished"),
            Event::Progress {
                operation,
                done,
                total,
            } => debug!(operation, done, total, "Progress"),
            Event::Note { operation, message } => debug!(operation, "{}", message),
            Event::Warning { operation, message } => warn!(operation, "{}", message),
        }
    }
}

/// Keeps every event; handy for inspecting what a transform reported.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
