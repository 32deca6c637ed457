//! Operation results handed to collaborators.
//!
//! The core never persists or delivers anything. It returns an
//! `OperationRecord` a history store may save, and publishes an
//! `OperationEvent` to an optional `EventSink` after a successful run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::progress::ProgressSink;

/// The three transformations the core offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Split,
    Dedup,
    Merge,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Split => "split",
            OperationKind::Dedup => "dedup",
            OperationKind::Merge => "merge",
        }
    }
}

/// History row describing a completed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: OperationKind,
    /// Display name of the primary input (or the output for merges).
    pub filename: String,
    /// Rows read from the input(s).
    pub rows_processed: u64,
    /// Rows in the produced artifact.
    pub output_rows: u64,
    /// Bytes read from the input(s).
    pub size_bytes: u64,
    /// Number of output parts (fragments for a split, 1 otherwise).
    pub parts: u64,
    /// Encoding the input was decoded with.
    pub encoding: String,
}

impl OperationRecord {
    /// Notification payload for this record.
    pub fn event(&self) -> OperationEvent {
        OperationEvent {
            operation: self.operation,
            filename: self.filename.clone(),
            rows: self.rows_processed,
            size: self.size_bytes,
            parts: self.parts,
        }
    }
}

/// Domain event emitted after a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub operation: OperationKind,
    pub filename: String,
    pub rows: u64,
    pub size: u64,
    pub parts: u64,
}

/// Delivers operation events (email, SMS, websocket...). Owned by the host.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &OperationEvent);
}

/// Optional collaborators passed to each file-level operation.
#[derive(Clone, Default)]
pub struct OperationHooks {
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub events: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for OperationHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHooks")
            .field("progress", &self.progress.is_some())
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl OperationHooks {
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub(crate) fn progress(&self) -> Option<&dyn ProgressSink> {
        self.progress.as_deref()
    }

    pub(crate) fn publish(&self, record: &OperationRecord) {
        if let Some(events) = &self.events {
            events.publish(&record.event());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingEvents;
    use super::*;

    fn record() -> OperationRecord {
        OperationRecord {
            operation: OperationKind::Split,
            filename: "orders.csv".into(),
            rows_processed: 120,
            output_rows: 120,
            size_bytes: 4096,
            parts: 3,
            encoding: "utf-8".into(),
        }
    }

    #[test]
    fn test_event_mirrors_record() {
        let event = record().event();
        assert_eq!(event.operation, OperationKind::Split);
        assert_eq!(event.filename, "orders.csv");
        assert_eq!(event.rows, 120);
        assert_eq!(event.size, 4096);
        assert_eq!(event.parts, 3);
    }

    #[test]
    fn test_hooks_publish_to_sink() {
        let sink = Arc::new(RecordingEvents::default());
        let hooks = OperationHooks::default().with_events(sink.clone());
        hooks.publish(&record());
        assert_eq!(sink.snapshot().len(), 1);
    }

    #[test]
    fn test_operation_kind_serializes_snake_case() {
        let json = serde_json::to_string(&OperationKind::Dedup).unwrap();
        assert_eq!(json, "\"dedup\"");
    }
}
