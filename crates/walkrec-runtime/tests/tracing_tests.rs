#![forbid(unsafe_code)]

//! Diagnostic event tests for session persistence.
//!
//! Storage failures never interrupt a recording; they surface only as
//! `tracing` warnings naming the backend and the error.
//!
//!   cargo test -p walkrec-runtime --test tracing_tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

use walkrec_runtime::{
    MemoryStorage, Recorder, RecorderConfig, StorageBackend, StorageError, StorageResult,
    StoredEntry, Transition,
};
use walkrec_widgets::GuiState;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let mut fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.remove("message").unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
        });
    }
}

fn with_captured_events(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn warnings(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.level == Level::WARN).collect()
}

/// Loads nothing and rejects every write.
struct ReadOnlyStorage;

impl StorageBackend for ReadOnlyStorage {
    fn name(&self) -> &str {
        "read-only"
    }

    fn load(&self, _key: &str) -> StorageResult<Option<StoredEntry>> {
        Ok(None)
    }

    fn save(&self, _entry: &StoredEntry) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::other("read-only volume")))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }
}

fn start(recorder: &Recorder) {
    recorder.dispatch(Transition::StartRecording {
        captured: GuiState::uncaptured("/"),
        timestamp: recorder.now(),
    });
}

fn config() -> RecorderConfig {
    RecorderConfig::default().with_deterministic(true)
}

// ============================================================================
// Save Failures
// ============================================================================

#[test]
fn failed_save_warns_with_backend_and_error() {
    let mut recorder = None;
    let events = with_captured_events(|| {
        let rec = Recorder::with_backend(&config(), Arc::new(ReadOnlyStorage));
        start(&rec);
        recorder = Some(rec);
    });

    let warns = warnings(&events);
    assert_eq!(warns.len(), 1, "events: {events:?}");
    assert_eq!(warns[0].message, "failed to persist session");
    assert_eq!(warns[0].fields.get("backend").map(String::as_str), Some("read-only"));
    assert!(
        warns[0]
            .fields
            .get("error")
            .is_some_and(|e| e.contains("read-only volume"))
    );

    // The recording itself went ahead.
    let recorder = recorder.expect("recorder built");
    assert!(recorder.is_recording());
    assert_eq!(recorder.snapshot().actions.len(), 1);
}

#[test]
fn every_failed_save_warns_again() {
    let events = with_captured_events(|| {
        let rec = Recorder::with_backend(&config(), Arc::new(ReadOnlyStorage));
        start(&rec);
        rec.dispatch(Transition::EndRecording {
            captured: GuiState::uncaptured("/"),
            timestamp: rec.now(),
            prev_action_was_routing: false,
        });
    });
    assert_eq!(warnings(&events).len(), 2, "events: {events:?}");
}

// ============================================================================
// Restore Failures
// ============================================================================

#[test]
fn unreadable_session_warns_and_starts_empty() {
    let storage = Arc::new(MemoryStorage::with_entries([StoredEntry {
        key: config().storage_key,
        version: 1,
        data: b"{ not json".to_vec(),
    }]));

    let mut restored = None;
    let events = with_captured_events(|| {
        restored = Some(Recorder::with_backend(&config(), storage).snapshot());
    });

    let warns = warnings(&events);
    assert_eq!(warns.len(), 1, "events: {events:?}");
    assert_eq!(warns[0].message, "discarding unreadable session");
    assert_eq!(warns[0].fields.get("backend").map(String::as_str), Some("MemoryStorage"));
    assert!(restored.expect("restored").actions.is_empty());
}

#[test]
fn healthy_backend_is_quiet() {
    let events = with_captured_events(|| {
        let rec = Recorder::with_backend(&config(), Arc::new(MemoryStorage::new()));
        start(&rec);
    });
    assert!(warnings(&events).is_empty(), "events: {events:?}");
}
