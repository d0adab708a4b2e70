//! Speech-to-text adapter contract.
//!
//! A recogniser delivers its results through a [`TranscriptSink`]:
//!
//! * `on_digits` — the digits recognised **so far**.  Fires repeatedly;
//!   every call carries the whole cumulative transcript, never a delta.
//! * `on_end` — the listening session is over.
//! * `on_error` — see [`RecognitionError::is_transient`].
//!
//! At most one listening session is active per recogniser; a second
//! [`SpeechRecognizer::start_listening`] while one is active returns
//! `None`.  [`SpeechRecognizer::stop_listening`] is idempotent and accepts
//! `None`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// Nothing was said.  A normal, empty turn.
    #[error("no speech detected")]
    NoSpeech,

    /// The session was cut short (usually by `stop_listening`).
    #[error("recognition aborted")]
    Aborted,

    /// The engine could not start or broke down.
    #[error("{0}")]
    Failed(String),
}

impl RecognitionError {
    /// Transient errors are ignored; the input phase carries on.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecognitionError::NoSpeech | RecognitionError::Aborted)
    }

    /// Map an engine error code (`"no-speech"`, `"aborted"`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => RecognitionError::NoSpeech,
            "aborted" => RecognitionError::Aborted,
            other => RecognitionError::Failed(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// ListenHandle / RecognitionEvent / TranscriptSink
// ---------------------------------------------------------------------------

/// Identifies one listening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenHandle(u64);

impl ListenHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Cumulative digits recognised so far.
    Digits(String),
    End,
    Error(RecognitionError),
}

/// Callback target handed to [`SpeechRecognizer::start_listening`].
#[derive(Clone)]
pub struct TranscriptSink {
    deliver: Arc<dyn Fn(RecognitionEvent) + Send + Sync>,
}

impl TranscriptSink {
    pub fn new(deliver: impl Fn(RecognitionEvent) + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    pub fn on_digits(&self, digits_so_far: impl Into<String>) {
        (self.deliver)(RecognitionEvent::Digits(digits_so_far.into()));
    }

    pub fn on_end(&self) {
        (self.deliver)(RecognitionEvent::End);
    }

    pub fn on_error(&self, error: RecognitionError) {
        (self.deliver)(RecognitionEvent::Error(error));
    }
}

impl std::fmt::Debug for TranscriptSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TranscriptSink")
    }
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe speech-to-text interface.
pub trait SpeechRecognizer: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Begin listening.  Returns `None` when unsupported or when another
    /// session is still active.
    fn start_listening(&self, language: &str, sink: TranscriptSink) -> Option<ListenHandle>;

    /// End the session `handle`.  Safe to call repeatedly and with `None`.
    fn stop_listening(&self, handle: Option<ListenHandle>);
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

// ---------------------------------------------------------------------------
// ListenSlot
// ---------------------------------------------------------------------------

/// Single-occupancy slot recognisers use to enforce one active session.
#[derive(Debug, Default)]
pub struct ListenSlot {
    active: Mutex<Option<ListenHandle>>,
    next_id: AtomicU64,
}

impl ListenSlot {
    /// Claim the slot.  `None` if it is taken.
    pub fn acquire(&self) -> Option<ListenHandle> {
        let mut active = self.active.lock().ok()?;
        if active.is_some() {
            return None;
        }
        let handle = ListenHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        *active = Some(handle);
        Some(handle)
    }

    /// Free the slot if `handle` holds it.  Returns whether it did.
    pub fn release(&self, handle: Option<ListenHandle>) -> bool {
        let Some(handle) = handle else {
            return false;
        };
        match self.active.lock() {
            Ok(mut active) if *active == Some(handle) => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, handle: ListenHandle) -> bool {
        self.active
            .lock()
            .map(|active| *active == Some(handle))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// UnsupportedRecognizer
// ---------------------------------------------------------------------------

/// Recogniser for builds or systems without speech input.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn start_listening(&self, _language: &str, _sink: TranscriptSink) -> Option<ListenHandle> {
        None
    }

    fn stop_listening(&self, _handle: Option<ListenHandle>) {}
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// Scriptable recogniser: tests push transcripts through the sink of the
/// active session.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockRecognizer {
    slot: ListenSlot,
    sink: Mutex<Option<TranscriptSink>>,
    starts: AtomicU64,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn emit_digits(&self, digits: &str) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.on_digits(digits);
        }
    }

    pub fn emit_error(&self, error: RecognitionError) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.on_error(error);
        }
    }
}

#[cfg(test)]
impl SpeechRecognizer for MockRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start_listening(&self, _language: &str, sink: TranscriptSink) -> Option<ListenHandle> {
        let handle = self.slot.acquire()?;
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Some(handle)
    }

    fn stop_listening(&self, handle: Option<ListenHandle>) {
        if self.slot.release(handle) {
            if let Some(sink) = self.sink.lock().unwrap().take() {
                sink.on_end();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
