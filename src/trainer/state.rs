//! Trainer view — everything the UI needs, published by the trainer loop.
//!
//! [`SharedView`] is an `Arc<Mutex<TrainerView>>`.  The [`TrainerRunner`]
//! writes it after every event; the egui update loop reads it each frame.
//!
//! [`TrainerRunner`]: super::TrainerRunner

use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::session::{RoundId, TrainingSession, TrainingState};
use crate::speech::Capabilities;
use crate::storage::{TrainingRecord, UserStats};

/// Snapshot of the trainer for rendering.
#[derive(Debug, Clone, Default)]
pub struct TrainerView {
    pub session: TrainingSession,
    pub round: RoundId,
    /// Live configuration, including the adaptive triple.
    pub config: AppConfig,
    pub stats: UserStats,
    /// Training history, oldest first.
    pub records: Vec<TrainingRecord>,
    /// The microphone is open.
    pub listening: bool,
    /// An utterance is playing.
    pub speaking: bool,
    pub capabilities: Capabilities,
    /// Message for the user (failed recognition, import result, ...).
    pub notice: Option<String>,
    /// Record produced by the last finished session.
    pub last_record: Option<TrainingRecord>,
}

impl TrainerView {
    pub fn new(
        config: AppConfig,
        stats: UserStats,
        records: Vec<TrainingRecord>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            config,
            stats,
            records,
            capabilities,
            ..Self::default()
        }
    }

    /// The answer field and submit button are live.
    pub fn accepts_input(&self) -> bool {
        self.session.state == TrainingState::Inputting
    }

    /// Show the microphone button.
    pub fn mic_available(&self) -> bool {
        self.capabilities.speech_input && self.config.recognition.enabled
    }
}

/// Do not hold the lock across `.await` points.
pub type SharedView = Arc<Mutex<TrainerView>>;

pub fn new_shared_view(view: TrainerView) -> SharedView {
    Arc::new(Mutex::new(view))
}
