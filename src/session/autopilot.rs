//! AutoPilot — speech-driven input on top of the session engine.
//!
//! The auto-pilot never touches the session; it reads a snapshot and
//! answers with [`PilotAction`]s which the trainer loop turns into engine
//! calls, recogniser calls and timers.
//!
//! ```text
//! InputOpened ──auto_record──▶ Schedule(RecordSettle)
//! RecordSettle ──────────────▶ StopSpeech, StartListening
//! transcript "5", "57", ...  ─▶ SetAnswer(capped)
//!     full length + auto_submit:
//!         matches   ─▶ Schedule(AutoSubmit, confirm)      ── Submit
//!         otherwise ─▶ Schedule(AutoSubmit, self-correct) ── Submit
//! InputClosed ───────────────▶ StopListening, latch set
//! ```
//!
//! Submission is at most once per round: the latch is set when the round's
//! input closes and only [`AutoPilot::begin_round`] clears it.

use std::time::Duration;

use crate::config::AppConfig;
use crate::digits::sanitize_input;
use crate::speech::{Capabilities, RecognitionError};

use super::engine::TimerKind;
use super::state::{RoundId, TrainingSession, TrainingState};
use super::timing::TimingPolicy;

/// What the trainer loop should do on the auto-pilot's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum PilotAction {
    StopSpeech,
    StartListening { round: RoundId },
    StopListening,
    /// Replace the session's current answer.
    SetAnswer(String),
    Schedule {
        round: RoundId,
        kind: TimerKind,
        after: Duration,
    },
    /// Submit the session's current answer.
    Submit { round: RoundId },
    /// Message for the user.
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingSubmit {
    /// Transcript matched; submit after the short confirmation delay.
    Confirm,
    /// Transcript complete but wrong; submit after the self-correction window.
    Force,
}

#[derive(Debug, Default)]
pub struct AutoPilot {
    timing: TimingPolicy,
    round: Option<RoundId>,
    submitted: bool,
    listening: bool,
    pending: Option<PendingSubmit>,
}

impl AutoPilot {
    pub fn new(timing: TimingPolicy) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether `round` has already been submitted.
    pub fn is_submitted(&self, round: RoundId) -> bool {
        self.round == Some(round) && self.submitted
    }

    /// A new round started: clear the latch.
    pub fn begin_round(&mut self, round: RoundId) {
        self.round = Some(round);
        self.submitted = false;
        self.pending = None;
    }

    /// The digits were hidden.  Schedule the microphone when auto-record is
    /// on and recognition is available.
    pub fn on_input_opened(
        &mut self,
        round: RoundId,
        config: &AppConfig,
        capabilities: Capabilities,
    ) -> Vec<PilotAction> {
        if !self.is_current(round) {
            return Vec::new();
        }
        if config.training.auto_record && capabilities.speech_input {
            vec![PilotAction::Schedule {
                round,
                kind: TimerKind::RecordSettle,
                after: self.timing.record_settle_delay(),
            }]
        } else {
            Vec::new()
        }
    }

    /// The input phase of `round` ended.
    pub fn on_input_closed(&mut self, round: RoundId) -> Vec<PilotAction> {
        if self.round == Some(round) {
            self.submitted = true;
        }
        self.pending = None;

        if self.listening {
            vec![PilotAction::StopListening]
        } else {
            Vec::new()
        }
    }

    /// An auto-pilot timer elapsed.
    pub fn on_timer(
        &mut self,
        round: RoundId,
        kind: TimerKind,
        session: &TrainingSession,
        config: &AppConfig,
        capabilities: Capabilities,
    ) -> Vec<PilotAction> {
        if !self.accepts_input(round, session) {
            return Vec::new();
        }

        match kind {
            TimerKind::RecordSettle => {
                if self.listening || !config.training.auto_record || !capabilities.speech_input {
                    return Vec::new();
                }
                vec![PilotAction::StopSpeech, PilotAction::StartListening { round }]
            }
            TimerKind::AutoSubmit => match self.pending.take() {
                Some(mode) if session.is_answer_complete() => {
                    log::debug!("autopilot: submitting round {round} ({mode:?})");
                    vec![PilotAction::Submit { round }]
                }
                Some(mode) => {
                    log::debug!("autopilot: answer shrank, dropping {mode:?} submit");
                    Vec::new()
                }
                None => Vec::new(),
            },
            TimerKind::DisplayElapsed | TimerKind::AutoContinue => Vec::new(),
        }
    }

    /// Cumulative transcript for `round`.  Each call carries everything
    /// recognised so far.
    pub fn on_transcript(
        &mut self,
        round: RoundId,
        digits_so_far: &str,
        session: &TrainingSession,
        config: &AppConfig,
    ) -> Vec<PilotAction> {
        if !self.accepts_input(round, session) {
            return Vec::new();
        }

        let value: String = sanitize_input(digits_so_far)
            .chars()
            .take(session.digit_count)
            .collect();
        let complete = value.chars().count() == session.digit_count;
        let matches = value == session.current_digits;

        let mut actions = vec![PilotAction::SetAnswer(value)];

        if !complete {
            // A revised transcript lost digits; wait for it to complete again.
            self.pending = None;
            return actions;
        }
        if !config.training.auto_submit {
            return actions;
        }

        if matches {
            if self.pending != Some(PendingSubmit::Confirm) {
                self.pending = Some(PendingSubmit::Confirm);
                actions.push(PilotAction::Schedule {
                    round,
                    kind: TimerKind::AutoSubmit,
                    after: self.timing.confirm_submit_delay(),
                });
            }
        } else if self.pending != Some(PendingSubmit::Force) {
            self.pending = Some(PendingSubmit::Force);
            actions.push(PilotAction::Schedule {
                round,
                kind: TimerKind::AutoSubmit,
                after: self.timing.self_correct_delay(session.digit_count),
            });
        }

        actions
    }

    /// Microphone button.
    pub fn toggle_listening(
        &mut self,
        round: RoundId,
        session: &TrainingSession,
        capabilities: Capabilities,
    ) -> Vec<PilotAction> {
        if self.listening {
            return vec![PilotAction::StopListening];
        }
        if !capabilities.speech_input {
            return vec![PilotAction::Notice(
                "Speech recognition is not available".into(),
            )];
        }
        if !self.accepts_input(round, session) {
            return Vec::new();
        }
        vec![PilotAction::StopSpeech, PilotAction::StartListening { round }]
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Transient errors are part of a normal turn; anything else ends
    /// listening and is reported.
    pub fn on_recognition_error(&mut self, error: &RecognitionError) -> Vec<PilotAction> {
        if error.is_transient() {
            log::debug!("autopilot: ignoring transient recognition error: {error}");
            return Vec::new();
        }

        log::warn!("autopilot: recognition failed: {error}");
        let mut actions = Vec::new();
        if self.listening {
            actions.push(PilotAction::StopListening);
        }
        self.listening = false;
        actions.push(PilotAction::Notice(format!("Speech recognition failed: {error}")));
        actions
    }

    fn is_current(&self, round: RoundId) -> bool {
        self.round == Some(round)
    }

    fn accepts_input(&self, round: RoundId, session: &TrainingSession) -> bool {
        self.is_current(round) && !self.submitted && session.state == TrainingState::Inputting
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
