//! Session state: training phase, per-round data and round identifiers.

use std::fmt;

// ---------------------------------------------------------------------------
// TrainingState
// ---------------------------------------------------------------------------

/// Phase of the training session.
///
/// ```text
/// Idle ──start──▶ ShowingDigits ──display timer / skip──▶ Inputting
///      ◀──end────                                           │
///                 ShowingDigits ◀──next / auto-continue── ResultShowing ◀──submit──┘
/// ResultShowing ──end──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrainingState {
    /// No round in progress.
    #[default]
    Idle,
    /// The digit sequence is visible (and possibly being read aloud).
    ShowingDigits,
    /// Digits hidden; collecting the user's answer.
    Inputting,
    /// Answer scored; showing the verdict.
    ResultShowing,
}

impl TrainingState {
    /// A short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TrainingState::Idle => "Idle",
            TrainingState::ShowingDigits => "Showing digits",
            TrainingState::Inputting => "Inputting",
            TrainingState::ResultShowing => "Showing result",
        }
    }
}

impl fmt::Display for TrainingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// RoundId
// ---------------------------------------------------------------------------

/// Identifies one round.  Every timer and speech callback carries the round
/// it was issued for; events tagged with an old round are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RoundId(u64);

impl RoundId {
    pub fn next(self) -> Self {
        RoundId(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TrainingSession
// ---------------------------------------------------------------------------

/// Runtime state of one training session.  Owned by
/// [`SessionEngine`](super::SessionEngine); everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSession {
    pub state: TrainingState,
    /// Digits of the current round; fixed until the next round starts.
    pub current_digits: String,
    /// What the user has entered so far; frozen at submission.
    pub user_answer: String,
    /// `None` until the round's answer is scored.
    pub is_correct: Option<bool>,
    /// Current difficulty.  Never below 3.
    pub digit_count: usize,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

impl TrainingSession {
    /// Rounds answered in this session.
    pub fn answered(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }

    /// Whether `user_answer` has exactly `digit_count` digits.
    pub fn is_answer_complete(&self) -> bool {
        self.user_answer.chars().count() == self.digit_count
    }

    /// Totals handed to the storage layer when the session ends.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            digit_count: self.digit_count,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
        }
    }
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self {
            state: TrainingState::Idle,
            current_digits: String::new(),
            user_answer: String::new(),
            is_correct: None,
            digit_count: super::difficulty::MIN_DIGIT_COUNT,
            correct_count: 0,
            incorrect_count: 0,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSummary
// ---------------------------------------------------------------------------

/// Totals of a finished session, converted into a `TrainingRecord` by the
/// storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Difficulty reached at the end of the session.
    pub digit_count: usize,
    pub correct_count: u32,
    pub incorrect_count: u32,
}

impl SessionSummary {
    /// `correct_count × digit_count`.
    pub fn score(&self) -> u64 {
        u64::from(self.correct_count) * self.digit_count as u64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
