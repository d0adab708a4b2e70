//! Training session — state machine, adaptive difficulty, timing policy
//! and the speech auto-pilot.
//!
//! * [`SessionEngine`] — owns the [`TrainingSession`]; every operation
//!   returns the [`Effect`]s to carry out.
//! * [`AutoPilot`] — auto-record / auto-submit on top of the engine,
//!   answering with [`PilotAction`]s.
//! * [`AdaptiveDifficulty`] — the persisted `(digit_count, streaks)` triple.
//! * [`TimingPolicy`] — display, speech and auto-continue delays.

pub mod autopilot;
pub mod difficulty;
pub mod engine;
pub mod state;
pub mod timing;

pub use autopilot::{AutoPilot, PilotAction};
pub use difficulty::{
    AdaptiveDifficulty, DifficultyChange, StreakReset, MIN_DIGIT_COUNT, STREAK_THRESHOLD,
};
pub use engine::{Effect, SessionEngine, SessionError, TimerKind};
pub use state::{RoundId, SessionSummary, TrainingSession, TrainingState};
pub use timing::TimingPolicy;
