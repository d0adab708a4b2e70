//! SessionEngine — the training state machine.
//!
//! The engine is synchronous and owns no timers or speech handles.  Every
//! operation mutates the [`TrainingSession`] and returns the [`Effect`]s the
//! caller must carry out (schedule a timer, speak, persist the adaptive
//! triple, ...).  Timers come back in through [`SessionEngine::handle_timer`]
//! tagged with the [`RoundId`] they were scheduled for; a tag from an older
//! round, or a timer whose phase has already been left, changes nothing.
//!
//! ```text
//! start ──▶ [ShowingDigits] ──DisplayElapsed / finish_display──▶ [Inputting]
//!                 ▲                                                   │
//!                 │ next_round / AutoContinue                submit   │
//!                 └──────────────── [ResultShowing] ◀─────────────────┘
//!                                          │ end_training
//!                                          ▼
//!                                       [Idle]
//! ```
//!
//! Configuration is never captured: each operation that needs it takes the
//! live [`AppConfig`] snapshot as an argument.

use std::time::Duration;

use thiserror::Error;

use crate::config::AppConfig;
use crate::digits::{sanitize_input, validate_answer, DigitError, DigitSource, RandomDigits};
use crate::speech::Capabilities;

use super::difficulty::{AdaptiveDifficulty, DifficultyChange, StreakReset};
use super::state::{RoundId, SessionSummary, TrainingSession, TrainingState};
use super::timing::TimingPolicy;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The operation is not allowed in the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: TrainingState,
    },

    /// Submitted answer does not have exactly `digit_count` digits.
    #[error("answer has {got} digits, expected {expected}")]
    IncompleteAnswer { got: usize, expected: usize },

    #[error(transparent)]
    Digits(#[from] DigitError),
}

// ---------------------------------------------------------------------------
// TimerKind / Effect
// ---------------------------------------------------------------------------

/// Every timer the engine or the auto-pilot schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// The digits have been shown long enough.
    DisplayElapsed,
    /// Start the next round without user action.
    AutoContinue,
    /// Speech output has settled; open the microphone.
    RecordSettle,
    /// Submit the recognised answer.
    AutoSubmit,
}

/// Side effect requested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fire `kind` for `round` after `after`.
    Schedule {
        round: RoundId,
        kind: TimerKind,
        after: Duration,
    },
    /// Drop every pending timer.
    CancelTimers,
    /// Read the round's digits aloud.
    SpeakDigits { round: RoundId, digits: String },
    /// Read the verdict aloud; the expected digits follow a wrong answer.
    SpeakResult {
        round: RoundId,
        correct: bool,
        expected: String,
    },
    StopSpeech,
    /// Write the adaptive triple to the persistence collaborator.
    PersistAdaptive(AdaptiveDifficulty),
    /// A new round has started showing its digits.
    RoundStarted { round: RoundId },
    /// The input phase of `round` has begun.
    InputOpened { round: RoundId },
    /// The input phase of `round` is over (submitted or abandoned).
    InputClosed { round: RoundId },
}

// ---------------------------------------------------------------------------
// SessionEngine
// ---------------------------------------------------------------------------

/// Owns the training session and drives its transitions.
///
/// ```
/// use digit_span::config::AppConfig;
/// use digit_span::digits::RandomDigits;
/// use digit_span::session::{SessionEngine, TimerKind, TrainingState};
/// use digit_span::speech::Capabilities;
///
/// let config = AppConfig::default();
/// let mut engine = SessionEngine::new(Box::new(RandomDigits::seeded(1)), Capabilities::none());
///
/// engine.start(&config).unwrap();
/// assert_eq!(engine.session().state, TrainingState::ShowingDigits);
///
/// let round = engine.round();
/// engine.handle_timer(round, TimerKind::DisplayElapsed, &config).unwrap();
/// assert_eq!(engine.session().state, TrainingState::Inputting);
///
/// let digits = engine.session().current_digits.clone();
/// engine.submit(&digits, &config).unwrap();
/// assert_eq!(engine.session().is_correct, Some(true));
/// ```
pub struct SessionEngine {
    session: TrainingSession,
    round: RoundId,
    source: Box<dyn DigitSource>,
    timing: TimingPolicy,
    streak_reset: StreakReset,
    capabilities: Capabilities,
}

impl SessionEngine {
    pub fn new(source: Box<dyn DigitSource>, capabilities: Capabilities) -> Self {
        Self {
            session: TrainingSession::default(),
            round: RoundId::default(),
            source,
            timing: TimingPolicy::default(),
            streak_reset: StreakReset::default(),
            capabilities,
        }
    }

    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_streak_reset(mut self, streak_reset: StreakReset) -> Self {
        self.streak_reset = streak_reset;
        self
    }

    /// Swap the digit source, keeping timing and streak policy.
    pub fn set_source(&mut self, source: Box<dyn DigitSource>) {
        self.source = source;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Identifier of the current round.  Changes on every start, next round,
    /// end and abandon.
    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn timing(&self) -> &TimingPolicy {
        &self.timing
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Capability checks may be re-run at any time.
    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    pub fn adaptive(&self) -> AdaptiveDifficulty {
        AdaptiveDifficulty {
            digit_count: self.session.digit_count,
            consecutive_correct: self.session.consecutive_correct,
            consecutive_incorrect: self.session.consecutive_incorrect,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Idle → ShowingDigits.  Reseeds the difficulty from the persisted
    /// triple and clears the session counters.
    pub fn start(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        self.require("start training", &[TrainingState::Idle])?;

        let adaptive = AdaptiveDifficulty::from_config(&config.training);
        self.session = TrainingSession::default();
        self.apply_adaptive(adaptive);

        log::info!(
            "session: training started at {} digits",
            self.session.digit_count
        );
        self.begin_round(config)
    }

    /// ResultShowing → ShowingDigits with a fresh sequence.  The difficulty
    /// is read back from the persisted triple, so an import between rounds
    /// takes effect.
    pub fn next_round(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        self.require("start the next round", &[TrainingState::ResultShowing])?;
        self.reseed_round(config)
    }

    /// ShowingDigits → Inputting before the display timer runs out.
    pub fn finish_display(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require("skip the display", &[TrainingState::ShowingDigits])?;

        let mut effects = vec![Effect::StopSpeech];
        effects.extend(self.enter_input());
        Ok(effects)
    }

    /// Replace the answer being typed.  Non-digits are dropped and the value
    /// is capped at `digit_count`.
    pub fn set_answer(&mut self, raw: &str) -> Result<(), SessionError> {
        self.require("edit the answer", &[TrainingState::Inputting])?;

        self.session.user_answer = sanitize_input(raw)
            .chars()
            .take(self.session.digit_count)
            .collect();
        Ok(())
    }

    /// Set the answer and submit it in one step.
    pub fn submit(&mut self, answer: &str, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        self.set_answer(answer)?;
        self.submit_current(config)
    }

    /// Inputting → ResultShowing.  Scores the current answer, adapts the
    /// difficulty and asks for the triple to be persisted.
    pub fn submit_current(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        self.require("submit", &[TrainingState::Inputting])?;

        let got = self.session.user_answer.chars().count();
        if got != self.session.digit_count {
            return Err(SessionError::IncompleteAnswer {
                got,
                expected: self.session.digit_count,
            });
        }

        let correct = validate_answer(&self.session.user_answer, &self.session.current_digits);
        if correct {
            self.session.correct_count += 1;
        } else {
            self.session.incorrect_count += 1;
        }

        let mut adaptive = self.adaptive();
        let change = adaptive.record_answer(correct, self.streak_reset);
        self.apply_adaptive(adaptive);

        self.session.is_correct = Some(correct);
        self.session.state = TrainingState::ResultShowing;

        log::debug!(
            "session: round {} answered {} ({:?}, next round {} digits)",
            self.round,
            if correct { "correctly" } else { "incorrectly" },
            change,
            self.session.digit_count
        );
        if change != DifficultyChange::Unchanged {
            log::info!("session: difficulty now {} digits", self.session.digit_count);
        }

        let mut effects = vec![
            Effect::CancelTimers,
            Effect::InputClosed { round: self.round },
            Effect::PersistAdaptive(adaptive),
        ];

        if self.speaks(config) {
            effects.push(Effect::SpeakResult {
                round: self.round,
                correct,
                expected: self.session.current_digits.clone(),
            });
        }

        if config.training.auto_continue {
            effects.push(Effect::Schedule {
                round: self.round,
                kind: TimerKind::AutoContinue,
                after: self
                    .timing
                    .auto_continue_delay(correct, self.session.current_digits.len()),
            });
        }

        Ok(effects)
    }

    /// ResultShowing or Idle → Idle.  Returns the session totals when at
    /// least one round was answered.
    pub fn end_training(&mut self) -> Result<(Option<SessionSummary>, Vec<Effect>), SessionError> {
        self.require(
            "end training",
            &[TrainingState::ResultShowing, TrainingState::Idle],
        )?;

        let summary = (self.session.answered() > 0).then(|| self.session.summary());
        if let Some(s) = &summary {
            log::info!(
                "session: training ended: {} correct, {} incorrect at {} digits",
                s.correct_count,
                s.incorrect_count,
                s.digit_count
            );
        }

        self.reset();
        Ok((summary, vec![Effect::CancelTimers, Effect::StopSpeech]))
    }

    /// Drop the session from any state without producing a record.
    pub fn abandon(&mut self) -> Vec<Effect> {
        let was_inputting = self.session.state == TrainingState::Inputting;
        let old_round = self.round;

        if self.session.state != TrainingState::Idle {
            log::info!("session: training abandoned in {}", self.session.state);
        }
        self.reset();

        let mut effects = vec![Effect::CancelTimers, Effect::StopSpeech];
        if was_inputting {
            effects.push(Effect::InputClosed { round: old_round });
        }
        effects
    }

    /// Abandon the current session and start a new one.
    pub fn restart(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        let mut effects = self.abandon();
        effects.extend(self.start(config)?);
        Ok(effects)
    }

    /// Apply an elapsed engine timer.  Timers of other rounds, timers whose
    /// phase has already been left and auto-pilot timers are ignored.
    pub fn handle_timer(
        &mut self,
        round: RoundId,
        kind: TimerKind,
        config: &AppConfig,
    ) -> Result<Vec<Effect>, SessionError> {
        if round != self.round {
            log::debug!("session: dropping stale {kind:?} timer of round {round}");
            return Ok(Vec::new());
        }

        match (kind, self.session.state) {
            (TimerKind::DisplayElapsed, TrainingState::ShowingDigits) => Ok(self.enter_input()),
            (TimerKind::AutoContinue, TrainingState::ResultShowing)
                if config.training.auto_continue =>
            {
                self.reseed_round(config)
            }
            (TimerKind::DisplayElapsed | TimerKind::AutoContinue, state) => {
                log::debug!("session: ignoring {kind:?} timer in {state}");
                Ok(Vec::new())
            }
            (TimerKind::RecordSettle | TimerKind::AutoSubmit, _) => Ok(Vec::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require(&self, action: &'static str, allowed: &[TrainingState]) -> Result<(), SessionError> {
        if allowed.contains(&self.session.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.session.state,
            })
        }
    }

    fn speaks(&self, config: &AppConfig) -> bool {
        config.voice.enabled && self.capabilities.speech_output
    }

    fn apply_adaptive(&mut self, adaptive: AdaptiveDifficulty) {
        self.session.digit_count = adaptive.digit_count;
        self.session.consecutive_correct = adaptive.consecutive_correct;
        self.session.consecutive_incorrect = adaptive.consecutive_incorrect;
    }

    fn reseed_round(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        self.apply_adaptive(AdaptiveDifficulty::from_config(&config.training));
        self.begin_round(config)
    }

    fn begin_round(&mut self, config: &AppConfig) -> Result<Vec<Effect>, SessionError> {
        let digits = self.source.generate(self.session.digit_count)?;

        self.round = self.round.next();
        self.session.current_digits = digits;
        self.session.user_answer.clear();
        self.session.is_correct = None;
        self.session.state = TrainingState::ShowingDigits;

        log::debug!(
            "session: round {} showing {} digits",
            self.round,
            self.session.digit_count
        );

        let mut effects = vec![
            Effect::CancelTimers,
            Effect::StopSpeech,
            Effect::RoundStarted { round: self.round },
        ];

        if self.speaks(config) {
            effects.push(Effect::SpeakDigits {
                round: self.round,
                digits: self.session.current_digits.clone(),
            });
        }

        effects.push(Effect::Schedule {
            round: self.round,
            kind: TimerKind::DisplayElapsed,
            after: self.timing.display_duration(
                self.session.digit_count,
                &config.training,
                &config.voice,
                self.capabilities.speech_output,
            ),
        });

        Ok(effects)
    }

    fn enter_input(&mut self) -> Vec<Effect> {
        self.session.state = TrainingState::Inputting;
        log::debug!("session: round {} accepting input", self.round);
        vec![
            Effect::CancelTimers,
            Effect::InputOpened { round: self.round },
        ]
    }

    fn reset(&mut self) {
        let digit_count = self.session.digit_count;
        self.session = TrainingSession {
            digit_count,
            ..TrainingSession::default()
        };
        self.round = self.round.next();
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(Box::new(RandomDigits::new()), Capabilities::none())
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("session", &self.session)
            .field("round", &self.round)
            .field("streak_reset", &self.streak_reset)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digits::ScriptedDigits;

    fn quiet_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.voice.enabled = false;
        config
    }

    fn engine(script: &[&str]) -> SessionEngine {
        SessionEngine::new(
            Box::new(ScriptedDigits::new(script.iter().copied())),
            Capabilities::none(),
        )
    }

    fn scheduled(effects: &[Effect], kind: TimerKind) -> Option<Duration> {
        effects.iter().find_map(|e| match e {
            Effect::Schedule { kind: k, after, .. } if *k == kind => Some(*after),
            _ => None,
        })
    }

    /// Write persisted triples back into the config, as the runner does.
    fn persist(effects: &[Effect], config: &mut AppConfig) {
        for effect in effects {
            if let Effect::PersistAdaptive(adaptive) = effect {
                adaptive.write_to(&mut config.training);
            }
        }
    }

    /// Drive the engine to Inputting through the display timer.
    fn show_and_hide(engine: &mut SessionEngine, config: &AppConfig) {
        let round = engine.round();
        engine
            .handle_timer(round, TimerKind::DisplayElapsed, config)
            .unwrap();
        assert_eq!(engine.session().state, TrainingState::Inputting);
    }

    #[test]
    fn scenario_single_correct_round_at_three_digits() {
        let config = quiet_config();
        let mut e = engine(&["482"]);

        let effects = e.start(&config).unwrap();
        assert_eq!(e.session().state, TrainingState::ShowingDigits);
        assert_eq!(e.session().current_digits, "482");
        assert_eq!(
            scheduled(&effects, TimerKind::DisplayElapsed),
            Some(Duration::from_millis(2_000))
        );

        show_and_hide(&mut e, &config);
        e.submit("482", &config).unwrap();

        let s = e.session();
        assert_eq!(s.state, TrainingState::ResultShowing);
        assert_eq!(s.is_correct, Some(true));
        assert_eq!(s.correct_count, 1);
        assert_eq!(s.consecutive_correct, 1);
        assert_eq!(s.digit_count, 3);
    }

    #[test]
    fn two_correct_rounds_raise_the_third_round() {
        let mut config = quiet_config();
        let mut e = engine(&["111", "222", "3333"]);

        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        let effects = e.submit("111", &config).unwrap();
        persist(&effects, &mut config);

        e.next_round(&config).unwrap();
        show_and_hide(&mut e, &config);
        let effects = e.submit("222", &config).unwrap();
        assert!(effects.contains(&Effect::PersistAdaptive(AdaptiveDifficulty {
            digit_count: 4,
            consecutive_correct: 2,
            consecutive_incorrect: 0,
        })));
        persist(&effects, &mut config);

        e.next_round(&config).unwrap();
        assert_eq!(e.session().digit_count, 4);
        assert_eq!(e.session().current_digits, "3333");
    }

    #[test]
    fn wrong_answer_is_scored_and_persisted() {
        let config = quiet_config();
        let mut e = engine(&["482"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);

        let effects = e.submit("483", &config).unwrap();
        assert_eq!(e.session().is_correct, Some(false));
        assert_eq!(e.session().incorrect_count, 1);
        assert_eq!(e.session().consecutive_incorrect, 1);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PersistAdaptive(_))));
    }

    #[test]
    fn start_reseeds_from_persisted_triple() {
        let mut config = quiet_config();
        config.training.current_digit_count = 6;
        config.training.consecutive_correct = 1;

        let mut e = engine(&["123456"]);
        e.start(&config).unwrap();
        assert_eq!(e.session().digit_count, 6);

        show_and_hide(&mut e, &config);
        e.submit("123456", &config).unwrap();
        // Streak carried over from the previous session.
        assert_eq!(e.session().digit_count, 7);
    }

    #[test]
    fn next_round_reads_the_persisted_triple() {
        let mut config = quiet_config();
        let mut e = engine(&["482", "1234567", "7654321"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        let effects = e.submit("482", &config).unwrap();
        persist(&effects, &mut config);

        // Replaced between rounds, e.g. by an import.
        config.training.current_digit_count = 7;
        config.training.consecutive_correct = 0;
        e.next_round(&config).unwrap();
        assert_eq!(e.session().digit_count, 7);
        assert_eq!(e.session().consecutive_correct, 0);

        show_and_hide(&mut e, &config);
        let effects = e.submit("1234567", &config).unwrap();
        assert!(effects.contains(&Effect::PersistAdaptive(AdaptiveDifficulty {
            digit_count: 7,
            consecutive_correct: 1,
            consecutive_incorrect: 0,
        })));
    }

    #[test]
    fn auto_continue_reads_the_persisted_triple() {
        let mut config = quiet_config();
        config.training.auto_continue = true;
        let mut e = engine(&["482", "12345"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("000", &config).unwrap();

        config.training.current_digit_count = 5;
        let round = e.round();
        e.handle_timer(round, TimerKind::AutoContinue, &config)
            .unwrap();
        assert_eq!(e.session().digit_count, 5);
        assert_eq!(e.session().current_digits, "12345");
    }

    #[test]
    fn stale_display_timer_has_no_effect() {
        let config = quiet_config();
        let mut e = engine(&["482"]);
        e.start(&config).unwrap();
        let round = e.round();

        e.finish_display().unwrap();
        e.set_answer("48").unwrap();

        let effects = e
            .handle_timer(round, TimerKind::DisplayElapsed, &config)
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(e.session().state, TrainingState::Inputting);
        assert_eq!(e.session().user_answer, "48");
    }

    #[test]
    fn timer_from_an_old_round_is_dropped() {
        let mut config = quiet_config();
        config.training.auto_continue = true;
        let mut e = engine(&["111", "222"]);

        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("111", &config).unwrap();
        let old_round = e.round();

        e.next_round(&config).unwrap();
        let effects = e
            .handle_timer(old_round, TimerKind::AutoContinue, &config)
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(e.session().state, TrainingState::ShowingDigits);
        assert_eq!(e.session().current_digits, "222");
    }

    #[test]
    fn auto_continue_schedules_and_advances() {
        let mut config = quiet_config();
        config.training.auto_continue = true;
        let mut e = engine(&["482", "555"]);

        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        let effects = e.submit("000", &config).unwrap();
        assert_eq!(
            scheduled(&effects, TimerKind::AutoContinue),
            Some(Duration::from_millis(7_000 + 3 * 700))
        );

        let round = e.round();
        e.handle_timer(round, TimerKind::AutoContinue, &config)
            .unwrap();
        assert_eq!(e.session().state, TrainingState::ShowingDigits);
        assert_eq!(e.session().current_digits, "555");
        assert_ne!(e.round(), round);
    }

    #[test]
    fn auto_continue_respects_live_config() {
        let mut config = quiet_config();
        config.training.auto_continue = true;
        let mut e = engine(&["482"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("482", &config).unwrap();

        config.training.auto_continue = false;
        let round = e.round();
        e.handle_timer(round, TimerKind::AutoContinue, &config)
            .unwrap();
        assert_eq!(e.session().state, TrainingState::ResultShowing);
    }

    #[test]
    fn incomplete_answer_is_rejected() {
        let config = quiet_config();
        let mut e = engine(&["4821"]);
        let mut cfg = config.clone();
        cfg.training.current_digit_count = 4;
        e.start(&cfg).unwrap();
        show_and_hide(&mut e, &cfg);

        assert_eq!(
            e.submit("48", &cfg),
            Err(SessionError::IncompleteAnswer { got: 2, expected: 4 })
        );
        assert_eq!(e.session().state, TrainingState::Inputting);
        assert_eq!(e.session().answered(), 0);
    }

    #[test]
    fn answer_is_sanitised_and_capped() {
        let config = quiet_config();
        let mut e = engine(&["482"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);

        e.set_answer("4 8-2 9 9").unwrap();
        assert_eq!(e.session().user_answer, "482");
    }

    #[test]
    fn operations_rejected_in_wrong_state() {
        let config = quiet_config();
        let mut e = engine(&["482"]);

        assert!(matches!(
            e.submit("482", &config),
            Err(SessionError::InvalidTransition { state: TrainingState::Idle, .. })
        ));
        assert!(e.next_round(&config).is_err());
        assert!(e.finish_display().is_err());

        e.start(&config).unwrap();
        assert!(e.start(&config).is_err());
        assert!(e.end_training().is_err());
    }

    #[test]
    fn transitions_follow_the_cycle() {
        let config = quiet_config();
        let mut e = engine(&["482", "123"]);
        let mut seen = vec![e.session().state];

        e.start(&config).unwrap();
        seen.push(e.session().state);
        show_and_hide(&mut e, &config);
        seen.push(e.session().state);
        e.submit("482", &config).unwrap();
        seen.push(e.session().state);
        e.end_training().unwrap();
        seen.push(e.session().state);

        assert_eq!(
            seen,
            vec![
                TrainingState::Idle,
                TrainingState::ShowingDigits,
                TrainingState::Inputting,
                TrainingState::ResultShowing,
                TrainingState::Idle,
            ]
        );
    }

    #[test]
    fn end_training_returns_summary_and_resets() {
        let config = quiet_config();
        let mut e = engine(&["482", "111"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("482", &config).unwrap();
        e.next_round(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("112", &config).unwrap();

        let (summary, effects) = e.end_training().unwrap();
        let summary = summary.expect("answered rounds produce a summary");
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.incorrect_count, 1);
        assert_eq!(summary.score(), 3);
        assert!(effects.contains(&Effect::CancelTimers));

        assert_eq!(e.session().state, TrainingState::Idle);
        assert_eq!(e.session().answered(), 0);
        assert!(e.session().current_digits.is_empty());
    }

    #[test]
    fn set_source_keeps_the_streak_policy() {
        let mut config = quiet_config();
        let mut e = engine(&[]).with_streak_reset(StreakReset::OnAdjustment);
        e.set_source(Box::new(ScriptedDigits::new(["111", "222"])));

        e.start(&config).unwrap();
        assert_eq!(e.session().current_digits, "111");
        show_and_hide(&mut e, &config);
        let effects = e.submit("111", &config).unwrap();
        persist(&effects, &mut config);
        e.next_round(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("222", &config).unwrap();

        assert_eq!(e.session().digit_count, 4);
        assert_eq!(e.session().consecutive_correct, 0);
    }

    #[test]
    fn end_training_from_idle_has_no_summary() {
        let mut e = engine(&[]);
        let (summary, _) = e.end_training().unwrap();
        assert!(summary.is_none());
    }

    #[test]
    fn abandon_from_input_closes_it() {
        let config = quiet_config();
        let mut e = engine(&["482"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        let round = e.round();

        let effects = e.abandon();
        assert!(effects.contains(&Effect::InputClosed { round }));
        assert_eq!(e.session().state, TrainingState::Idle);
        assert_ne!(e.round(), round);
    }

    #[test]
    fn restart_begins_a_fresh_session() {
        let config = quiet_config();
        let mut e = engine(&["482", "777"]);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("482", &config).unwrap();

        e.restart(&config).unwrap();
        assert_eq!(e.session().state, TrainingState::ShowingDigits);
        assert_eq!(e.session().current_digits, "777");
        assert_eq!(e.session().correct_count, 0);
    }

    #[test]
    fn speech_effects_follow_config_and_capability() {
        let config = AppConfig::default();
        let mut e = SessionEngine::new(
            Box::new(ScriptedDigits::new(["482"])),
            Capabilities {
                speech_output: true,
                speech_input: false,
            },
        );

        let effects = e.start(&config).unwrap();
        let round = e.round();
        assert!(effects.contains(&Effect::SpeakDigits {
            round,
            digits: "482".into()
        }));
        // Display covers the speech estimate.
        assert_eq!(
            scheduled(&effects, TimerKind::DisplayElapsed),
            Some(e.timing().speech_estimate(3, &config.voice))
        );

        e.finish_display().unwrap();
        let effects = e.submit("481", &config).unwrap();
        assert!(effects.contains(&Effect::SpeakResult {
            round,
            correct: false,
            expected: "482".into()
        }));
    }

    #[test]
    fn no_speech_effects_without_capability() {
        let config = AppConfig::default();
        let mut e = engine(&["482"]);
        let effects = e.start(&config).unwrap();
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::SpeakDigits { .. })));
    }

    #[test]
    fn reset_on_adjustment_policy_is_honoured() {
        let mut config = quiet_config();
        let mut e = engine(&["111", "222"]).with_streak_reset(StreakReset::OnAdjustment);
        e.start(&config).unwrap();
        show_and_hide(&mut e, &config);
        let effects = e.submit("111", &config).unwrap();
        persist(&effects, &mut config);
        e.next_round(&config).unwrap();
        show_and_hide(&mut e, &config);
        e.submit("222", &config).unwrap();

        assert_eq!(e.session().digit_count, 4);
        assert_eq!(e.session().consecutive_correct, 0);
    }
}
