//! Trainer loop — the single owner of the session engine.
//!
//! Every input arrives as a [`TrainerEvent`] on one unbounded mpsc channel:
//! UI commands, timer expiries, recogniser callbacks and speech completion.
//! Events are handled one at a time, so engine transitions happen in the
//! order their triggers occurred.
//!
//! ```text
//! TrainerHandle ─Command─┐
//! timer tasks ───Timer───┤
//! TranscriptSink ─Recog.─┼─▶ mpsc ─▶ TrainerRunner::dispatch
//! speech task ─Finished──┘              │
//!                                       ├─ SessionEngine → Effects
//!                                       ├─ AutoPilot     → PilotActions
//!                                       ├─ Store (adaptive triple, records, stats)
//!                                       └─ SharedView ◀── egui
//! ```
//!
//! Timers are `tokio::time::sleep` tasks.  At most one timer per
//! [`TimerKind`] is pending; each carries an id, and an expiry whose id no
//! longer matches (cancelled or replaced) is dropped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::digits::{DigitSource, RandomDigits};
use crate::session::{
    AutoPilot, Effect, PilotAction, RoundId, SessionEngine, SessionError, StreakReset,
    TimerKind,
};
use crate::speech::{
    result_message, speak_digits, Capabilities, ListenHandle, RecognitionEvent, SpeechError,
    SpeechRecognizer, SpeechSynthesizer, TranscriptSink,
};
use crate::storage::{export_json, import_data, Store};

use super::state::{SharedView, TrainerView};

// ---------------------------------------------------------------------------
// Commands / events
// ---------------------------------------------------------------------------

/// Requests from the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainerCommand {
    Start,
    /// Hide the digits now.
    FinishDisplay,
    SetAnswer(String),
    Submit,
    Next,
    End,
    /// Leave the session without a record.
    Abandon,
    Restart,
    ToggleListening,
    StopSpeech,
    /// Save edited settings; the adaptive triple is kept.
    ApplySettings(Box<AppConfig>),
    /// Write an export document to the given file.
    Export(PathBuf),
    /// Import an export document.
    Import(String),
    /// Clear the history and reset the statistics.
    ClearData,
    DismissNotice,
    Shutdown,
}

#[derive(Debug)]
enum TrainerEvent {
    Command(TrainerCommand),
    Timer {
        round: RoundId,
        kind: TimerKind,
        id: u64,
    },
    Recognition {
        round: RoundId,
        event: RecognitionEvent,
    },
    SpeechFinished {
        id: u64,
    },
}

enum Utterance {
    Digits(String),
    Text(String),
}

// ---------------------------------------------------------------------------
// TrainerHandle
// ---------------------------------------------------------------------------

/// Cloneable sender for [`TrainerCommand`]s.
#[derive(Debug, Clone)]
pub struct TrainerHandle {
    tx: mpsc::UnboundedSender<TrainerEvent>,
}

impl TrainerHandle {
    /// Returns `false` once the trainer has shut down.
    pub fn send(&self, command: TrainerCommand) -> bool {
        self.tx.send(TrainerEvent::Command(command)).is_ok()
    }
}

// ---------------------------------------------------------------------------
// TrainerRunner
// ---------------------------------------------------------------------------

/// Drives the session engine and auto-pilot.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use digit_span::speech::{SilentSynthesizer, UnsupportedRecognizer};
/// use digit_span::storage::MemoryStore;
/// use digit_span::trainer::{TrainerCommand, TrainerRunner};
///
/// # async fn example() {
/// let (runner, handle) = TrainerRunner::new(
///     Arc::new(MemoryStore::default()),
///     Arc::new(SilentSynthesizer),
///     Arc::new(UnsupportedRecognizer),
/// );
/// let view = runner.view();
/// tokio::spawn(runner.run());
///
/// handle.send(TrainerCommand::Start);
/// # drop(view);
/// # }
/// ```
pub struct TrainerRunner {
    engine: SessionEngine,
    pilot: AutoPilot,
    store: Arc<dyn Store>,
    synth: Arc<dyn SpeechSynthesizer>,
    recognizer: Arc<dyn SpeechRecognizer>,
    view: SharedView,
    /// Live configuration.  The runner is the only writer of the stored
    /// config, so this copy is always current.
    config: AppConfig,
    tx: mpsc::UnboundedSender<TrainerEvent>,
    rx: mpsc::UnboundedReceiver<TrainerEvent>,
    timers: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    next_id: u64,
    speech: Option<(u64, JoinHandle<()>)>,
    listening: Option<(RoundId, ListenHandle)>,
}

impl TrainerRunner {
    pub fn new(
        store: Arc<dyn Store>,
        synth: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> (Self, TrainerHandle) {
        let capabilities = Capabilities::detect(&*synth, &*recognizer);
        log::info!(
            "trainer: speech output {}, speech input {}",
            if capabilities.speech_output { "available" } else { "unavailable" },
            if capabilities.speech_input { "available" } else { "unavailable" },
        );

        let config = store.config();
        let view = super::state::new_shared_view(TrainerView::new(
            config.clone(),
            store.stats(),
            store.records(),
            capabilities,
        ));
        let engine = SessionEngine::new(Box::new(RandomDigits::new()), capabilities);
        let pilot = AutoPilot::new(*engine.timing());

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TrainerHandle { tx: tx.clone() };

        let runner = Self {
            engine,
            pilot,
            store,
            synth,
            recognizer,
            view,
            config,
            tx,
            rx,
            timers: HashMap::new(),
            next_id: 0,
            speech: None,
            listening: None,
        };
        (runner, handle)
    }

    /// Replace the digit source (reproducible sessions).
    pub fn with_digit_source(mut self, source: Box<dyn DigitSource>) -> Self {
        self.engine.set_source(source);
        self
    }

    pub fn with_streak_reset(mut self, streak_reset: StreakReset) -> Self {
        let engine = std::mem::take(&mut self.engine);
        self.engine = engine.with_streak_reset(streak_reset);
        self
    }

    pub fn view(&self) -> SharedView {
        Arc::clone(&self.view)
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Handle events until [`TrainerCommand::Shutdown`].
    pub async fn run(mut self) {
        log::info!("trainer: running");
        while let Some(event) = self.rx.recv().await {
            if !self.dispatch(event) {
                break;
            }
        }

        self.cancel_timers();
        self.stop_speech();
        self.stop_listening();
        log::info!("trainer: shut down");
    }

    /// Handle one event.  Returns `false` on shutdown.
    fn dispatch(&mut self, event: TrainerEvent) -> bool {
        match event {
            TrainerEvent::Command(TrainerCommand::Shutdown) => return false,
            TrainerEvent::Command(command) => self.handle_command(command),
            TrainerEvent::Timer { round, kind, id } => self.handle_timer(round, kind, id),
            TrainerEvent::Recognition { round, event } => self.handle_recognition(round, event),
            TrainerEvent::SpeechFinished { id } => {
                if self.speech.as_ref().is_some_and(|(current, _)| *current == id) {
                    self.speech = None;
                }
            }
        }
        self.publish();
        true
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, command: TrainerCommand) {
        log::debug!("trainer: command {command:?}");
        match command {
            TrainerCommand::Start => {
                let result = self.engine.start(&self.config);
                self.apply_engine(result);
            }
            TrainerCommand::FinishDisplay => {
                let result = self.engine.finish_display();
                self.apply_engine(result);
            }
            TrainerCommand::SetAnswer(raw) => {
                if let Err(e) = self.engine.set_answer(&raw) {
                    log::debug!("trainer: {e}");
                }
            }
            TrainerCommand::Submit => {
                let result = self.engine.submit_current(&self.config);
                self.apply_engine(result);
            }
            TrainerCommand::Next => {
                let result = self.engine.next_round(&self.config);
                self.apply_engine(result);
            }
            TrainerCommand::End => self.end_training(),
            TrainerCommand::Abandon => {
                let effects = self.engine.abandon();
                self.apply_effects(effects);
            }
            TrainerCommand::Restart => {
                let result = self.engine.restart(&self.config);
                self.apply_engine(result);
            }
            TrainerCommand::ToggleListening => {
                let actions = self.pilot.toggle_listening(
                    self.engine.round(),
                    self.engine.session(),
                    self.engine.capabilities(),
                );
                self.apply_pilot(actions);
            }
            TrainerCommand::StopSpeech => self.stop_speech(),
            TrainerCommand::ApplySettings(edited) => self.apply_settings(&edited),
            TrainerCommand::Export(path) => self.export(path),
            TrainerCommand::Import(json) => self.import(&json),
            TrainerCommand::ClearData => self.clear_data(),
            TrainerCommand::DismissNotice => self.set_notice(None),
            TrainerCommand::Shutdown => {}
        }
    }

    fn handle_timer(&mut self, round: RoundId, kind: TimerKind, id: u64) {
        let current = self
            .timers
            .get(&kind)
            .is_some_and(|(pending, _)| *pending == id);
        if !current {
            return;
        }
        self.timers.remove(&kind);

        match kind {
            TimerKind::DisplayElapsed | TimerKind::AutoContinue => {
                let result = self.engine.handle_timer(round, kind, &self.config);
                self.apply_engine(result);
            }
            TimerKind::RecordSettle | TimerKind::AutoSubmit => {
                let actions = self.pilot.on_timer(
                    round,
                    kind,
                    self.engine.session(),
                    &self.config,
                    self.engine.capabilities(),
                );
                self.apply_pilot(actions);
            }
        }
    }

    fn handle_recognition(&mut self, round: RoundId, event: RecognitionEvent) {
        let active = self.listening.is_some_and(|(r, _)| r == round);

        match event {
            RecognitionEvent::Digits(digits) => {
                if round == self.engine.round() {
                    let actions = self.pilot.on_transcript(
                        round,
                        &digits,
                        self.engine.session(),
                        &self.config,
                    );
                    self.apply_pilot(actions);
                }
            }
            RecognitionEvent::End => {
                if active {
                    self.listening = None;
                    self.pilot.set_listening(false);
                }
            }
            RecognitionEvent::Error(error) => {
                if active {
                    let actions = self.pilot.on_recognition_error(&error);
                    self.apply_pilot(actions);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Engine effects / pilot actions
    // -----------------------------------------------------------------------

    fn apply_engine(&mut self, result: Result<Vec<Effect>, SessionError>) {
        match result {
            Ok(effects) => self.apply_effects(effects),
            Err(SessionError::IncompleteAnswer { expected, .. }) => {
                self.set_notice(Some(format!("Enter all {expected} digits")));
            }
            Err(e @ SessionError::InvalidTransition { .. }) => {
                log::debug!("trainer: {e}");
            }
            Err(e @ SessionError::Digits(_)) => {
                log::error!("trainer: {e}");
                self.set_notice(Some(e.to_string()));
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Schedule { round, kind, after } => self.schedule(round, kind, after),
                Effect::CancelTimers => self.cancel_timers(),
                Effect::SpeakDigits { digits, .. } => self.speak(Utterance::Digits(digits)),
                Effect::SpeakResult {
                    correct, expected, ..
                } => {
                    let text = result_message(correct, &expected, &self.config.voice.language);
                    self.speak(Utterance::Text(text));
                }
                Effect::StopSpeech => self.stop_speech(),
                Effect::PersistAdaptive(adaptive) => match self.store.save_adaptive(&adaptive) {
                    Ok(config) => self.config = config,
                    Err(e) => {
                        log::warn!("trainer: cannot persist difficulty: {e}");
                        adaptive.write_to(&mut self.config.training);
                    }
                },
                Effect::RoundStarted { round } => self.pilot.begin_round(round),
                Effect::InputOpened { round } => {
                    let actions =
                        self.pilot
                            .on_input_opened(round, &self.config, self.engine.capabilities());
                    self.apply_pilot(actions);
                }
                Effect::InputClosed { round } => {
                    let actions = self.pilot.on_input_closed(round);
                    self.apply_pilot(actions);
                }
            }
        }
    }

    fn apply_pilot(&mut self, actions: Vec<PilotAction>) {
        for action in actions {
            match action {
                PilotAction::StopSpeech => self.stop_speech(),
                PilotAction::StartListening { round } => self.start_listening(round),
                PilotAction::StopListening => self.stop_listening(),
                PilotAction::SetAnswer(value) => {
                    if let Err(e) = self.engine.set_answer(&value) {
                        log::debug!("trainer: transcript ignored: {e}");
                    }
                }
                PilotAction::Schedule { round, kind, after } => self.schedule(round, kind, after),
                PilotAction::Submit { round } => {
                    if round == self.engine.round() {
                        let result = self.engine.submit_current(&self.config);
                        self.apply_engine(result);
                    }
                }
                PilotAction::Notice(message) => self.set_notice(Some(message)),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Schedule `kind`, replacing a pending timer of the same kind.
    fn schedule(&mut self, round: RoundId, kind: TimerKind, after: Duration) {
        let id = self.next_id();
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(TrainerEvent::Timer { round, kind, id });
        });

        if let Some((_, previous)) = self.timers.insert(kind, (id, task)) {
            previous.abort();
        }
        log::debug!("trainer: {kind:?} for round {round} in {after:?}");
    }

    fn cancel_timers(&mut self) {
        for (_, (_, task)) in self.timers.drain() {
            task.abort();
        }
    }

    // -----------------------------------------------------------------------
    // Speech
    // -----------------------------------------------------------------------

    fn speak(&mut self, utterance: Utterance) {
        self.stop_speech();
        if !self.config.voice.enabled || !self.engine.capabilities().speech_output {
            return;
        }

        let id = self.next_id();
        let synth = Arc::clone(&self.synth);
        let voice = self.config.voice.clone();
        let pause = self.engine.timing().inter_digit_pause(&voice);
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            let result = match utterance {
                Utterance::Digits(digits) => speak_digits(&*synth, &digits, &voice, pause).await,
                Utterance::Text(text) => synth.speak(&text, &voice).await,
            };
            match result {
                Ok(()) | Err(SpeechError::Cancelled) => {}
                Err(e) => log::warn!("trainer: speech failed: {e}"),
            }
            let _ = tx.send(TrainerEvent::SpeechFinished { id });
        });
        self.speech = Some((id, task));
    }

    fn stop_speech(&mut self) {
        if let Some((_, task)) = self.speech.take() {
            task.abort();
        }
        self.synth.stop();
    }

    fn start_listening(&mut self, round: RoundId) {
        if self.listening.is_some() {
            return;
        }

        let tx = self.tx.clone();
        let sink = TranscriptSink::new(move |event| {
            let _ = tx.send(TrainerEvent::Recognition { round, event });
        });

        match self
            .recognizer
            .start_listening(&self.config.recognition.language, sink)
        {
            Some(handle) => {
                log::debug!("trainer: listening for round {round}");
                self.listening = Some((round, handle));
                self.pilot.set_listening(true);
            }
            None => {
                self.pilot.set_listening(false);
                self.set_notice(Some("Could not start listening".into()));
            }
        }
    }

    fn stop_listening(&mut self) {
        if let Some((_, handle)) = self.listening.take() {
            self.recognizer.stop_listening(Some(handle));
        }
        self.pilot.set_listening(false);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn end_training(&mut self) {
        let (summary, effects) = match self.engine.end_training() {
            Ok(done) => done,
            Err(e) => {
                log::debug!("trainer: {e}");
                return;
            }
        };
        self.apply_effects(effects);

        let Some(summary) = summary else {
            return;
        };

        let saved = self
            .store
            .save_training_record(&summary)
            .and_then(|record| {
                let stats = self.store.update_user_stats(&record)?;
                Ok((record, stats))
            });

        match saved {
            Ok((record, stats)) => {
                if let Ok(mut view) = self.view.lock() {
                    view.records.push(record.clone());
                    view.stats = stats;
                    view.last_record = Some(record);
                }
            }
            Err(e) => {
                log::warn!("trainer: cannot save training record: {e}");
                self.set_notice(Some(format!("Could not save the session: {e}")));
            }
        }
    }

    fn apply_settings(&mut self, edited: &AppConfig) {
        let mut config = self.config.clone();
        config.apply_preferences(edited);
        match self.store.save_config(&config) {
            Ok(()) => log::info!("trainer: settings saved"),
            Err(e) => {
                log::warn!("trainer: cannot save settings: {e}");
                self.set_notice(Some(format!("Could not save settings: {e}")));
            }
        }
        self.config = config;
    }

    fn export(&mut self, path: PathBuf) {
        let written = export_json(&*self.store)
            .and_then(|json| std::fs::write(&path, json).map_err(Into::into));
        match written {
            Ok(()) => {
                log::info!("trainer: exported to {}", path.display());
                self.set_notice(Some(format!("Exported to {}", path.display())));
            }
            Err(e) => {
                log::warn!("trainer: export failed: {e}");
                self.set_notice(Some(format!("Export failed: {e}")));
            }
        }
    }

    fn import(&mut self, json: &str) {
        match import_data(&*self.store, json) {
            Ok(summary) => {
                self.config = self.store.config();
                self.refresh_history();
                self.set_notice(Some(format!(
                    "Imported {} records",
                    summary.imported_records
                )));
            }
            Err(e) => {
                log::warn!("trainer: import failed: {e}");
                self.set_notice(Some(format!("Import failed: {e}")));
            }
        }
    }

    fn clear_data(&mut self) {
        let result = self
            .store
            .clear_records()
            .and_then(|()| self.store.reset_stats().map(|_| ()));
        match result {
            Ok(()) => self.set_notice(Some("Training data cleared".into())),
            Err(e) => {
                log::warn!("trainer: cannot clear data: {e}");
                self.set_notice(Some(format!("Could not clear data: {e}")));
            }
        }
        self.refresh_history();
    }

    fn refresh_history(&mut self) {
        let records = self.store.records();
        let stats = self.store.stats();
        if let Ok(mut view) = self.view.lock() {
            view.records = records;
            view.stats = stats;
        }
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    fn set_notice(&mut self, notice: Option<String>) {
        if let Ok(mut view) = self.view.lock() {
            view.notice = notice;
        }
    }

    fn publish(&self) {
        if let Ok(mut view) = self.view.lock() {
            view.session = self.engine.session().clone();
            view.round = self.engine.round();
            view.config = self.config.clone();
            view.listening = self.listening.is_some();
            view.speaking = self.speech.is_some();
            view.capabilities = self.engine.capabilities();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digits::ScriptedDigits;
    use crate::session::TrainingState;
    use crate::speech::{MockRecognizer, MockSynthesizer, SilentSynthesizer, UnsupportedRecognizer};
    use crate::storage::MemoryStore;

    fn quiet_store() -> Arc<MemoryStore> {
        let mut config = AppConfig::default();
        config.voice.enabled = false;
        Arc::new(MemoryStore::with_config(config))
    }

    fn spawn_runner(
        store: Arc<MemoryStore>,
        synth: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
        script: &[&str],
    ) -> (SharedView, TrainerHandle, JoinHandle<()>) {
        let (runner, handle) = TrainerRunner::new(store, synth, recognizer);
        let runner =
            runner.with_digit_source(Box::new(ScriptedDigits::new(script.iter().copied())));
        let view = runner.view();
        let task = tokio::spawn(runner.run());
        (view, handle, task)
    }

    /// Let the runner drain its queue.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn state(view: &SharedView) -> TrainingState {
        view.lock().unwrap().session.state
    }

    #[tokio::test(start_paused = true)]
    async fn manual_session_is_recorded() {
        let store = quiet_store();
        let (view, handle, task) = spawn_runner(
            Arc::clone(&store),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482", "111"],
        );

        handle.send(TrainerCommand::Start);
        settle().await;
        assert_eq!(state(&view), TrainingState::ShowingDigits);
        assert_eq!(view.lock().unwrap().session.current_digits, "482");

        wait(2_000).await;
        assert_eq!(state(&view), TrainingState::Inputting);

        handle.send(TrainerCommand::SetAnswer("482".into()));
        handle.send(TrainerCommand::Submit);
        settle().await;
        assert_eq!(view.lock().unwrap().session.is_correct, Some(true));
        assert_eq!(store.config().training.consecutive_correct, 1);

        handle.send(TrainerCommand::Next);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("112".into()));
        handle.send(TrainerCommand::Submit);
        handle.send(TrainerCommand::End);
        settle().await;

        assert_eq!(state(&view), TrainingState::Idle);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].correct_count, 1);
        assert_eq!(records[0].incorrect_count, 1);
        assert_eq!(records[0].score, 3);
        assert_eq!(store.stats().total_questions, 2);

        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.stats.total_trainings, 1);
        assert!(snapshot.last_record.is_some());

        handle.send(TrainerCommand::Shutdown);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ending_without_answers_saves_nothing() {
        let store = quiet_store();
        let (view, handle, _task) = spawn_runner(
            Arc::clone(&store),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::Abandon);
        handle.send(TrainerCommand::End);
        settle().await;

        assert_eq!(state(&view), TrainingState::Idle);
        assert!(store.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_submit_shows_a_notice() {
        let (view, handle, _task) = spawn_runner(
            quiet_store(),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("4".into()));
        handle.send(TrainerCommand::Submit);
        settle().await;

        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.session.state, TrainingState::Inputting);
        assert_eq!(snapshot.notice.as_deref(), Some("Enter all 3 digits"));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_continue_starts_the_next_round() {
        let store = quiet_store();
        let mut config = store.config();
        config.training.auto_continue = true;
        store.save_config(&config).unwrap();

        let (view, handle, _task) = spawn_runner(
            store,
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482", "555"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("481".into()));
        handle.send(TrainerCommand::Submit);
        settle().await;
        assert_eq!(state(&view), TrainingState::ResultShowing);

        // Wrong answer at 3 digits: 7000 + 3 * 700.
        wait(9_000).await;
        assert_eq!(state(&view), TrainingState::ResultShowing);
        wait(200).await;
        assert_eq!(state(&view), TrainingState::ShowingDigits);
        assert_eq!(view.lock().unwrap().session.current_digits, "555");
    }

    #[tokio::test(start_paused = true)]
    async fn manual_next_cancels_auto_continue() {
        let store = quiet_store();
        let mut config = store.config();
        config.training.auto_continue = true;
        store.save_config(&config).unwrap();

        let (view, handle, _task) = spawn_runner(
            store,
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482", "555", "999"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("482".into()));
        handle.send(TrainerCommand::Submit);
        handle.send(TrainerCommand::Next);
        handle.send(TrainerCommand::FinishDisplay);
        settle().await;
        assert_eq!(state(&view), TrainingState::Inputting);

        // The first round's 3 s auto-continue must not fire into round two.
        wait(3_500).await;
        assert_eq!(state(&view), TrainingState::Inputting);
        assert_eq!(view.lock().unwrap().session.current_digits, "555");
    }

    #[tokio::test(start_paused = true)]
    async fn spoken_answer_is_auto_submitted() {
        let store = Arc::new(MemoryStore::default());
        let mut config = store.config();
        config.training.auto_record = true;
        config.training.auto_submit = true;
        store.save_config(&config).unwrap();

        let synth = Arc::new(MockSynthesizer::default());
        let recognizer = Arc::new(MockRecognizer::default());
        let (view, handle, _task) = spawn_runner(
            store,
            Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
            &["482"],
        );

        handle.send(TrainerCommand::Start);
        settle().await;

        // Display covers the speech estimate (6.1 s at rate 1.0).
        wait(6_000).await;
        assert_eq!(state(&view), TrainingState::ShowingDigits);
        wait(200).await;
        assert_eq!(state(&view), TrainingState::Inputting);
        assert_eq!(recognizer.start_count(), 0);

        wait(500).await;
        assert_eq!(recognizer.start_count(), 1);
        assert!(view.lock().unwrap().listening);

        recognizer.emit_digits("4");
        settle().await;
        assert_eq!(view.lock().unwrap().session.user_answer, "4");

        recognizer.emit_digits("482");
        wait(400).await;

        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.session.state, TrainingState::ResultShowing);
        assert_eq!(snapshot.session.is_correct, Some(true));
        assert!(!snapshot.listening);

        settle().await;
        assert_eq!(synth.spoken(), vec!["请注意听", "4", "8", "2", "正确"]);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_transcript_does_not_submit() {
        let store = quiet_store();
        let mut config = store.config();
        config.training.auto_record = true;
        config.training.auto_submit = true;
        store.save_config(&config).unwrap();

        let recognizer = Arc::new(MockRecognizer::default());
        let (view, handle, _task) = spawn_runner(
            store,
            Arc::new(SilentSynthesizer),
            Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
            &["482"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        wait(600).await;
        assert_eq!(recognizer.start_count(), 1);

        recognizer.emit_digits("481");
        settle().await;
        recognizer.emit_digits("48");
        wait(5_000).await;

        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.session.state, TrainingState::Inputting);
        assert_eq!(snapshot.session.user_answer, "48");
        assert_eq!(snapshot.notice, None);

        recognizer.emit_digits("482");
        wait(400).await;
        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.session.state, TrainingState::ResultShowing);
        assert_eq!(snapshot.session.is_correct, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_recognition_error_reverts_to_manual_input() {
        let store = Arc::new(MemoryStore::default());
        let mut config = store.config();
        config.voice.enabled = false;
        config.recognition.enabled = true;
        store.save_config(&config).unwrap();

        let recognizer = Arc::new(MockRecognizer::default());
        let (view, handle, _task) = spawn_runner(
            store,
            Arc::new(SilentSynthesizer),
            Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
            &["482"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::ToggleListening);
        settle().await;
        assert!(view.lock().unwrap().listening);

        recognizer.emit_error(crate::speech::RecognitionError::NoSpeech);
        settle().await;
        assert!(view.lock().unwrap().listening);

        recognizer.emit_error(crate::speech::RecognitionError::Failed("mic unplugged".into()));
        settle().await;

        let snapshot = view.lock().unwrap().clone();
        assert!(!snapshot.listening);
        assert_eq!(snapshot.session.state, TrainingState::Inputting);
        assert!(snapshot
            .notice
            .as_deref()
            .is_some_and(|n| n.contains("mic unplugged")));
    }

    #[tokio::test(start_paused = true)]
    async fn settings_keep_the_adaptive_triple() {
        let store = quiet_store();
        let (view, handle, _task) = spawn_runner(
            Arc::clone(&store),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["111", "222"],
        );

        let stale = view.lock().unwrap().config.clone();

        for digits in ["111", "222"] {
            handle.send(TrainerCommand::Start);
            handle.send(TrainerCommand::FinishDisplay);
            handle.send(TrainerCommand::SetAnswer(digits.into()));
            handle.send(TrainerCommand::Submit);
            handle.send(TrainerCommand::End);
        }
        settle().await;
        assert_eq!(store.config().training.current_digit_count, 4);

        let mut edited = stale;
        edited.training.display_duration_ms = 5_000;
        handle.send(TrainerCommand::ApplySettings(Box::new(edited)));
        settle().await;

        let saved = store.config();
        assert_eq!(saved.training.display_duration_ms, 5_000);
        assert_eq!(saved.training.current_digit_count, 4);
        assert_eq!(view.lock().unwrap().config, saved);
    }

    #[tokio::test(start_paused = true)]
    async fn import_and_clear_go_through_the_store() {
        let source = quiet_store();
        let record = source
            .save_training_record(&crate::session::SessionSummary {
                digit_count: 5,
                correct_count: 2,
                incorrect_count: 0,
            })
            .unwrap();
        source.update_user_stats(&record).unwrap();
        let json = export_json(&*source).unwrap();

        let store = quiet_store();
        let (view, handle, _task) = spawn_runner(
            Arc::clone(&store),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &[],
        );

        handle.send(TrainerCommand::Import("{\"data\":{}}".into()));
        settle().await;
        assert!(store.records().is_empty());
        assert!(view
            .lock()
            .unwrap()
            .notice
            .as_deref()
            .is_some_and(|n| n.starts_with("Import failed")));

        handle.send(TrainerCommand::Import(json));
        settle().await;
        assert_eq!(store.records().len(), 1);
        assert_eq!(view.lock().unwrap().records.len(), 1);
        assert_eq!(view.lock().unwrap().stats.highest_digit_count, 5);

        handle.send(TrainerCommand::ClearData);
        settle().await;
        assert!(store.records().is_empty());
        assert_eq!(store.stats(), crate::storage::UserStats::default());
        assert!(view.lock().unwrap().records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn import_between_rounds_sets_the_next_round() {
        let source = quiet_store();
        let mut imported = source.config();
        imported.training.current_digit_count = 7;
        source.save_config(&imported).unwrap();
        let json = export_json(&*source).unwrap();

        let store = quiet_store();
        let (view, handle, _task) = spawn_runner(
            Arc::clone(&store),
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &["482", "1234567"],
        );

        handle.send(TrainerCommand::Start);
        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("482".into()));
        handle.send(TrainerCommand::Submit);
        handle.send(TrainerCommand::Import(json));
        handle.send(TrainerCommand::Next);
        settle().await;

        let snapshot = view.lock().unwrap().clone();
        assert_eq!(snapshot.session.state, TrainingState::ShowingDigits);
        assert_eq!(snapshot.session.digit_count, 7);
        assert_eq!(snapshot.session.current_digits, "1234567");

        handle.send(TrainerCommand::FinishDisplay);
        handle.send(TrainerCommand::SetAnswer("1234567".into()));
        handle.send(TrainerCommand::Submit);
        settle().await;

        let training = store.config().training;
        assert_eq!(training.current_digit_count, 7);
        assert_eq!(training.consecutive_correct, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn digit_source_keeps_the_streak_policy() {
        let store = quiet_store();
        let (runner, handle) = TrainerRunner::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
        );
        let runner = runner
            .with_streak_reset(StreakReset::OnAdjustment)
            .with_digit_source(Box::new(ScriptedDigits::new(["111", "222", "3333"])));
        let _task = tokio::spawn(runner.run());

        handle.send(TrainerCommand::Start);
        for (i, digits) in ["111", "222", "3333"].into_iter().enumerate() {
            if i > 0 {
                handle.send(TrainerCommand::Next);
            }
            handle.send(TrainerCommand::FinishDisplay);
            handle.send(TrainerCommand::SetAnswer(digits.into()));
            handle.send(TrainerCommand::Submit);
        }
        settle().await;

        // Streaks restart at the adjustment, so the third answer stays at 4.
        let training = store.config().training;
        assert_eq!(training.current_digit_count, 4);
        assert_eq!(training.consecutive_correct, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn export_writes_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let store = quiet_store();
        let (view, handle, _task) = spawn_runner(
            store,
            Arc::new(SilentSynthesizer),
            Arc::new(UnsupportedRecognizer),
            &[],
        );

        handle.send(TrainerCommand::Export(path.clone()));
        settle().await;

        let json = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        assert!(view
            .lock()
            .unwrap()
            .notice
            .as_deref()
            .is_some_and(|n| n.starts_with("Exported")));

        handle.send(TrainerCommand::Export(dir.path().join("missing/dir/x.json")));
        settle().await;
        assert!(view
            .lock()
            .unwrap()
            .notice
            .as_deref()
            .is_some_and(|n| n.starts_with("Export failed")));
    }
}
