//! Digit-span trainer window — egui/eframe application.
//!
//! # Architecture
//!
//! [`TrainerApp`] is the top-level [`eframe::App`].  It never touches the
//! session engine: every frame it clones the [`SharedView`] published by the
//! trainer loop, renders it, and sends [`TrainerCommand`]s back through a
//! [`TrainerHandle`].
//!
//! # Views
//!
//! | Tab | Content |
//! |-----|---------|
//! | Training | start screen, digits, answer input, result |
//! | Stats | totals, accuracy, history (newest first), export / import |
//! | Settings | training, voice and recognition settings |
//!
//! # Training states
//!
//! | State | Visual |
//! |-------|--------|
//! | `Idle` | current level + "Start" |
//! | `ShowingDigits` | large digits (one at a time in sequential mode) + "Skip" |
//! | `Inputting` | answer field, submit, microphone |
//! | `ResultShowing` | verdict — green / orange, "Next" + "Finish" |

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use eframe::egui;

use crate::config::{AppConfig, AppPaths};
use crate::session::{RoundId, TrainingState};
use crate::storage::export_file_name;
use crate::trainer::{SharedView, TrainerCommand, TrainerHandle, TrainerView};

const GREEN: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ORANGE: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const BLUE: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Training,
    Stats,
    Settings,
}

// ---------------------------------------------------------------------------
// TrainerApp
// ---------------------------------------------------------------------------

pub struct TrainerApp {
    handle: TrainerHandle,
    view: SharedView,
    tab: Tab,

    // ── Answer field ─────────────────────────────────────────────────────
    /// Text of the answer field.
    answer: String,
    /// Last answer seen in the view; a change means a transcript or a new
    /// round replaced it.
    seen_answer: String,

    // ── Sequential display ───────────────────────────────────────────────
    /// Round on screen and when it appeared.
    shown_round: Option<(RoundId, Instant)>,

    // ── Stats / settings ─────────────────────────────────────────────────
    /// Settings being edited; taken from the view when the tab opens.
    draft: Option<AppConfig>,
    export_path: String,
    import_path: String,
    confirm_clear: bool,
}

impl TrainerApp {
    pub fn new(handle: TrainerHandle, view: SharedView) -> Self {
        let default_file = AppPaths::new()
            .config_dir
            .join(export_file_name(Utc::now()))
            .display()
            .to_string();

        Self {
            handle,
            view,
            tab: Tab::Training,
            answer: String::new(),
            seen_answer: String::new(),
            shown_round: None,
            draft: None,
            export_path: default_file.clone(),
            import_path: default_file,
            confirm_clear: false,
        }
    }

    fn send(&self, command: TrainerCommand) {
        if !self.handle.send(command) {
            log::warn!("app: trainer is not running");
        }
    }

    fn snapshot(&self) -> TrainerView {
        match self.view.lock() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Pull answer and round changes made by the trainer into local state.
    fn sync(&mut self, view: &TrainerView) {
        if view.session.user_answer != self.seen_answer {
            self.seen_answer = view.session.user_answer.clone();
            self.answer = self.seen_answer.clone();
        }

        let fresh = self.shown_round.map_or(true, |(round, _)| round != view.round);
        if fresh {
            self.shown_round = Some((view.round, Instant::now()));
        }
    }

    // ── Top bar ──────────────────────────────────────────────────────────

    fn draw_tabs(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Training, "Training");
            ui.selectable_value(&mut self.tab, Tab::Stats, "Stats");
            if ui
                .selectable_value(&mut self.tab, Tab::Settings, "Settings")
                .clicked()
            {
                self.draft = None;
            }
        });
    }

    fn draw_notice(&self, ui: &mut egui::Ui, view: &TrainerView) {
        let Some(notice) = &view.notice else {
            return;
        };
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(notice).color(ORANGE).size(12.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("x").clicked() {
                    self.send(TrainerCommand::DismissNotice);
                }
            });
        });
        ui.separator();
    }

    // ── Training tab ─────────────────────────────────────────────────────

    fn draw_training(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        match view.session.state {
            TrainingState::Idle => self.draw_idle(ui, view),
            TrainingState::ShowingDigits => self.draw_digits(ui, view),
            TrainingState::Inputting => self.draw_input(ui, view),
            TrainingState::ResultShowing => self.draw_result(ui, view),
        }

        if view.session.state != TrainingState::Idle {
            ui.add_space(12.0);
            ui.separator();
            self.draw_counters(ui, view);
        }
    }

    fn draw_idle(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        ui.add_space(16.0);
        ui.vertical_centered(|ui| {
            ui.heading("Digit Span");
            ui.label(
                egui::RichText::new(format!(
                    "Current level: {} digits",
                    view.config.training.current_digit_count
                ))
                .color(DIM),
            );
            ui.add_space(12.0);
            if ui
                .add(egui::Button::new(egui::RichText::new("Start").size(18.0)))
                .clicked()
            {
                self.send(TrainerCommand::Start);
            }

            if let Some(record) = &view.last_record {
                ui.add_space(16.0);
                ui.label(format!(
                    "Last session: {} correct, {} wrong, reached {} digits, score {}",
                    record.correct_count,
                    record.incorrect_count,
                    record.digit_count,
                    record.score
                ));
            }
        });
    }

    fn draw_digits(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        let digits = &view.session.current_digits;
        let training = &view.config.training;

        let shown = if training.sequential_display {
            let elapsed = self
                .shown_round
                .map(|(_, at)| at.elapsed())
                .unwrap_or_default();
            let per_digit = training.digit_display_duration_ms.max(1) as u128;
            let index = (elapsed.as_millis() / per_digit) as usize;
            let last = digits.chars().count().saturating_sub(1);
            digits
                .chars()
                .nth(index.min(last))
                .map(String::from)
                .unwrap_or_default()
        } else {
            digits.chars().map(String::from).collect::<Vec<_>>().join(" ")
        };

        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("Memorise").color(DIM));
            ui.add_space(8.0);
            ui.label(egui::RichText::new(shown).size(48.0).monospace().strong());
            ui.add_space(16.0);
            ui.horizontal(|ui| {
                if ui.button("Skip").clicked() {
                    self.send(TrainerCommand::FinishDisplay);
                }
                if view.speaking && ui.button("Stop voice").clicked() {
                    self.send(TrainerCommand::StopSpeech);
                }
            });
        });
    }

    fn draw_input(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        let expected = view.session.digit_count;

        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(format!("Enter the {expected} digits"));
            ui.add_space(8.0);

            let response = ui.add(
                egui::TextEdit::singleline(&mut self.answer)
                    .char_limit(expected)
                    .hint_text("digits")
                    .font(egui::TextStyle::Heading)
                    .desired_width(220.0),
            );
            if !view.listening && !response.has_focus() && !response.lost_focus() {
                response.request_focus();
            }
            if response.changed() {
                self.send(TrainerCommand::SetAnswer(self.answer.clone()));
            }

            let complete = self.answer.chars().filter(char::is_ascii_digit).count() == expected;
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let submit = ui.add_enabled(complete, egui::Button::new("Submit"));
                if submit.clicked() || (enter && complete) {
                    self.send(TrainerCommand::Submit);
                }

                if view.mic_available() {
                    let label = if view.listening {
                        egui::RichText::new("Listening…").color(BLUE)
                    } else {
                        egui::RichText::new("Speak")
                    };
                    if ui.button(label).clicked() {
                        self.send(TrainerCommand::ToggleListening);
                    }
                }

                if ui.button("Quit").clicked() {
                    self.send(TrainerCommand::Abandon);
                }
            });
        });
    }

    fn draw_result(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        let session = &view.session;
        let correct = session.is_correct == Some(true);

        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            if correct {
                ui.label(egui::RichText::new("Correct").color(GREEN).size(28.0));
            } else {
                ui.label(egui::RichText::new("Wrong").color(ORANGE).size(28.0));
                ui.label(format!("Your answer: {}", session.user_answer));
                ui.label(format!("Correct answer: {}", session.current_digits));
            }

            ui.add_space(16.0);
            ui.horizontal(|ui| {
                if ui.button("Next").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    self.send(TrainerCommand::Next);
                }
                if ui.button("Finish").clicked() {
                    self.send(TrainerCommand::End);
                }
            });
            if view.config.training.auto_continue {
                ui.label(egui::RichText::new("Next round starts automatically").color(DIM));
            }
        });
    }

    fn draw_counters(&self, ui: &mut egui::Ui, view: &TrainerView) {
        let session = &view.session;
        ui.horizontal(|ui| {
            ui.label(format!("Digits: {}", session.digit_count));
            ui.separator();
            ui.label(egui::RichText::new(format!("Correct: {}", session.correct_count)).color(GREEN));
            ui.separator();
            ui.label(
                egui::RichText::new(format!("Wrong: {}", session.incorrect_count)).color(ORANGE),
            );
            ui.separator();
            ui.label(format!("Streak: {}", session.consecutive_correct));
        });
    }

    // ── Stats tab ────────────────────────────────────────────────────────

    fn draw_stats(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        let stats = &view.stats;

        egui::Grid::new("stats")
            .num_columns(2)
            .spacing([24.0, 4.0])
            .show(ui, |ui| {
                ui.label("Sessions");
                ui.label(stats.total_trainings.to_string());
                ui.end_row();
                ui.label("Highest level");
                ui.label(format!("{} digits", stats.highest_digit_count));
                ui.end_row();
                ui.label("Answers");
                ui.label(format!("{} / {}", stats.total_correct, stats.total_questions));
                ui.end_row();
                ui.label("Accuracy");
                ui.label(format!("{}%", stats.accuracy()));
                ui.end_row();
            });

        ui.separator();
        ui.label(egui::RichText::new("History").strong());
        egui::ScrollArea::vertical()
            .max_height(140.0)
            .show(ui, |ui| {
                if view.records.is_empty() {
                    ui.label(egui::RichText::new("No sessions yet").color(DIM));
                }
                for record in view.records.iter().rev() {
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(
                                record
                                    .date
                                    .with_timezone(&Local)
                                    .format("%Y-%m-%d %H:%M")
                                    .to_string(),
                            )
                            .color(DIM),
                        );
                        ui.label(format!(
                            "{} digits  {}/{}  score {}",
                            record.digit_count,
                            record.correct_count,
                            record.questions(),
                            record.score
                        ));
                    });
                }
            });

        ui.separator();
        self.draw_transfer(ui);
    }

    fn draw_transfer(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.export_path).desired_width(260.0));
            if ui.button("Export").clicked() {
                self.send(TrainerCommand::Export(PathBuf::from(self.export_path.trim())));
            }
        });
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.import_path).desired_width(260.0));
            if ui.button("Import").clicked() {
                let path = PathBuf::from(self.import_path.trim());
                match std::fs::read_to_string(&path) {
                    Ok(json) => self.send(TrainerCommand::Import(json)),
                    Err(e) => {
                        log::warn!("app: cannot read {}: {e}", path.display());
                        if let Ok(mut view) = self.view.lock() {
                            view.notice = Some(format!("Cannot read {}: {e}", path.display()));
                        }
                    }
                }
            }
        });

        ui.add_space(4.0);
        if self.confirm_clear {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Delete all records and statistics?").color(ORANGE));
                if ui.button("Delete").clicked() {
                    self.send(TrainerCommand::ClearData);
                    self.confirm_clear = false;
                }
                if ui.button("Cancel").clicked() {
                    self.confirm_clear = false;
                }
            });
        } else if ui.button("Clear data").clicked() {
            self.confirm_clear = true;
        }
    }

    // ── Settings tab ─────────────────────────────────────────────────────

    fn draw_settings(&mut self, ui: &mut egui::Ui, view: &TrainerView) {
        let draft = self.draft.get_or_insert_with(|| view.config.clone());
        let mut save = false;
        let mut revert = false;

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.label(egui::RichText::new("Training").strong());
            let training = &mut draft.training;
            ui.checkbox(&mut training.sequential_display, "Show digits one at a time");
            if training.sequential_display {
                ui.add(
                    egui::Slider::new(&mut training.digit_display_duration_ms, 300..=3_000)
                        .text("ms per digit"),
                );
            } else {
                ui.add(
                    egui::Slider::new(&mut training.display_duration_ms, 500..=10_000)
                        .text("display ms"),
                );
            }
            ui.checkbox(&mut training.auto_continue, "Start the next round automatically");
            ui.checkbox(&mut training.auto_record, "Listen automatically after the digits");
            ui.checkbox(&mut training.auto_submit, "Submit spoken answers automatically");

            ui.add_space(8.0);
            ui.label(egui::RichText::new("Voice").strong());
            let voice = &mut draft.voice;
            ui.add_enabled(
                view.capabilities.speech_output,
                egui::Checkbox::new(&mut voice.enabled, "Read digits aloud"),
            );
            ui.add(egui::Slider::new(&mut voice.rate, 0.1..=10.0).text("rate"));
            ui.add(egui::Slider::new(&mut voice.pitch, 0.0..=2.0).text("pitch"));
            ui.add(egui::Slider::new(&mut voice.volume, 0.0..=1.0).text("volume"));
            ui.horizontal(|ui| {
                ui.label("Language");
                ui.add(egui::TextEdit::singleline(&mut voice.language).desired_width(80.0));
            });

            ui.add_space(8.0);
            ui.label(egui::RichText::new("Recognition").strong());
            let recognition = &mut draft.recognition;
            ui.add_enabled(
                view.capabilities.speech_input,
                egui::Checkbox::new(&mut recognition.enabled, "Show the microphone button"),
            );
            ui.horizontal(|ui| {
                ui.label("Language");
                ui.add(egui::TextEdit::singleline(&mut recognition.language).desired_width(80.0));
            });
            if !view.capabilities.speech_input {
                ui.label(egui::RichText::new("Speech recognition is not available").color(DIM));
            }

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                save = ui.button("Save").clicked();
                revert = ui.button("Revert").clicked();
            });
        });

        let edited = save.then(|| Box::new(draft.clone()));
        if let Some(edited) = edited {
            self.send(TrainerCommand::ApplySettings(edited));
        }
        if revert {
            self.draft = None;
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for TrainerApp {
    /// Called every frame by eframe.  Reads the view, then renders the tab.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self.snapshot();
        self.sync(&view);

        // The trainer changes state on its own (timers, transcripts).
        match view.session.state {
            TrainingState::Idle => ctx.request_repaint_after(Duration::from_millis(250)),
            _ => ctx.request_repaint_after(Duration::from_millis(50)),
        }

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| self.draw_tabs(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_notice(ui, &view);
            match self.tab {
                Tab::Training => self.draw_training(ui, &view),
                Tab::Stats => self.draw_stats(ui, &view),
                Tab::Settings => self.draw_settings(ui, &view),
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("app: window closing");
        self.send(TrainerCommand::Shutdown);
    }
}
