//! Application entry point — Digit Span trainer.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Open the [`FileStore`] (settings, records and stats under the
//!    platform config dir; missing files read as defaults).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Pick the speech adapters: an external TTS program if one is on
//!    `PATH`, and the Whisper recogniser when built with `whisper` and a
//!    model is present.
//! 5. Spawn the [`TrainerRunner`] on the runtime.
//! 6. Run [`eframe::run_native`], which blocks the main thread until the
//!    window is closed.

use std::sync::Arc;

use digit_span::{
    app::TrainerApp,
    config::{AppConfig, AppPaths},
    speech::{
        CommandSynthesizer, SilentSynthesizer, SpeechRecognizer, SpeechSynthesizer,
        UnsupportedRecognizer,
    },
    storage::{FileStore, Store},
    trainer::{TrainerCommand, TrainerRunner},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Speech adapters
// ---------------------------------------------------------------------------

fn synthesizer() -> Arc<dyn SpeechSynthesizer> {
    match CommandSynthesizer::detect() {
        Some(synth) => {
            log::info!("Speech output via {:?}", synth.program());
            Arc::new(synth)
        }
        None => {
            log::warn!("No text-to-speech program found; digits will not be read aloud");
            Arc::new(SilentSynthesizer)
        }
    }
}

#[cfg(feature = "whisper")]
fn recognizer(paths: &AppPaths) -> Arc<dyn SpeechRecognizer> {
    use digit_span::speech::whisper::{WhisperRecognizer, DEFAULT_MODEL};

    let model_path = paths.models_dir.join(DEFAULT_MODEL);
    match WhisperRecognizer::load(&model_path) {
        Ok(recognizer) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(recognizer)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Spoken answers are disabled.",
                model_path.display()
            );
            Arc::new(UnsupportedRecognizer)
        }
    }
}

#[cfg(not(feature = "whisper"))]
fn recognizer(_paths: &AppPaths) -> Arc<dyn SpeechRecognizer> {
    Arc::new(UnsupportedRecognizer)
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Digit Span")
        .with_inner_size([width, height])
        .with_min_inner_size([360.0, 300.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Digit Span starting up");

    // 2. Storage
    let paths = AppPaths::new();
    let store = Arc::new(FileStore::new(paths.clone()));
    let config = store.config();

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Speech adapters
    let synth = synthesizer();
    let recognizer = recognizer(&paths);

    // 5. Trainer loop
    let (runner, handle) = TrainerRunner::new(store, synth, recognizer);
    let view = runner.view();
    let trainer = rt.spawn(runner.run());

    // 6. Window (blocks until closed)
    let app = TrainerApp::new(handle.clone(), view);
    let result = eframe::run_native(
        "Digit Span",
        native_options(&config),
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    handle.send(TrainerCommand::Shutdown);
    if let Err(e) = rt.block_on(trainer) {
        log::warn!("Trainer task ended abnormally: {e}");
    }
    result.map_err(|e| anyhow::anyhow!("window error: {e}"))
}
