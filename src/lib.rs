//! Digit-span memory trainer.
//!
//! Shows a random digit sequence, hides it, collects a typed or spoken
//! reproduction, scores it and adapts the sequence length.
//!
//! # Layout
//!
//! ```text
//! digits   ── random sequences, answer validation, input sanitising
//! config   ── settings.toml (training / voice / recognition / ui)
//! storage  ── records, stats, adaptive triple, export / import
//! speech   ── text-to-speech + speech-to-text adapters
//! session  ── SessionEngine state machine + AutoPilot
//! trainer  ── event loop driving the engine (timers, speech callbacks)
//! app      ── egui front-end
//! ```

pub mod app;
pub mod config;
pub mod digits;
pub mod session;
pub mod speech;
pub mod storage;
pub mod trainer;
