//! Microphone capture via `cpal`.
//!
//! [`MicCapture`] opens the default input device.  [`MicCapture::start`]
//! streams [`AudioChunk`]s over an mpsc channel; the returned
//! [`StreamGuard`] stops the stream when dropped.  `cpal::Stream` is not
//! `Send` on every platform, so the guard must stay on the thread that
//! created it.

use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

/// One buffer of interleaved `f32` samples from the cpal callback.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Keeps the cpal stream alive.
pub struct StreamGuard {
    _stream: cpal::Stream,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no microphone found")]
    NoDevice,

    #[error("failed to query microphone config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to open microphone stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start microphone stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub struct MicCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl MicCapture {
    /// Use the default input device at its preferred configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;

        Ok(Self {
            device,
            config: supported.into(),
            sample_rate,
            channels,
        })
    }

    /// Whether the host reports any input device at all.
    pub fn available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamGuard, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Receiver gone means listening ended.
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            |err: cpal::StreamError| {
                log::error!("speech: microphone stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamGuard { _stream: stream })
    }
}
