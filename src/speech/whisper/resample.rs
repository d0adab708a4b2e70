//! Channel mixing and resampling to the 16 kHz mono input Whisper expects.

use rubato::{FftFixedIn, Resampler};
use thiserror::Error;

pub const WHISPER_RATE: u32 = 16_000;

/// Input frames per resampler call.
const CHUNK_FRAMES: usize = 1_024;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("cannot build resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Average interleaved channels down to mono.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample mono `samples` from `source_rate` to [`WHISPER_RATE`].
pub fn to_whisper_rate(samples: &[f32], source_rate: u32) -> Result<Vec<f32>, ResampleError> {
    if source_rate == WHISPER_RATE || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        WHISPER_RATE as usize,
        CHUNK_FRAMES,
        2,
        1,
    )?;

    let expected = samples.len() as u64 * u64::from(WHISPER_RATE) / u64::from(source_rate);
    let mut out = Vec::with_capacity(expected as usize + CHUNK_FRAMES);

    let mut chunks = samples.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let frames = resampler.process(&[chunk][..], None)?;
        out.extend_from_slice(&frames[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let frames = resampler.process_partial(Some(&[rest][..]), None)?;
        out.extend_from_slice(&frames[0]);
    }

    Ok(out)
}
