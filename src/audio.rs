//! WAV decoding. Turns a PCM file into normalized mono samples so the rest of
//! the app never has to think about bit depths or channel layouts.

use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Failures while reading or interpreting a WAV file. All of these are fatal
/// to the run; there is no partial decode.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read WAV data: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported WAV encoding: {bits}-bit {format:?} (expected 8/16/32-bit integer PCM or 32-bit float)")]
    UnsupportedFormat { bits: u16, format: SampleFormat },
    #[error("WAV header declares zero channels")]
    NoChannels,
}

/// Decoded audio, already down-mixed to one channel and normalized to
/// [-1.0, 1.0]. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioBuffer {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Open and decode a PCM WAV file from disk.
pub fn decode_wav_file(path: &Path) -> Result<AudioBuffer, DecodeError> {
    decode_wav(WavReader::open(path)?)
}

/// Decode an already-opened WAV stream. Split out from [`decode_wav_file`] so
/// tests can round-trip through an in-memory cursor.
pub fn decode_wav<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer, DecodeError> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DecodeError::NoChannels);
    }

    // hound already centers 8-bit WAV (unsigned on disk) into i8 for us.
    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| f32::from(v) / 128.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32_768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()?,
        (format, bits) => return Err(DecodeError::UnsupportedFormat { bits, format }),
    };

    Ok(AudioBuffer {
        samples: downmix(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
    })
}

/// Average interleaved frames down to mono. Channel averaging (rather than
/// picking one channel) keeps energy from a one-sided recording visible to
/// the analyzer.
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let channels = usize::from(channels);
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
