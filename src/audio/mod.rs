//! # Audio Pipeline Module
//!
//! Turns a recorded voice message into the WAV file the remote transcription
//! endpoint accepts.
//!
//! ## Key Components:
//! - **Capture**: Collects recorded chunks into one completed recording
//! - **WAV**: Decodes uploaded containers and encodes canonical 16-bit PCM WAV
//! - **Resample**: Box-filter downsampling to the target rate
//! - **Pipeline**: decode → resample → encode in one call
//!
//! ## Output Format:
//! - **Sample Rate**: 16kHz (16,000 Hz) by default
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers behind a 44-byte header

use std::fmt;

pub mod capture;   // Ordered chunk collection for one recording
pub mod pipeline;  // decode → resample → encode
pub mod resample;  // Averaging downsampler
pub mod wav;       // WAV decoding and encoding

/// Errors produced by the audio pipeline.
///
/// The pure transforms (resample, encode) only ever return `InvalidArgument`;
/// the remaining variants come from decoding and capture.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// A precondition was violated (zero sample rate, oversized payload)
    InvalidArgument(String),

    /// The container parsed but holds a sample format we cannot convert
    UnsupportedFormat(String),

    /// The uploaded bytes are not a readable audio container
    Decode(String),

    /// The capture session stopped without receiving any audio
    EmptyRecording,

    /// Every capture handle went away before `stop` was sent
    CaptureAborted,

    /// The recording grew beyond the configured byte limit
    RecordingTooLarge { limit: usize },
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AudioError::UnsupportedFormat(msg) => write!(f, "Unsupported audio format: {}", msg),
            AudioError::Decode(msg) => write!(f, "Audio decode failed: {}", msg),
            AudioError::EmptyRecording => write!(f, "No audio was captured"),
            AudioError::CaptureAborted => write!(f, "Recording ended without a stop signal"),
            AudioError::RecordingTooLarge { limit } => {
                write!(f, "Recording exceeds the {} byte limit", limit)
            }
        }
    }
}

impl std::error::Error for AudioError {}
