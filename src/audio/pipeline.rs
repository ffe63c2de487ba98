//! Recording → upload-ready WAV.

use super::resample::{output_len, resample};
use super::wav::{decode_wav, encode_wav, HEADER_LEN};
use super::AudioError;
use tracing::{debug, warn};

/// Lowest source rate accepted. Real recorders never go below telephone
/// quality, and anything slower would be upsampled by orders of magnitude.
pub const MIN_SOURCE_RATE: u32 = 8000;

/// Result of converting one recording.
#[derive(Debug, Clone)]
pub struct ConvertedAudio {
    /// Canonical mono 16-bit PCM WAV at `target_sample_rate`
    pub wav: Vec<u8>,
    pub source_sample_rate: u32,
    pub source_channels: u16,
    pub target_sample_rate: u32,
    pub sample_count: usize,
}

impl ConvertedAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count as f64 / self.target_sample_rate as f64
    }
}

/// Decode `bytes`, downsample channel 0 to `target_rate`, and re-encode.
///
/// The output size is checked against `max_output_bytes` before anything is
/// resampled, so a container declaring a tiny rate cannot expand into an
/// unbounded allocation.
///
/// Synchronous and CPU-bound; handlers call it through `web::block`.
pub fn convert_recording(
    bytes: &[u8],
    target_rate: u32,
    max_output_bytes: usize,
) -> Result<ConvertedAudio, AudioError> {
    if target_rate == 0 {
        return Err(AudioError::InvalidArgument(
            "target sample rate must be positive".to_string(),
        ));
    }

    let decoded = decode_wav(bytes)?;
    if decoded.sample_rate < MIN_SOURCE_RATE {
        return Err(AudioError::UnsupportedFormat(format!(
            "sample rate {} Hz is below the {} Hz minimum",
            decoded.sample_rate, MIN_SOURCE_RATE
        )));
    }

    let expected_samples = output_len(decoded.samples.len(), decoded.sample_rate, target_rate);
    let expected_bytes = expected_samples
        .checked_mul(2)
        .and_then(|pcm| pcm.checked_add(HEADER_LEN))
        .unwrap_or(usize::MAX);
    if expected_bytes > max_output_bytes {
        warn!(
            source_rate = decoded.sample_rate,
            target_rate,
            expected_bytes,
            limit = max_output_bytes,
            "Converted recording would exceed size limit"
        );
        return Err(AudioError::RecordingTooLarge { limit: max_output_bytes });
    }

    let resampled = resample(&decoded.samples, decoded.sample_rate, target_rate)?;
    let wav = encode_wav(&resampled, target_rate)?;

    debug!(
        source_rate = decoded.sample_rate,
        source_channels = decoded.channels,
        source_samples = decoded.samples.len(),
        source_seconds = decoded.duration_seconds(),
        target_rate,
        target_samples = resampled.len(),
        "Recording converted"
    );

    Ok(ConvertedAudio {
        wav,
        source_sample_rate: decoded.sample_rate,
        source_channels: decoded.channels,
        target_sample_rate: target_rate,
        sample_count: resampled.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LIMIT: usize = 1024 * 1024;

    fn stereo_recording(rate: u32, frames: usize) -> Vec<u8> {
        let mut interleaved = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let left = if (i / 3) % 2 == 0 { 8192i16 } else { -8192 };
            interleaved.push(left);
            interleaved.push(0);
        }
        let header = ::wav::Header::new(1, 2, rate, 16);
        let mut out = Cursor::new(Vec::new());
        ::wav::write(header, &::wav::BitDepth::Sixteen(interleaved), &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_converts_48k_stereo_to_16k_mono() {
        let converted = convert_recording(&stereo_recording(48000, 4800), 16000, LIMIT).unwrap();

        assert_eq!(converted.source_sample_rate, 48000);
        assert_eq!(converted.source_channels, 2);
        assert_eq!(converted.target_sample_rate, 16000);
        assert_eq!(converted.sample_count, 1600);
        assert_eq!(converted.wav.len(), HEADER_LEN + 1600 * 2);
        assert!((converted.duration_seconds() - 0.1).abs() < 1e-9);

        // Left channel alternates every 3 frames, so each window of 3 is constant.
        let decoded = crate::audio::wav::decode_wav(&converted.wav).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.sample_rate, 16000);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
        assert!((decoded.samples[1] + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_target_rate_recording_passes_through() {
        let converted = convert_recording(&stereo_recording(16000, 160), 16000, LIMIT).unwrap();
        assert_eq!(converted.sample_count, 160);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            convert_recording(b"webm bytes", 16000, LIMIT),
            Err(AudioError::Decode(_))
        ));
        assert!(matches!(
            convert_recording(&stereo_recording(48000, 10), 0, LIMIT),
            Err(AudioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_implausibly_low_rate_is_rejected() {
        // 2000 samples declared at 1 Hz would upsample to 32 million at 16 kHz.
        let header = ::wav::Header::new(1, 1, 1, 8);
        let mut out = Cursor::new(Vec::new());
        ::wav::write(header, &::wav::BitDepth::Eight(vec![128; 2000]), &mut out).unwrap();

        assert!(matches!(
            convert_recording(&out.into_inner(), 16000, 100 * 1024 * 1024),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_output_limit_checked_before_resampling() {
        // 8 kHz → 16 kHz doubles the sample count: 1600 samples, 3244 bytes.
        let mono = |frames: usize| {
            let header = ::wav::Header::new(1, 1, 8000, 16);
            let mut out = Cursor::new(Vec::new());
            ::wav::write(header, &::wav::BitDepth::Sixteen(vec![100; frames]), &mut out).unwrap();
            out.into_inner()
        };

        assert_eq!(
            convert_recording(&mono(800), 16000, 3243).unwrap_err(),
            AudioError::RecordingTooLarge { limit: 3243 }
        );
        let converted = convert_recording(&mono(800), 16000, 3244).unwrap();
        assert_eq!(converted.wav.len(), 3244);
    }
}
