//! # WAV Decoding and Encoding
//!
//! Two directions, two different jobs:
//! - **decode_wav**: reads whatever WAV container the widget uploaded (any
//!   rate, any channel count, 8/16/24-bit PCM or 32-bit float) and returns
//!   channel 0 as floats at the native rate.
//! - **encode_wav**: writes the canonical mono 16-bit PCM file the
//!   transcription endpoint expects.
//!
//! ## Canonical Header (44 bytes, little-endian):
//! ```text
//!  0 "RIFF"   4 36+data   8 "WAVE"  12 "fmt "  16 16      20 1 (PCM)
//! 22 1 (mono) 24 rate    28 rate*2  32 2       34 16      36 "data"  40 data
//! ```

use super::AudioError;
use byteorder::{ByteOrder, LittleEndian};
use std::io::Cursor;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BYTES_PER_SAMPLE: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;
const FORMAT_PCM: u16 = 1;

/// Channel 0 of a decoded container, normalised to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Quantize one float sample to signed 16-bit PCM.
///
/// Negative values scale by 32768 and non-negative values by 32767 so both
/// full-scale ends land inside the i16 range. Input is clamped to [-1.0, 1.0]
/// first; out-of-range samples saturate instead of wrapping.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0) as f64;
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Encode mono float samples as a canonical 16-bit PCM WAV file.
///
/// ## Parameters:
/// - **samples**: Mono samples, already at `sample_rate`
/// - **sample_rate**: Rate written into the header (Hz, must be > 0)
///
/// ## Returns:
/// - **Ok(Vec<u8>)**: 44-byte header followed by `samples.len() * 2` PCM bytes
/// - **Err(AudioError::InvalidArgument)**: zero rate, or too many samples for the u32 size fields
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::InvalidArgument(
            "sample rate must be positive".to_string(),
        ));
    }

    let data_len = samples
        .len()
        .checked_mul(BYTES_PER_SAMPLE as usize)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(|| {
            AudioError::InvalidArgument(format!(
                "{} samples do not fit in a WAV data chunk",
                samples.len()
            ))
        })?;

    let byte_rate = sample_rate
        .checked_mul((CHANNELS * BYTES_PER_SAMPLE) as u32)
        .ok_or_else(|| {
            AudioError::InvalidArgument(format!("sample rate {} is too large", sample_rate))
        })?;

    let mut buffer = vec![0u8; HEADER_LEN + data_len as usize];
    let header = &mut buffer[..HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    LittleEndian::write_u32(&mut header[4..8], 36 + data_len);
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    LittleEndian::write_u32(&mut header[16..20], 16);
    LittleEndian::write_u16(&mut header[20..22], FORMAT_PCM);
    LittleEndian::write_u16(&mut header[22..24], CHANNELS);
    LittleEndian::write_u32(&mut header[24..28], sample_rate);
    LittleEndian::write_u32(&mut header[28..32], byte_rate);
    LittleEndian::write_u16(&mut header[32..34], CHANNELS * BYTES_PER_SAMPLE);
    LittleEndian::write_u16(&mut header[34..36], BITS_PER_SAMPLE);
    header[36..40].copy_from_slice(b"data");
    LittleEndian::write_u32(&mut header[40..44], data_len);

    let pcm: Vec<i16> = samples.iter().map(|&s| quantize(s)).collect();
    LittleEndian::write_i16_into(&pcm, &mut buffer[HEADER_LEN..]);

    Ok(buffer)
}

/// Decode an uploaded WAV container and keep channel 0.
///
/// ## Sample Conversion:
/// - **8-bit**: unsigned, centred on 128, divided by 128
/// - **16-bit**: divided by 32768
/// - **24-bit**: divided by 8388608
/// - **32-bit float**: passed through
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, AudioError> {
    let mut cursor = Cursor::new(bytes);
    let (header, data) = ::wav::read(&mut cursor).map_err(read_error)?;

    if header.channel_count == 0 {
        return Err(AudioError::Decode("container declares zero channels".to_string()));
    }
    if header.sampling_rate == 0 {
        return Err(AudioError::Decode("container declares a zero sample rate".to_string()));
    }

    let channels = header.channel_count as usize;
    let samples = match data {
        ::wav::BitDepth::Eight(raw) => first_channel(&raw, channels, |s| (s as f32 - 128.0) / 128.0),
        ::wav::BitDepth::Sixteen(raw) => first_channel(&raw, channels, |s| s as f32 / 32768.0),
        ::wav::BitDepth::TwentyFour(raw) => first_channel(&raw, channels, |s| s as f32 / 8_388_608.0),
        ::wav::BitDepth::ThirtyTwoFloat(raw) => first_channel(&raw, channels, |s| s),
        ::wav::BitDepth::Empty => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit samples (format tag {})",
                header.bits_per_sample, header.audio_format
            )));
        }
    };

    Ok(DecodedAudio {
        sample_rate: header.sampling_rate,
        channels: header.channel_count,
        samples,
    })
}

/// The reader reports bit depths and format tags it cannot handle as
/// "Unsupported ..." errors; everything else is a malformed container.
fn read_error(err: std::io::Error) -> AudioError {
    let message = err.to_string();
    if message.starts_with("Unsupported") {
        AudioError::UnsupportedFormat(message)
    } else {
        AudioError::Decode(message)
    }
}

/// De-interleave channel 0 and convert each sample to f32.
fn first_channel<T: Copy>(interleaved: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    interleaved
        .iter()
        .step_by(channels.max(1))
        .map(|&s| convert(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        LittleEndian::read_u16(&bytes[offset..offset + 2])
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        LittleEndian::read_u32(&bytes[offset..offset + 4])
    }

    fn write_container(header: ::wav::Header, data: ::wav::BitDepth) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        ::wav::write(header, &data, &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_empty_input_is_header_only() {
        let bytes = encode_wav(&[], 16000).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(read_u32(&bytes, 4), 36);
        assert_eq!(read_u32(&bytes, 40), 0);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_wav(&[0.5, -0.5], 16000).unwrap();
        assert_eq!(bytes.len(), 48);

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(read_u32(&bytes, 4), 40);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(read_u32(&bytes, 16), 16);
        assert_eq!(read_u16(&bytes, 20), 1);
        assert_eq!(read_u16(&bytes, 22), 1);
        assert_eq!(read_u32(&bytes, 24), 16000);
        assert_eq!(read_u32(&bytes, 28), 32000);
        assert_eq!(read_u16(&bytes, 32), 2);
        assert_eq!(read_u16(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(read_u32(&bytes, 40), 4);

        let mut payload = Cursor::new(&bytes[HEADER_LEN..]);
        assert_eq!(payload.read_i16::<LittleEndian>().unwrap(), 16384);
        assert_eq!(payload.read_i16::<LittleEndian>().unwrap(), -16384);
    }

    #[test]
    fn test_quantize_scaling() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.5), 16384);
        assert_eq!(quantize(-0.5), -16384);
    }

    #[test]
    fn test_quantize_clamps_out_of_range() {
        assert_eq!(quantize(1.5), 32767);
        assert_eq!(quantize(-3.0), -32768);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            encode_wav(&[0.1], 0),
            Err(AudioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_round_trip_through_wav_reader() {
        let input: Vec<f32> = (0..1600)
            .map(|i| (i as f32 * 0.05).sin() * 0.8)
            .collect();
        let bytes = encode_wav(&input, 16000).unwrap();

        let (header, data) = ::wav::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.channel_count, 1);
        assert_eq!(header.sampling_rate, 16000);
        assert_eq!(header.bits_per_sample, 16);

        let decoded = match data {
            ::wav::BitDepth::Sixteen(samples) => samples,
            _ => panic!("expected 16-bit samples"),
        };
        assert_eq!(decoded.len(), input.len());
        for (sample, pcm) in input.iter().zip(decoded.iter()) {
            let expected = quantize(*sample) as i32;
            assert!((expected - *pcm as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_decode_keeps_first_channel() {
        let header = ::wav::Header::new(1, 2, 44100, 16);
        let interleaved = vec![16384i16, -32768, -16384, 32767, 0, 100];
        let bytes = write_container(header, ::wav::BitDepth::Sixteen(interleaved));

        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples, vec![0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_decode_eight_bit_and_float() {
        let header = ::wav::Header::new(1, 1, 8000, 8);
        let bytes = write_container(header, ::wav::BitDepth::Eight(vec![128, 0, 192]));
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.samples, vec![0.0, -1.0, 0.5]);

        let header = ::wav::Header::new(3, 1, 48000, 32);
        let bytes = write_container(header, ::wav::BitDepth::ThirtyTwoFloat(vec![0.25, -0.75]));
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 48000);
        assert_eq!(decoded.samples, vec![0.25, -0.75]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_wav(b"definitely not a riff file"),
            Err(AudioError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unsupported_bit_depth() {
        // Same layout as a 16-bit file, but the header claims 12-bit samples.
        let mut bytes = encode_wav(&[0.1, 0.2, 0.3, 0.4], 16000).unwrap();
        LittleEndian::write_u16(&mut bytes[34..36], 12);

        assert!(matches!(
            decode_wav(&bytes),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_decode_reads_encoder_output() {
        let bytes = encode_wav(&[0.5, -0.5, 0.0], 16000).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), 3);
        assert!((decoded.samples[0] - 16384.0 / 32768.0).abs() < 1e-6);
        assert_eq!(decoded.samples[1], -0.5);
        assert!((decoded.duration_seconds() - 3.0 / 16000.0).abs() < 1e-12);
    }
}
