//! # Averaging Downsampler
//!
//! Converts a mono sample buffer from its native rate to the target rate with
//! a box filter: every output sample is the mean of a contiguous window of
//! input samples.
//!
//! ## Window Layout:
//! With `ratio = input_rate / output_rate`, output sample `i` averages the
//! input range `[cursor, round((i + 1) * ratio))`, after which the cursor
//! moves to the end of that range. Windows never overlap and never leave gaps;
//! only the tail past the last window can be dropped, and that tail is shorter
//! than one window.
//!
//! Speech headed for a transcription service tolerates the aliasing this
//! introduces, and the whole pass is a single O(n) loop.

use super::AudioError;

/// Resample `samples` from `input_rate` to `output_rate`.
///
/// ## Returns:
/// - **Ok(Vec<f32>)**: `round(len / ratio)` samples; an exact copy when the rates match
/// - **Err(AudioError::InvalidArgument)**: either rate is zero
pub fn resample(samples: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, AudioError> {
    if input_rate == 0 || output_rate == 0 {
        return Err(AudioError::InvalidArgument(format!(
            "sample rates must be positive (input {}, output {})",
            input_rate, output_rate
        )));
    }

    if input_rate == output_rate {
        return Ok(samples.to_vec());
    }

    let ratio = input_rate as f64 / output_rate as f64;
    let output_len = output_len(samples.len(), input_rate, output_rate);
    let mut output = Vec::with_capacity(output_len);
    let mut cursor = 0usize;

    for i in 0..output_len {
        let end = window_end(i, ratio);
        let window = samples.get(cursor..end.min(samples.len())).unwrap_or(&[]);

        let value = if window.is_empty() {
            0.0
        } else {
            let sum: f64 = window.iter().map(|&s| s as f64).sum();
            (sum / window.len() as f64) as f32
        };

        output.push(value);
        cursor = end;
    }

    Ok(output)
}

/// Number of samples [`resample`] produces for `input_len` samples.
///
/// Callers use it to bound the output before allocating. Both rates must be
/// non-zero.
pub fn output_len(input_len: usize, input_rate: u32, output_rate: u32) -> usize {
    if input_rate == output_rate {
        return input_len;
    }
    let ratio = input_rate as f64 / output_rate as f64;
    (input_len as f64 / ratio).round() as usize
}

/// Exclusive end of the input window for output index `i`.
fn window_end(i: usize, ratio: f64) -> usize {
    ((i + 1) as f64 * ratio).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_rates_match() {
        let input = vec![0.25, -0.5, 1.0, 0.0, -1.0];
        let output = resample(&input, 16000, 16000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_length_law() {
        let input = vec![0.1f32; 48000];
        assert_eq!(resample(&input, 48000, 16000).unwrap().len(), 16000);

        let input = vec![0.1f32; 44100];
        assert_eq!(resample(&input, 44100, 16000).unwrap().len(), 16000);

        // 1000 / (44100 / 16000) = 362.8... rounds to 363
        let input = vec![0.1f32; 1000];
        assert_eq!(resample(&input, 44100, 16000).unwrap().len(), 363);
    }

    #[test]
    fn test_windows_are_averaged() {
        let output = resample(&[1.0, 1.0, -1.0, -1.0], 4, 2).unwrap();
        assert_eq!(output, vec![1.0, -1.0]);

        let output = resample(&[0.0, 0.5, 1.0, 0.2, 0.4, 0.6], 3, 1).unwrap();
        assert_eq!(output.len(), 2);
        assert!((output[0] - 0.5).abs() < 1e-6);
        assert!((output[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 48000, 16000).unwrap().is_empty());
        assert!(resample(&[], 16000, 16000).unwrap().is_empty());
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            resample(&[0.5], 0, 16000),
            Err(AudioError::InvalidArgument(_))
        ));
        assert!(matches!(
            resample(&[0.5], 48000, 0),
            Err(AudioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_trailing_window_can_be_empty() {
        // ratio 2.5 over 3 samples: length round(1.2) = 1, window [0, 3)
        let output = resample(&[0.3, 0.3, 0.3], 5, 2).unwrap();
        assert_eq!(output.len(), 1);
        assert!((output[0] - 0.3).abs() < 1e-6);

        // ratio 2.5 over 2 samples: length round(0.8) = 1, window [0, 3) clipped to [0, 2)
        let output = resample(&[0.2, 0.4], 5, 2).unwrap();
        assert_eq!(output.len(), 1);
        assert!((output[0] - 0.3).abs() < 1e-6);

        // ratio 0.5: the second window [1, 1) holds nothing
        let output = resample(&[0.8], 1, 2).unwrap();
        assert_eq!(output, vec![0.8, 0.0]);
    }

    #[test]
    fn test_windows_cover_input_once() {
        // A ramp makes every window mean distinct, so shifted or overlapping
        // windows show up in the output.
        let ramp: Vec<f32> = (0..22).map(|i| i as f32 / 32.0).collect();

        // ratio 2.75: windows [0,3) [3,6) [6,8) [8,11) [11,14) [14,17) [17,19) [19,22)
        let output = resample(&ramp, 11, 4).unwrap();
        let bounds = [(0, 3), (3, 6), (6, 8), (8, 11), (11, 14), (14, 17), (17, 19), (19, 22)];
        assert_eq!(output.len(), bounds.len());
        for (sample, &(start, end)) in output.iter().zip(bounds.iter()) {
            let expected = ramp[start..end].iter().sum::<f32>() / (end - start) as f32;
            assert!(
                (sample - expected).abs() < 1e-6,
                "window [{}, {}) averaged to {} instead of {}",
                start, end, sample, expected
            );
        }

        // ratio 2.5 over 7 samples: round(2.8) = 3 outputs over [0,3) [3,5) [5,8)
        // clipped to [5,7); nothing is dropped and nothing is read twice.
        let ramp: Vec<f32> = (0..7).map(|i| i as f32).collect();
        let output = resample(&ramp, 5, 2).unwrap();
        assert_eq!(output, vec![1.0, 3.5, 5.5]);

        // 1001 samples at 32k → 16k: 501 windows of two, the last one holding
        // only the final sample.
        let ramp: Vec<f32> = (0..1001).map(|i| i as f32 / 1000.0).collect();
        let output = resample(&ramp, 32000, 16000).unwrap();
        assert_eq!(output.len(), 501);
        assert!((output[0] - 0.0005).abs() < 1e-6);
        assert!((output[499] - 0.9985).abs() < 1e-6);
        assert!((output[500] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_output_len_matches_resample() {
        for &(input_rate, output_rate, len) in &[
            (48000u32, 16000u32, 4800usize),
            (44100, 16000, 1000),
            (8000, 16000, 333),
            (16000, 16000, 77),
        ] {
            let input = vec![0.0f32; len];
            assert_eq!(
                resample(&input, input_rate, output_rate).unwrap().len(),
                output_len(len, input_rate, output_rate)
            );
        }
        assert_eq!(output_len(2000, 1, 16000), 32_000_000);
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let input = vec![-0.75f32; 4410];
        let output = resample(&input, 44100, 16000).unwrap();
        assert!(output.iter().all(|&s| (s + 0.75).abs() < 1e-6));
    }
}
