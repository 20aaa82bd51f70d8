//! Fixed-window energy analysis that decides whether a recording contains
//! real speech before we pay for a remote transcription call.

use crate::audio::AudioBuffer;
use crate::config::{
    AppConfig, DEFAULT_MIN_SPEECH_MS, DEFAULT_SILENCE_THRESHOLD, DEFAULT_WINDOW_MS,
};

/// Tunables for the speech-presence heuristic, mapped from CLI entries.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Length of one analysis window in seconds.
    pub window_seconds: f64,
    /// RMS level (normalized amplitude) below which a window counts as silence.
    pub silence_threshold: f64,
    /// Minimum summed speech-window duration before the gate opens.
    pub min_speech_duration: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_MS as f64 / 1000.0,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            min_speech_duration: DEFAULT_MIN_SPEECH_MS as f64 / 1000.0,
        }
    }
}

impl From<&AppConfig> for AnalyzerConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            window_seconds: cfg.window_ms as f64 / 1000.0,
            silence_threshold: cfg.silence_threshold,
            min_speech_duration: cfg.min_speech_ms as f64 / 1000.0,
        }
    }
}

/// One-shot judgment about a decoded buffer. Computed before any network
/// traffic and used to gate the remote call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityReport {
    pub total_duration_seconds: f64,
    /// RMS over the entire buffer, not just speech windows.
    pub rms_energy: f64,
    /// Summed duration of windows whose RMS clears the silence threshold.
    pub estimated_speech_seconds: f64,
    /// 1.0 means all silence. Defined as 1.0 for an empty buffer.
    pub silence_ratio: f64,
    pub has_speech: bool,
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Partition the buffer into consecutive windows and sum the duration of the
/// loud ones. The trailing partial window is included and contributes its
/// actual duration, so `estimated_speech_seconds` can never exceed the total.
pub fn analyze(buffer: &AudioBuffer, cfg: &AnalyzerConfig) -> ActivityReport {
    if buffer.is_empty() || buffer.sample_rate == 0 {
        return ActivityReport {
            total_duration_seconds: 0.0,
            rms_energy: 0.0,
            estimated_speech_seconds: 0.0,
            silence_ratio: 1.0,
            has_speech: false,
        };
    }

    let total_duration_seconds = buffer.duration_seconds();
    let window_len = ((cfg.window_seconds * f64::from(buffer.sample_rate)).round() as usize).max(1);

    let mut estimated_speech_seconds = 0.0;
    for window in buffer.samples.chunks(window_len) {
        if rms(window) > cfg.silence_threshold {
            estimated_speech_seconds += window.len() as f64 / f64::from(buffer.sample_rate);
        }
    }

    let rms_energy = rms(&buffer.samples);
    let silence_ratio = (1.0 - estimated_speech_seconds / total_duration_seconds).clamp(0.0, 1.0);
    // Both conditions must hold: enough loud windows, and the file as a whole
    // is not just a couple of clicks in a long silence.
    let has_speech = estimated_speech_seconds >= cfg.min_speech_duration
        && rms_energy > cfg.silence_threshold;

    ActivityReport {
        total_duration_seconds,
        rms_energy,
        estimated_speech_seconds,
        silence_ratio,
        has_speech,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn buffer(samples: Vec<f32>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: RATE,
            bits_per_sample: 16,
        }
    }

    /// 100ms windows at 16kHz.
    fn window_samples() -> usize {
        (RATE / 10) as usize
    }

    #[test]
    fn empty_buffer_reports_all_silence() {
        let report = analyze(&buffer(Vec::new()), &AnalyzerConfig::default());
        assert_eq!(report.total_duration_seconds, 0.0);
        assert_eq!(report.rms_energy, 0.0);
        assert_eq!(report.estimated_speech_seconds, 0.0);
        assert_eq!(report.silence_ratio, 1.0);
        assert!(!report.has_speech);
    }

    #[test]
    fn zero_amplitude_buffer_has_no_speech() {
        for len in [1, 100, window_samples() * 7 + 13] {
            let report = analyze(&buffer(vec![0.0; len]), &AnalyzerConfig::default());
            assert_eq!(report.rms_energy, 0.0);
            assert_eq!(report.estimated_speech_seconds, 0.0);
            assert_eq!(report.silence_ratio, 1.0);
            assert!(!report.has_speech);
        }
    }

    #[test]
    fn full_scale_buffer_is_all_speech() {
        let report = analyze(
            &buffer(vec![1.0; window_samples() * 5]),
            &AnalyzerConfig::default(),
        );
        assert!((report.rms_energy - 1.0).abs() < 1e-9);
        assert!((report.estimated_speech_seconds - 0.5).abs() < 1e-9);
        assert!(report.silence_ratio < 1e-9);
        assert!(report.has_speech);
    }

    #[test]
    fn speech_seconds_grow_with_loud_window_count() {
        let cfg = AnalyzerConfig::default();
        let mut previous = 0.0;
        for loud_windows in 1..=5 {
            let mut samples = vec![0.0f32; window_samples() * 10];
            for w in 0..loud_windows {
                let start = w * window_samples();
                samples[start..start + window_samples()].fill(0.5);
            }
            let report = analyze(&buffer(samples), &cfg);
            assert!(report.estimated_speech_seconds > previous);
            previous = report.estimated_speech_seconds;
        }
    }

    #[test]
    fn silence_ratio_stays_in_unit_range() {
        let cases = vec![
            vec![0.0f32; 17],
            vec![1.0; window_samples() * 3 + 5],
            (0..window_samples() * 4)
                .map(|i| if i % 3 == 0 { 0.4 } else { 0.0 })
                .collect(),
        ];
        for samples in cases {
            let report = analyze(&buffer(samples), &AnalyzerConfig::default());
            assert!((0.0..=1.0).contains(&report.silence_ratio));
            assert!(report.estimated_speech_seconds <= report.total_duration_seconds + 1e-9);
        }
    }

    #[test]
    fn partial_trailing_window_contributes_its_real_duration() {
        // One full loud window plus a loud half window.
        let samples = vec![0.5f32; window_samples() + window_samples() / 2];
        let report = analyze(&buffer(samples), &AnalyzerConfig::default());
        assert!((report.estimated_speech_seconds - 0.15).abs() < 1e-9);
        assert!((report.estimated_speech_seconds - report.total_duration_seconds).abs() < 1e-9);
    }

    #[test]
    fn short_blip_fails_the_minimum_duration_check() {
        // One loud 100ms window in two seconds of silence: below the 200ms
        // minimum, so the gate must stay closed.
        let mut samples = vec![0.0f32; window_samples() * 20];
        samples[..window_samples()].fill(0.8);
        let report = analyze(&buffer(samples), &AnalyzerConfig::default());
        assert!(report.estimated_speech_seconds < 0.2);
        assert!(!report.has_speech);
    }

    #[test]
    fn quiet_hum_below_threshold_is_silence() {
        let report = analyze(
            &buffer(vec![0.004f32; window_samples() * 10]),
            &AnalyzerConfig::default(),
        );
        assert_eq!(report.estimated_speech_seconds, 0.0);
        assert!(!report.has_speech);
    }
}
