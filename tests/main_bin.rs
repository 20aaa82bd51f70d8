use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::PathBuf;
use std::process::Command;

const RATE: u32 = 16_000;

fn write_wav(label: &str, samples: &[i16]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "speechgate-bin-{label}-{}.wav",
        std::process::id()
    ));
    let spec = WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).expect("create wav");
    for &s in samples {
        writer.write_sample(s).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

fn loud_samples(seconds: f64) -> Vec<i16> {
    let count = (seconds * f64::from(RATE)) as usize;
    (0..count)
        .map(|i| {
            let t = i as f64 / f64::from(RATE);
            ((t * 220.0 * 2.0 * std::f64::consts::PI).sin() * 12_000.0) as i16
        })
        .collect()
}

#[test]
fn analyze_only_reports_speech_in_a_loud_file() {
    let path = write_wav("loud", &loud_samples(1.0));
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg(&path)
        .arg("--analyze-only")
        .output()
        .expect("run speechgate");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Audio analysis for"));
    assert!(stdout.contains("Duration:        1.00s"));
    assert!(stdout.contains("Has speech:      true"));
    // Analyze-only must never mention the provider.
    assert!(!stdout.contains("Provider round trip"));
}

#[test]
fn silent_file_is_skipped_without_any_network_call() {
    let path = write_wav("silent", &vec![0i16; RATE as usize * 2]);
    // No credentials in the environment: if the gate leaked a provider call
    // it would fail on missing credentials rather than print the skip notice.
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg(&path)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_ACCESS_TOKEN")
        .output()
        .expect("run speechgate");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Has speech:      false"));
    assert!(stdout.contains("No meaningful speech detected in the audio file."));
    assert!(stdout.contains("Skipping transcription to prevent hallucination."));
}

#[test]
fn loud_file_without_credentials_fails_visibly() {
    let path = write_wav("nocreds", &loud_samples(1.0));
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg(&path)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_ACCESS_TOKEN")
        .output()
        .expect("run speechgate");
    let _ = std::fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"));
}

#[test]
fn out_of_range_flag_is_rejected() {
    let path = write_wav("badflag", &loud_samples(0.2));
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg(&path)
        .arg("--confidence-threshold")
        .arg("1.5")
        .output()
        .expect("run speechgate");
    let _ = std::fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--confidence-threshold must be between 0 and 1"));
}

#[test]
fn missing_file_is_a_fatal_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg("/no/such/clip.wav")
        .output()
        .expect("run speechgate");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("audio file not found"));
}

#[test]
fn non_wav_bytes_fail_to_decode() {
    let path = std::env::temp_dir().join(format!(
        "speechgate-bin-notwav-{}.wav",
        std::process::id()
    ));
    std::fs::write(&path, b"definitely not RIFF data").expect("write file");
    let output = Command::new(env!("CARGO_BIN_EXE_speechgate"))
        .arg(&path)
        .arg("--analyze-only")
        .output()
        .expect("run speechgate");
    let _ = std::fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to decode"));
}
