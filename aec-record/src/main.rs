//! Record echo-cancelled microphone audio to a mono 16-bit WAV file.
//!
//! Runs a short self-test first to check that the microphone delivers
//! signal, then records for the requested duration.
//!
//! ```sh
//! RUST_LOG=info aec-record --duration 10 --output take1.wav
//! ```

mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use aec_capture_core::{
    write_metadata, write_recording, AecEngine, CaptureError, CaptureOrchestrator, EchoCancellingEngine,
    RecordingResult, SessionConfig, SyntheticEngine,
};

use console::ConsoleDelegate;

/// Tone played by the synthetic engine.
const SYNTHETIC_FREQUENCY: f64 = 440.0;
const SYNTHETIC_AMPLITUDE: f32 = 0.25;

#[derive(Parser, Debug)]
#[command(name = "aec-record", about = "Record echo-cancelled microphone audio to a WAV file")]
struct Args {
    /// Recording duration in seconds.
    #[arg(short, long, default_value = "10", value_parser = parse_seconds)]
    duration: Duration,

    /// Output WAV path.
    #[arg(short, long, default_value = "recorded_audio_aec.wav")]
    output: PathBuf,

    /// Self-test duration in seconds.
    #[arg(long, default_value = "3", value_parser = parse_seconds)]
    self_test_duration: Duration,

    /// Skip the microphone self-test.
    #[arg(long)]
    skip_self_test: bool,

    /// Abort if the self-test detects no signal.
    #[arg(long, conflicts_with = "skip_self_test")]
    require_self_test: bool,

    /// Use a generated tone instead of the microphone.
    #[arg(long)]
    synthetic: bool,

    /// Do not write the JSON metadata sidecar.
    #[arg(long)]
    no_metadata: bool,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("self-test failed: peak amplitude {peak:.4} not above {threshold}")]
    SelfTestFailed { peak: f32, threshold: f32 },
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("duration must be positive".into());
    }
    let duration = Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())?;
    let limit = SessionConfig::default().max_duration();
    if duration > limit {
        return Err(format!("duration must be at most {}s", limit.as_secs()));
    }
    Ok(duration)
}

/// Process exit status: 0 on success, 255 (-1 as seen by a shell) on failure.
fn exit_status(outcome: &Result<RecordingResult, RunError>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 255,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let outcome = if args.synthetic {
        run(synthetic_engine(), &args)
    } else {
        run_platform(&args)
    };

    match &outcome {
        Ok(result) => println!(
            "Saved {:.2}s to {} (sha256 {})",
            result.duration_secs,
            result.file_path.display(),
            result.checksum
        ),
        Err(e) => eprintln!("error: {}", e),
    }
    ExitCode::from(exit_status(&outcome))
}

fn synthetic_engine() -> SyntheticEngine {
    SyntheticEngine::sine(SYNTHETIC_FREQUENCY, SYNTHETIC_AMPLITUDE)
}

#[cfg(target_os = "macos")]
fn run_platform(args: &Args) -> Result<RecordingResult, RunError> {
    let sample_rate = SessionConfig::default().sample_rate;
    run(aec_capture_macos::VoiceProcessingEngine::new(sample_rate), args)
}

#[cfg(not(target_os = "macos"))]
fn run_platform(args: &Args) -> Result<RecordingResult, RunError> {
    log::warn!("no echo-cancelling backend for this platform, using the synthetic engine");
    run(synthetic_engine(), args)
}

fn run<E: EchoCancellingEngine>(engine: E, args: &Args) -> Result<RecordingResult, RunError> {
    let engine = AecEngine::new(engine);
    if !engine.is_available() {
        log::warn!("input device reports unavailable");
    }
    println!("Input device: {}", engine.device_info().name);

    let mut session = CaptureOrchestrator::new(engine);
    session.set_delegate(Arc::new(ConsoleDelegate));

    if args.skip_self_test {
        log::info!("self-test skipped");
    } else {
        let config = SessionConfig::self_test().with_duration(args.self_test_duration);
        println!("Self-test: speak into the microphone...");
        let report = session.self_test(&config)?;
        if report.passed {
            println!("Self-test passed (peak {:.4})", report.statistics.max_amplitude);
        } else if args.require_self_test {
            return Err(RunError::SelfTestFailed {
                peak: report.statistics.max_amplitude,
                threshold: report.threshold,
            });
        } else {
            println!(
                "Self-test found no signal (peak {:.4}); check the microphone. Recording anyway.",
                report.statistics.max_amplitude
            );
        }
    }

    let config = SessionConfig::recording().with_duration(args.duration);
    println!("Recording for {:.1}s...", args.duration.as_secs_f64());
    let recording = session.record(&config)?;

    let result = write_recording(&recording, &args.output)?;
    if !args.no_metadata {
        let path = write_metadata(&result.metadata, &result.file_path)?;
        log::info!("metadata written to {}", path.display());
    }
    Ok(result)
}
