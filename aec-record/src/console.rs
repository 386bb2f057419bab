use std::io::{self, Write};

use aec_capture_core::models::audio_models::CaptureProgress;
use aec_capture_core::models::error::CaptureWarning;
use aec_capture_core::models::state::SessionPhase;
use aec_capture_core::traits::capture_delegate::CaptureDelegate;

/// Prints a single updating progress line per capture.
pub struct ConsoleDelegate;

impl CaptureDelegate for ConsoleDelegate {
    fn on_phase_changed(&self, phase: &SessionPhase) {
        match phase {
            SessionPhase::Draining => println!(),
            SessionPhase::Failed(e) => eprintln!("capture failed: {}", e),
            _ => log::debug!("session phase: {:?}", phase),
        }
    }

    fn on_progress(&self, progress: &CaptureProgress) {
        print!("\r{}", progress_line(progress));
        let _ = io::stdout().flush();
    }

    fn on_warning(&self, warning: &CaptureWarning) {
        eprintln!("warning: {}", warning);
    }
}

pub fn progress_line(progress: &CaptureProgress) -> String {
    format!(
        "  {:>5.1}s / {:.1}s ({:>3.0}%)  peak {:.4}  rms {:.4}",
        progress.elapsed_secs,
        progress.target_secs,
        progress.percent(),
        progress.statistics.max_amplitude,
        progress.statistics.max_rms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aec_capture_core::processing::atomic_stats::StatisticsSnapshot;

    #[test]
    fn progress_line_shows_time_and_levels() {
        let line = progress_line(&CaptureProgress {
            elapsed_secs: 2.5,
            target_secs: 10.0,
            statistics: StatisticsSnapshot {
                max_amplitude: 0.5,
                max_rms: 0.25,
                ..Default::default()
            },
        });
        assert_eq!(line, "    2.5s / 10.0s ( 25%)  peak 0.5000  rms 0.2500");
    }
}
