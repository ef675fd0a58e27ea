//! Progress and stage reporting utilities.
//!
//! Provides spinners for pipeline stages and a progress bar for table writes,
//! with support for log-only mode where they are hidden for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::Stage;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Spinner plus timer for one pipeline stage.
pub struct StageProgress {
    stage: Stage,
    spinner: ProgressBar,
    started: Instant,
}

impl StageProgress {
    pub fn start(stage: Stage, msg: &str) -> Self {
        Self {
            stage,
            spinner: create_spinner(msg),
            started: Instant::now(),
        }
    }

    /// Stop the spinner and report the stage summary with its duration.
    pub fn finish(self, summary: &str) -> Duration {
        let elapsed = self.started.elapsed();
        let line = format!("[{}] {} ({})", self.stage, summary, format_duration(elapsed));
        self.spinner.finish_with_message(line.clone());
        // Spinners are hidden in log-only mode, so the log carries the summary
        if is_log_only() {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs_f64(12.34)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_stage_progress_reports_elapsed() {
        set_log_only(true);
        let stage = StageProgress::start(Stage::Cleaner, "Cleaning");
        let elapsed = stage.finish("done");
        assert!(elapsed < Duration::from_secs(5));
    }
}
