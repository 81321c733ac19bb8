//! Progress log for sheet generation
//!
//! Records each step of a generation run so the web UI can replay it as a
//! progress bar with status lines.

use serde::Serialize;
use tracing::info;

/// One completed step of a generation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStep {
    /// Overall completion after this step (0-100)
    pub percent: u8,
    /// Status line shown to the user
    pub message: String,
}

/// Tracks the steps of a generation run
#[derive(Debug, Default)]
pub struct ProgressLog {
    steps: Vec<ProgressStep>,
    /// Whether to log steps (false for tests/quiet mode)
    show_output: bool,
}

impl ProgressLog {
    /// Create a progress log that also reports through tracing
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            show_output: true,
        }
    }

    /// Create a quiet progress log (no output)
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Record a step; percentages never go backwards
    pub fn step(&mut self, percent: u8, message: impl Into<String>) {
        let floor = self.percent();
        let percent = percent.clamp(floor, 100);
        let message = message.into();
        if self.show_output {
            info!("[{:>3}%] {}", percent, message);
        }
        self.steps.push(ProgressStep { percent, message });
    }

    /// Mark the run as finished
    pub fn complete(&mut self) {
        self.step(100, "✅ Génération terminée !");
    }

    /// Current completion percentage
    pub fn percent(&self) -> u8 {
        self.steps.last().map(|s| s.percent).unwrap_or(0)
    }

    /// Get the recorded steps
    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ProgressStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_log() {
        let mut log = ProgressLog::quiet();
        assert_eq!(log.percent(), 0);

        log.step(25, "ToC");
        log.step(50, "Pages");

        assert_eq!(log.percent(), 50);
        assert_eq!(log.steps().len(), 2);
        assert_eq!(log.steps()[0].message, "ToC");
    }

    #[test]
    fn test_percent_is_monotonic() {
        let mut log = ProgressLog::quiet();
        log.step(75, "late");
        log.step(10, "early");
        assert_eq!(log.percent(), 75);

        log.complete();
        assert_eq!(log.percent(), 100);
        assert_eq!(log.into_steps().len(), 3);
    }
}
