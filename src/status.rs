// src/status.rs

//! What the viewer exposes outward besides the map: a loading indicator with a
//! progress bar, a single error slot and a small statistics block.

use serde::Serialize;

/// Receives progress updates from a pipeline run.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8, message: &str);
}

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub percent: u8,
    pub message: String,
}

/// Records every update, mostly useful in tests and for replaying a run.
impl ProgressReporter for Vec<Progress> {
    fn report(&mut self, percent: u8, message: &str) {
        self.push(Progress {
            percent,
            message: message.to_string(),
        });
    }
}

/// Values shown in the statistics panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub point_count: usize,
    pub zoom: u8,
    /// The "fit view" control is only usable when there is something to fit.
    pub fit_enabled: bool,
    pub clustering_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSurface {
    loading: bool,
    progress: Option<Progress>,
    error: Option<String>,
}

impl StatusSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the loading indicator and resets the progress bar to 0%.
    pub fn show_loading(&mut self, message: &str) {
        log::debug!("Showing loading indicator: {}", message);
        self.loading = true;
        self.progress = Some(Progress {
            percent: 0,
            message: message.to_string(),
        });
    }

    pub fn hide_loading(&mut self) {
        log::debug!("Hiding loading indicator");
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Replaces whatever error is showing; there is only ever one.
    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("Showing error: {}", message);
        self.error = Some(message);
    }

    pub fn hide_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl ProgressReporter for StatusSurface {
    fn report(&mut self, percent: u8, message: &str) {
        let percent = percent.min(100);
        log::debug!("Progress {}%: {}", percent, message);
        self.progress = Some(Progress {
            percent,
            message: message.to_string(),
        });
    }
}
