// src/state.rs

use chrono::{DateTime, Utc};

use crate::types::{LoadResult, Point};

/// Whether a point set is currently loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    Empty,
    Loaded,
}

/// Where the current point set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSource {
    /// File name or URL.
    pub label: String,
    pub loaded_at: DateTime<Utc>,
}

/// The canonical point set and display settings.
///
/// There is a single writer: every mutation takes `&mut self` and none of them
/// suspends, so readers never observe a half-replaced set.
#[derive(Debug, Clone)]
pub struct ApplicationState {
    points: Vec<Point>,
    clustering_enabled: bool,
    source: Option<LoadSource>,
}

impl Default for ApplicationState {
    fn default() -> Self {
        ApplicationState {
            points: Vec::new(),
            clustering_enabled: true,
            source: None,
        }
    }
}

impl ApplicationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn status(&self) -> StateStatus {
        if self.points.is_empty() {
            StateStatus::Empty
        } else {
            StateStatus::Loaded
        }
    }

    pub fn clustering_enabled(&self) -> bool {
        self.clustering_enabled
    }

    pub fn source(&self) -> Option<&LoadSource> {
        self.source.as_ref()
    }

    /// Replaces the whole point set with the result of a load.
    pub fn apply(&mut self, result: LoadResult, label: impl Into<String>) {
        let label = label.into();
        log::info!(
            "Replacing {} points with {} points from {}",
            self.points.len(),
            result.points.len(),
            label
        );
        self.points = result.points;
        self.source = Some(LoadSource {
            label,
            loaded_at: Utc::now(),
        });
    }

    /// Drops every point and turns clustering back on.
    pub fn clear(&mut self) {
        self.points.clear();
        self.source = None;
        self.clustering_enabled = true;
    }

    /// Flips clustering and returns the new value.
    pub fn toggle_clustering(&mut self) -> bool {
        self.clustering_enabled = !self.clustering_enabled;
        self.clustering_enabled
    }
}
