// src/sink.rs

//! The boundary to the map widget.
//!
//! The widget itself (tiles, pan/zoom, clustering internals) lives outside this
//! crate. It is driven through [`RenderSink`] and [`ClusterContainer`].
//! [`MemorySink`] is a headless implementation that keeps markers in memory.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::bounds::Bounds;
use crate::config::{CircleStyle, MarkerStyle, ViewerConfig};
use crate::types::Point;

/// Whether markers are grouped by proximity or placed individually on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayMode {
    Clustered,
    Flat,
}

/// An opaque handle to one circle marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: u64,
    pub lat: f64,
    pub lng: f64,
    pub popup: String,
    pub fill_color: String,
    pub stroke_color: String,
    pub style: CircleStyle,
}

/// Container that groups markers visually at the current zoom level.
pub trait ClusterContainer: Send {
    fn add_layers(&mut self, markers: Vec<Marker>);
    fn clear_layers(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the viewer needs from the map widget.
pub trait RenderSink: Send {
    /// Inserts a whole batch in one call, into the cluster container when
    /// clustering, onto the map directly otherwise.
    fn add_batch(&mut self, markers: Vec<Marker>);

    /// Removes every marker, clustered or not.
    fn clear_all(&mut self);

    /// Removes one marker that was placed on the map directly.
    fn remove_individual(&mut self, marker: &Marker);

    /// Markers currently placed on the map outside the cluster container.
    fn individual_markers(&self) -> Vec<Marker>;

    fn cluster_group(&mut self) -> &mut dyn ClusterContainer;

    fn display_mode(&self) -> DisplayMode;

    /// Shows or hides the cluster container. Does not move any marker.
    fn set_display_mode(&mut self, mode: DisplayMode);

    fn zoom(&self) -> u8;

    fn fit_bounds(&mut self, bounds: &Bounds);
}

/// Turns points into markers, styled for the display mode they will live in.
#[derive(Debug)]
pub struct MarkerFactory {
    style: MarkerStyle,
    next_id: AtomicU64,
}

impl MarkerFactory {
    pub fn new(style: MarkerStyle) -> Self {
        MarkerFactory {
            style,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn marker(&self, point: &Point, mode: DisplayMode) -> Marker {
        let style = match mode {
            DisplayMode::Clustered => &self.style.clustered,
            DisplayMode::Flat => &self.style.flat,
        };
        Marker {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            lat: point.lat,
            lng: point.lng,
            popup: point.popup_html(),
            fill_color: self.style.fill_color.clone(),
            stroke_color: self.style.stroke_color.clone(),
            style: style.clone(),
        }
    }

    pub fn markers(&self, points: &[Point], mode: DisplayMode) -> Vec<Marker> {
        points.iter().map(|p| self.marker(p, mode)).collect()
    }
}

impl Default for MarkerFactory {
    fn default() -> Self {
        Self::new(MarkerStyle::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterGroup {
    markers: Vec<Marker>,
    add_calls: usize,
}

impl ClusterGroup {
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// How many times `add_layers` was called since creation.
    pub fn add_calls(&self) -> usize {
        self.add_calls
    }
}

impl ClusterContainer for ClusterGroup {
    fn add_layers(&mut self, markers: Vec<Marker>) {
        self.add_calls += 1;
        self.markers.extend(markers);
    }

    fn clear_layers(&mut self) {
        self.markers.clear();
    }

    fn len(&self) -> usize {
        self.markers.len()
    }
}

/// Headless render sink.
#[derive(Debug, Clone)]
pub struct MemorySink {
    mode: DisplayMode,
    cluster: ClusterGroup,
    individual: Vec<Marker>,
    zoom: u8,
    max_zoom: u8,
    center: (f64, f64),
    view: Option<Bounds>,
    batch_sizes: Vec<usize>,
}

impl MemorySink {
    pub fn new(initial_zoom: u8) -> Self {
        MemorySink {
            mode: DisplayMode::Clustered,
            cluster: ClusterGroup::default(),
            individual: Vec::new(),
            zoom: initial_zoom,
            max_zoom: 18,
            center: (20.0, 0.0),
            view: None,
            batch_sizes: Vec::new(),
        }
    }

    /// Starts at the configured center and zoom. Fitting never zooms past the
    /// level where clustering is disabled.
    pub fn from_config(config: &ViewerConfig) -> Self {
        MemorySink {
            max_zoom: config.cluster.disable_clustering_at_zoom,
            center: (config.initial_center[0], config.initial_center[1]),
            ..Self::new(config.initial_zoom)
        }
    }

    /// Current map center as `(lat, lng)`.
    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// Markers actually visible in the current display mode.
    pub fn rendered_count(&self) -> usize {
        match self.mode {
            DisplayMode::Clustered => self.cluster.len(),
            DisplayMode::Flat => self.individual.len(),
        }
    }

    pub fn cluster(&self) -> &ClusterGroup {
        &self.cluster
    }

    /// Sizes of every batch received through `add_batch`, in arrival order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    pub fn view(&self) -> Option<&Bounds> {
        self.view.as_ref()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(2)
    }
}

impl RenderSink for MemorySink {
    fn add_batch(&mut self, markers: Vec<Marker>) {
        self.batch_sizes.push(markers.len());
        match self.mode {
            DisplayMode::Clustered => self.cluster.add_layers(markers),
            DisplayMode::Flat => self.individual.extend(markers),
        }
    }

    fn clear_all(&mut self) {
        self.cluster.clear_layers();
        self.individual.clear();
    }

    fn remove_individual(&mut self, marker: &Marker) {
        self.individual.retain(|m| m.id != marker.id);
    }

    fn individual_markers(&self) -> Vec<Marker> {
        self.individual.clone()
    }

    fn cluster_group(&mut self) -> &mut dyn ClusterContainer {
        &mut self.cluster
    }

    fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    fn set_display_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        self.zoom = bounds.fitting_zoom(self.max_zoom);
        self.center = bounds.center();
        self.view = Some(*bounds);
    }
}
