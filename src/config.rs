use crate::error::KmlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 50;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;
/// Longest accepted pause between two batches.
pub const MAX_BATCH_DELAY_MS: u64 = 60_000;

/// Options forwarded to the clustering container of the map widget.
///
/// `disable_clustering_at_zoom` also caps the zoom reached by fitting the view in
/// [`MemorySink`](crate::sink::MemorySink). The remaining fields are read only by
/// widget-backed [`RenderSink`](crate::sink::RenderSink) implementations.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClusterOptions {
    pub chunked_loading: bool,
    pub chunk_interval_ms: u64,
    pub chunk_delay_ms: u64,
    pub spiderfy_on_max_zoom: bool,
    pub show_coverage_on_hover: bool,
    pub zoom_to_bounds_on_click: bool,
    pub max_cluster_radius: u32,
    pub disable_clustering_at_zoom: u8,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            chunked_loading: true,
            chunk_interval_ms: 200,
            chunk_delay_ms: 50,
            spiderfy_on_max_zoom: true,
            show_coverage_on_hover: false,
            zoom_to_bounds_on_click: true,
            max_cluster_radius: 50,
            disable_clustering_at_zoom: 18,
        }
    }
}

/// Circle style for one kind of marker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CircleStyle {
    pub radius: u32,
    pub weight: u32,
    pub fill_opacity: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MarkerStyle {
    pub fill_color: String,
    pub stroke_color: String,
    pub clustered: CircleStyle,
    pub flat: CircleStyle,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        MarkerStyle {
            fill_color: "#1FB8CD".to_string(),
            stroke_color: "#ffffff".to_string(),
            clustered: CircleStyle {
                radius: 6,
                weight: 2,
                fill_opacity: 0.8,
            },
            flat: CircleStyle {
                radius: 4,
                weight: 1,
                fill_opacity: 0.7,
            },
        }
    }
}

/// Tunables of the viewer.
///
/// Every field has a default, so a partial JSON document is enough to override
/// only what matters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Progress is reported every this many placemarks.
    pub progress_interval: usize,
    /// Padding in pixels (x, y) applied when fitting the view.
    pub fit_padding: [u32; 2],
    /// Initial map center as `[lat, lng]`.
    pub initial_center: [f64; 2],
    pub initial_zoom: u8,
    pub cluster: ClusterOptions,
    pub marker: MarkerStyle,
    /// Unrecognised keys, kept for integrations that need their own settings.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            fit_padding: [20, 20],
            initial_center: [20.0, 0.0],
            initial_zoom: 2,
            cluster: ClusterOptions::default(),
            marker: MarkerStyle::default(),
            extra: HashMap::new(),
        }
    }
}

impl ViewerConfig {
    /// Parses a JSON configuration document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, KmlError> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `KMLVIEW_BATCH_SIZE`, `KMLVIEW_BATCH_DELAY_MS` and
    /// `KMLVIEW_PROGRESS_INTERVAL` when they are set.
    pub fn from_env() -> Result<Self, KmlError> {
        let mut config = ViewerConfig::default();
        if let Some(size) = env_number("KMLVIEW_BATCH_SIZE")? {
            config.batch_size = size as usize;
        }
        if let Some(delay) = env_number("KMLVIEW_BATCH_DELAY_MS")? {
            config.batch_delay_ms = delay;
        }
        if let Some(interval) = env_number("KMLVIEW_PROGRESS_INTERVAL")? {
            config.progress_interval = interval as usize;
        }
        config.validate()?;
        log::debug!("Viewer configuration loaded: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KmlError> {
        if self.batch_size == 0 {
            return Err(KmlError::ConfigError(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.batch_delay_ms > MAX_BATCH_DELAY_MS {
            return Err(KmlError::ConfigError(format!(
                "batch_delay_ms must be at most {}, got {}",
                MAX_BATCH_DELAY_MS, self.batch_delay_ms
            )));
        }
        if self.progress_interval == 0 {
            return Err(KmlError::ConfigError(
                "progress_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Retrieves an extra parameter by name and attempts to deserialize it into the
    /// requested type.
    ///
    /// # Arguments
    /// * `key`: The name of the parameter to retrieve.
    ///
    /// # Returns
    /// The deserialized value, or `None` when the key is absent or has a different shape.
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

fn env_number(key: &str) -> Result<Option<u64>, KmlError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| KmlError::ConfigError(format!("{} = {:?}: {}", key, raw, e))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(KmlError::ConfigError(format!("{}: {}", key, e))),
    }
}
