// src/viewer.rs

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::bounds::{fit_bounds, Bounds};
use crate::config::ViewerConfig;
use crate::error::KmlError;
use crate::fetch::{kml_param_from_page_url, KmlFetcher};
use crate::pipeline::{KmlPipeline, COMPLETE_PERCENT};
use crate::scheduler::{BatchScheduler, Generation, RenderOutcome, ScheduledRender, SharedSink};
use crate::sink::{DisplayMode, MarkerFactory, MemorySink, RenderSink};
use crate::state::ApplicationState;
use crate::status::{ProgressReporter, Stats, StatusSurface};

pub const KML_EXTENSION: &str = ".kml";

/// Rejects anything whose name does not end in `.kml` (case-insensitive).
pub fn validate_file_name(file_name: &str) -> Result<(), KmlError> {
    if file_name.to_lowercase().ends_with(KML_EXTENSION) {
        Ok(())
    } else {
        Err(KmlError::InvalidFileType(file_name.to_string()))
    }
}

/// What a successful load produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub label: String,
    pub point_count: usize,
    pub total_candidates: usize,
    pub rejected_count: usize,
    pub batch_count: usize,
}

/// The KML viewer: owns the loaded points, the status surfaces and the render sink,
/// and drives loads, clears and display-mode switches.
///
/// All operations take `&mut self`; the only suspension points are reading the
/// input (file or URL) and the scheduled batches, which run on their own task.
///
/// ```rust,no_run
/// use kmlview_rs::{KmlViewer, ViewerConfig};
/// # use kmlview_rs::KmlError;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), KmlError> {
/// let mut viewer = KmlViewer::headless(ViewerConfig::default())?;
/// let summary = viewer.load_file("stations.kml").await?;
/// println!("{} points loaded, {} rejected", summary.point_count, summary.rejected_count);
/// viewer.wait_for_render().await;
/// # Ok(())
/// # }
/// ```
pub struct KmlViewer<S: RenderSink + 'static> {
    config: ViewerConfig,
    state: ApplicationState,
    status: StatusSurface,
    sink: SharedSink<S>,
    pipeline: KmlPipeline,
    scheduler: BatchScheduler,
    fetcher: KmlFetcher,
    pending: Option<ScheduledRender>,
}

impl KmlViewer<MemorySink> {
    /// A viewer backed by an in-memory sink.
    pub fn headless(config: ViewerConfig) -> Result<Self, KmlError> {
        let sink = MemorySink::from_config(&config);
        Self::new(config, sink)
    }
}

impl<S: RenderSink + 'static> KmlViewer<S> {
    /// Creates a viewer around `sink`.
    ///
    /// # Arguments
    /// * `config`: Viewer settings. They are validated first.
    /// * `sink`: The map widget boundary. It is shared with scheduled batches.
    ///
    /// # Returns
    /// The viewer in the `Empty` state, or `ConfigError` for an invalid `config`.
    pub fn new(config: ViewerConfig, sink: S) -> Result<Self, KmlError> {
        config.validate()?;
        let factory = Arc::new(MarkerFactory::new(config.marker.clone()));
        let scheduler = BatchScheduler::new(
            config.batch_size,
            config.batch_delay(),
            Generation::new(),
            factory,
        );
        log::debug!(
            "KmlViewer initialized: batch_size={}, batch_delay={:?}",
            config.batch_size,
            config.batch_delay()
        );

        Ok(KmlViewer {
            pipeline: KmlPipeline::new(config.progress_interval),
            scheduler,
            fetcher: KmlFetcher::new()?,
            state: ApplicationState::new(),
            status: StatusSurface::new(),
            sink: Arc::new(Mutex::new(sink)),
            pending: None,
            config,
        })
    }

    /// Replaces the HTTP fetcher, e.g. to share a configured `reqwest::Client`.
    pub fn with_fetcher(mut self, fetcher: KmlFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn status(&self) -> &StatusSurface {
        &self.status
    }

    /// The render sink, shared with scheduled batches.
    pub fn sink(&self) -> SharedSink<S> {
        Arc::clone(&self.sink)
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation().current()
    }

    /// Dismisses the error slot.
    pub fn hide_error(&mut self) {
        self.status.hide_error();
    }

    /// Loads a local `.kml` file.
    ///
    /// Bytes that are not valid UTF-8 (Latin-1 exports, for instance) are replaced
    /// with U+FFFD and the document is still parsed.
    ///
    /// # Arguments
    /// * `path`: Location of the file. Its name must end in `.kml`.
    ///
    /// # Returns
    /// A `LoadSummary` of the points now held by the viewer.
    ///
    /// # Errors
    /// `InvalidFileType` before anything is read, `ReadFailure` when the file cannot
    /// be read, then whatever the pipeline reports.
    pub async fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary, KmlError> {
        let path = path.as_ref();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Err(e) = validate_file_name(&label) {
            return Err(self.fail(e));
        }

        self.begin("Loading KML file...");
        let outcome = match tokio::fs::read(path).await {
            Ok(bytes) => self.process(&label, &String::from_utf8_lossy(&bytes)),
            Err(e) => Err(KmlError::ReadFailure(format!("{}: {}", path.display(), e))),
        };
        self.finish(outcome)
    }

    /// Loads KML text that was already read, e.g. from an upload. `file_name` is
    /// checked exactly like a local file.
    pub fn load_text(&mut self, file_name: &str, text: &str) -> Result<LoadSummary, KmlError> {
        if let Err(e) = validate_file_name(file_name) {
            return Err(self.fail(e));
        }
        self.begin("Loading KML file...");
        let outcome = self.process(file_name, text);
        self.finish(outcome)
    }

    /// Fetches a remote KML document and loads it.
    pub async fn load_url(&mut self, url: &Url) -> Result<LoadSummary, KmlError> {
        self.begin("Loading KML file from URL...");
        let outcome = match self.fetcher.fetch(url).await {
            Ok(text) => self.process(url.as_str(), &text),
            Err(e) => Err(e),
        };
        self.finish(outcome)
    }

    /// Loads the document named by the `kml` query parameter of the hosting page.
    /// Does nothing when the page has no such parameter.
    pub async fn load_from_page_url(
        &mut self,
        page_url: &str,
    ) -> Result<Option<LoadSummary>, KmlError> {
        let target = match kml_param_from_page_url(page_url) {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.fail(e)),
        };
        log::info!("Loading KML from page parameter: {}", target);
        self.load_url(&target).await.map(Some)
    }

    /// Drops every point and marker, invalidates pending batches and turns
    /// clustering back on.
    pub fn clear(&mut self) {
        log::info!("Clearing {} points", self.state.point_count());
        {
            let mut sink = self.sink.lock();
            self.scheduler.generation().advance();
            sink.clear_all();
            sink.set_display_mode(DisplayMode::Clustered);
        }
        self.pending = None;
        self.state.clear();
    }

    /// Switches between clustered and flat markers and returns whether clustering
    /// is now on.
    ///
    /// Turning clustering off hides the cluster container and places one flat
    /// marker per point. Turning it on removes those markers one by one and shows
    /// the container again, rebuilding it if a reset left it incomplete.
    pub fn toggle_clustering(&mut self) -> bool {
        let enabled = self.state.toggle_clustering();
        let rebuild = {
            let mut sink = self.sink.lock();
            self.scheduler.generation().advance();
            if enabled {
                for marker in sink.individual_markers() {
                    sink.remove_individual(&marker);
                }
                sink.set_display_mode(DisplayMode::Clustered);
                let complete = sink.cluster_group().len() == self.state.point_count();
                if !complete {
                    sink.cluster_group().clear_layers();
                }
                !complete
            } else {
                sink.set_display_mode(DisplayMode::Flat);
                true
            }
        };

        if rebuild && !self.state.is_empty() {
            self.pending = Some(
                self.scheduler
                    .schedule(self.state.points(), Arc::clone(&self.sink)),
            );
        }
        log::info!(
            "Clustering {}",
            if enabled { "enabled" } else { "disabled" }
        );
        enabled
    }

    /// Centers the map on the loaded points. Returns the fitted bounds, or `None`
    /// (and touches nothing) when no points are loaded.
    pub fn fit_view(&mut self) -> Option<Bounds> {
        let Some(bounds) = fit_bounds(self.state.points(), self.config.fit_padding) else {
            log::debug!("No points to fit");
            return None;
        };
        log::debug!(
            "Fitting view on {} points: {:?}",
            self.state.point_count(),
            bounds
        );
        self.sink.lock().fit_bounds(&bounds);
        Some(bounds)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            point_count: self.state.point_count(),
            zoom: self.sink.lock().zoom(),
            fit_enabled: !self.state.is_empty(),
            clustering_enabled: self.state.clustering_enabled(),
        }
    }

    /// Waits until every batch of the latest render has run or been discarded.
    pub async fn wait_for_render(&mut self) -> Option<RenderOutcome> {
        match self.pending.take() {
            Some(render) => Some(render.wait().await),
            None => None,
        }
    }

    fn begin(&mut self, message: &str) {
        self.status.hide_error();
        self.status.show_loading(message);
    }

    fn process(&mut self, label: &str, text: &str) -> Result<LoadSummary, KmlError> {
        log::info!("Processing KML from {}, {} bytes", label, text.len());
        let result = self.pipeline.run(text, &mut self.status)?;
        let summary = LoadSummary {
            label: label.to_string(),
            point_count: result.points.len(),
            total_candidates: result.total_candidates,
            rejected_count: result.rejected_count,
            batch_count: result.points.len().div_ceil(self.scheduler.batch_size()),
        };

        self.state.apply(result, label);
        self.render();
        self.status.report(COMPLETE_PERCENT, "Completed");
        self.fit_view();
        Ok(summary)
    }

    fn render(&mut self) {
        {
            let mut sink = self.sink.lock();
            self.scheduler.generation().advance();
            sink.clear_all();
        }
        self.pending = Some(
            self.scheduler
                .schedule(self.state.points(), Arc::clone(&self.sink)),
        );
    }

    fn finish(&mut self, outcome: Result<LoadSummary, KmlError>) -> Result<LoadSummary, KmlError> {
        self.status.hide_loading();
        outcome.map_err(|e| self.fail(e))
    }

    fn fail(&mut self, error: KmlError) -> KmlError {
        log::error!("KML load failed: {}", error);
        self.status.show_error(error.user_message());
        error
    }
}
