pub mod bounds;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod geopoint;
pub mod pipeline;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod status;
pub mod types;
pub mod viewer;

pub use bounds::{fit_bounds, Bounds};
pub use config::ViewerConfig;
pub use error::KmlError;
pub use geopoint::{parse_coordinates, GeoPoint};
pub use pipeline::KmlPipeline;
pub use scheduler::{partition, BatchScheduler, Generation};
pub use sink::{DisplayMode, MemorySink, RenderSink};
pub use state::ApplicationState;
pub use viewer::{KmlViewer, LoadSummary};

// Value types shared across the pipeline
pub use types::{Batch, LoadResult, Point, RawPlacemarkRecord};
