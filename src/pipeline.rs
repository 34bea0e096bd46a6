// src/pipeline.rs

use crate::config::DEFAULT_PROGRESS_INTERVAL;
use crate::document::XmlDocument;
use crate::error::KmlError;
use crate::extractor::extract_placemarks;
use crate::geopoint::parse_coordinates;
use crate::status::ProgressReporter;
use crate::types::{LoadResult, Point};

pub const PARSED_PERCENT: u8 = 20;
pub const EXTRACTED_PERCENT: u8 = 40;
pub const PROCESSED_PERCENT: u8 = 80;
pub const COMPLETE_PERCENT: u8 = 100;

/// Element name browsers insert when they fail to parse a document.
const PARSER_ERROR_TAG: &str = "parsererror";

/// Forwards progress to a reporter while keeping it monotonic and within 0..=100.
pub struct ProgressTracker<'r, R: ProgressReporter + ?Sized> {
    reporter: &'r mut R,
    last: u8,
}

impl<'r, R: ProgressReporter + ?Sized> ProgressTracker<'r, R> {
    pub fn new(reporter: &'r mut R) -> Self {
        ProgressTracker { reporter, last: 0 }
    }

    pub fn advance(&mut self, percent: u8, message: &str) {
        let percent = percent.clamp(self.last, COMPLETE_PERCENT);
        self.last = percent;
        self.reporter.report(percent, message);
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

/// Turns KML text into validated points.
#[derive(Debug, Clone)]
pub struct KmlPipeline {
    progress_interval: usize,
}

impl Default for KmlPipeline {
    fn default() -> Self {
        KmlPipeline {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl KmlPipeline {
    pub fn new(progress_interval: usize) -> Self {
        KmlPipeline {
            progress_interval: progress_interval.max(1),
        }
    }

    /// Parses `text`, extracts every placemark and keeps those with valid coordinates.
    ///
    /// Progress goes to 20% once the document is parsed, 40% once placemarks are
    /// located, then climbs towards 80% while records are processed. The final 100%
    /// belongs to whoever applies the result.
    ///
    /// # Errors
    /// `InvalidDocument` when the text is not well-formed XML, `NoValidPoints` when
    /// not a single placemark carried usable coordinates.
    pub fn run<R: ProgressReporter + ?Sized>(
        &self,
        text: &str,
        reporter: &mut R,
    ) -> Result<LoadResult, KmlError> {
        let mut progress = ProgressTracker::new(reporter);
        log::debug!("Parsing KML document, {} bytes", text.len());

        let document = XmlDocument::parse(text)?;
        if let Some(marker) = document.lookup(PARSER_ERROR_TAG).first() {
            let detail = marker.text_content().unwrap_or_default();
            log::error!("Parser error marker present in document: {}", detail.trim());
            return Err(KmlError::InvalidDocument(detail.trim().to_string()));
        }
        progress.advance(PARSED_PERCENT, "Parsing KML structure...");

        let mut placemarks = extract_placemarks(&document);
        let total = placemarks.total();
        progress.advance(EXTRACTED_PERCENT, "Extracting points...");

        let mut points = Vec::new();
        let mut last_reported = None;
        while let Some(record) = placemarks.next() {
            match record.coordinate_text.as_deref().and_then(parse_coordinates) {
                Some(coords) => points.push(Point::from_record(&record, coords)),
                None => log::debug!(
                    "Rejected placemark {}: coordinates {:?}",
                    record.index,
                    record.coordinate_text
                ),
            }

            let position = placemarks.visited() - 1;
            let bucket = position / self.progress_interval;
            if last_reported != Some(bucket) {
                last_reported = Some(bucket);
                let span = (PROCESSED_PERCENT - EXTRACTED_PERCENT) as f64;
                let percent = EXTRACTED_PERCENT as f64 + (position as f64 / total as f64) * span;
                progress.advance(
                    percent.round() as u8,
                    &format!("Processing: {} points found", points.len()),
                );
            }
        }

        let total_candidates = placemarks.visited();
        let rejected_count = total_candidates - points.len();
        log::info!(
            "Extracted {} points from {} placemarks ({} rejected, {} unreadable)",
            points.len(),
            total_candidates,
            rejected_count,
            placemarks.skipped()
        );
        progress.advance(PROCESSED_PERCENT, "Rendering on the map...");

        if points.is_empty() {
            return Err(KmlError::NoValidPoints { total_candidates });
        }

        Ok(LoadResult {
            points,
            total_candidates,
            rejected_count,
        })
    }
}
