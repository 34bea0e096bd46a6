use serde::{Deserialize, Serialize};

use crate::geopoint::GeoPoint;

/// A validated placemark, ready to be rendered.
///
/// Points are only ever produced by the pipeline from a record whose coordinates
/// passed validation, and are never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Point {
    pub name: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    /// Builds a point from a raw record and its validated coordinates.
    ///
    /// A missing name becomes `"Point {index}"` (the record index is already 1-based),
    /// a missing description becomes the empty string.
    pub fn from_record(record: &RawPlacemarkRecord, coords: GeoPoint) -> Self {
        Point {
            name: record
                .name_text
                .clone()
                .unwrap_or_else(|| format!("Point {}", record.index)),
            description: record.description_text.clone().unwrap_or_default(),
            lat: coords.latitude,
            lng: coords.longitude,
        }
    }

    pub fn geo(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.lat,
            longitude: self.lng,
        }
    }

    /// Popup markup shown when the marker is clicked.
    pub fn popup_html(&self) -> String {
        if self.description.is_empty() {
            format!("<b>{}</b>", self.name)
        } else {
            format!("<b>{}</b><br>{}", self.name, self.description)
        }
    }
}

/// What the extractor found inside one placemark container, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlacemarkRecord {
    /// 1-based position of the container in document order.
    pub index: usize,
    pub name_text: Option<String>,
    pub description_text: Option<String>,
    pub coordinate_text: Option<String>,
}

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub points: Vec<Point>,
    pub total_candidates: usize,
    pub rejected_count: usize,
}

/// A bounded slice of points handed to the render sink as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based position of this batch in the schedule.
    pub index: usize,
    pub items: Vec<Point>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
