// src/geopoint.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// A WGS84 latitude/longitude pair that is known to be in range.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new `GeoPoint`, or `None` when either component is out of range
    /// (or not a number).
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
            return None;
        }
        if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
            return None;
        }
        Some(GeoPoint {
            latitude,
            longitude,
        })
    }
}

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[,\s]+").expect("separator pattern is valid"))
}

/// Parses KML coordinate text such as `"-3.70,40.41,0"` into a `GeoPoint`.
///
/// KML writes longitude first, then latitude, then an optional altitude which is
/// ignored. Anything that does not yield two in-range numbers is rejected with
/// `None`; rejection is a filtering outcome, never an error.
pub fn parse_coordinates(text: &str) -> Option<GeoPoint> {
    let mut parts = separator().split(text.trim()).filter(|part| !part.is_empty());
    let longitude: f64 = parts.next()?.parse().ok()?;
    let latitude: f64 = parts.next()?.parse().ok()?;
    GeoPoint::new(latitude, longitude)
}
