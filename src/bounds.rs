// src/bounds.rs

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Smallest lat/lng rectangle containing a set of points, plus the pixel padding the
/// map should keep around it when fitting the view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    pub padding: [u32; 2],
}

impl Bounds {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }

    /// Largest zoom level at which the whole rectangle still fits a single tile
    /// span, capped to `max_zoom`.
    pub fn fitting_zoom(&self, max_zoom: u8) -> u8 {
        let span = (self.max_lat - self.min_lat)
            .max(self.max_lng - self.min_lng)
            .max(f64::EPSILON);
        let zoom = (360.0 / span).log2().floor();
        zoom.clamp(0.0, max_zoom as f64) as u8
    }
}

/// Computes the bounds of `points`.
///
/// # Arguments
/// * `points`: The points the view must show.
/// * `padding`: Pixel padding `[x, y]` carried along for the widget.
///
/// # Returns
/// The exact extremes of the set, or `None` when there is nothing to fit.
pub fn fit_bounds(points: &[Point], padding: [u32; 2]) -> Option<Bounds> {
    let (first, rest) = points.split_first()?;
    let initial = Bounds {
        min_lat: first.lat,
        max_lat: first.lat,
        min_lng: first.lng,
        max_lng: first.lng,
        padding,
    };
    Some(rest.iter().fold(initial, |bounds, point| Bounds {
        min_lat: bounds.min_lat.min(point.lat),
        max_lat: bounds.max_lat.max(point.lat),
        min_lng: bounds.min_lng.min(point.lng),
        max_lng: bounds.max_lng.max(point.lng),
        padding,
    }))
}
