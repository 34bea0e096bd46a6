// src/extractor.rs

use crate::document::{MalformedText, XmlDocument, XmlElement};
use crate::types::RawPlacemarkRecord;

pub const PLACEMARK_TAG: &str = "Placemark";
pub const NAME_TAG: &str = "name";
pub const DESCRIPTION_TAG: &str = "description";
pub const POINT_TAG: &str = "Point";
pub const COORDINATES_TAG: &str = "coordinates";

/// Why a single placemark could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractError {
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "placemark {}: unreadable <{}> ({})",
            self.index, self.field, self.reason
        )
    }
}

/// Locates every placemark container in the document and returns a lazy iterator
/// over their raw records, in document order.
pub fn extract_placemarks(document: &XmlDocument) -> Placemarks<'_> {
    let containers = document.lookup(PLACEMARK_TAG);
    log::debug!("Located {} placemark containers", containers.len());
    Placemarks {
        containers,
        position: 0,
        skipped: 0,
    }
}

/// Iterator over the raw records of a document.
///
/// Containers whose sub-tree cannot be read are logged and skipped; they still
/// count towards [`visited`](Placemarks::visited).
pub struct Placemarks<'a> {
    containers: Vec<&'a XmlElement>,
    position: usize,
    skipped: usize,
}

impl<'a> Placemarks<'a> {
    /// Number of containers located in the document.
    pub fn total(&self) -> usize {
        self.containers.len()
    }

    /// Number of containers consumed so far, skipped ones included.
    pub fn visited(&self) -> usize {
        self.position
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<'a> Iterator for Placemarks<'a> {
    type Item = RawPlacemarkRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&container) = self.containers.get(self.position) {
            self.position += 1;
            match read_record(container, self.position) {
                Ok(record) => return Some(record),
                Err(e) => {
                    self.skipped += 1;
                    log::warn!("Skipping {}", e);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.containers.len() - self.position))
    }
}

fn read_record(container: &XmlElement, index: usize) -> Result<RawPlacemarkRecord, ExtractError> {
    let text_of = |element: Option<&XmlElement>, field: &'static str| {
        element
            .map(|el| el.text_content().map(|text| text.trim().to_string()))
            .transpose()
            .map_err(|MalformedText { reason, .. }| ExtractError {
                index,
                field,
                reason,
            })
    };

    let name_text = text_of(container.lookup_first(NAME_TAG), NAME_TAG)?;
    let description_text = text_of(container.lookup_first(DESCRIPTION_TAG), DESCRIPTION_TAG)?;
    let coordinates = container
        .lookup_first(POINT_TAG)
        .and_then(|point| point.lookup_first(COORDINATES_TAG));
    let coordinate_text = text_of(coordinates, COORDINATES_TAG)?.filter(|text| !text.is_empty());

    Ok(RawPlacemarkRecord {
        index,
        name_text,
        description_text,
        coordinate_text,
    })
}
