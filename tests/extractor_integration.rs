use kmlview_rs::document::{LookupStrategy, XmlDocument};
use kmlview_rs::extractor::extract_placemarks;
use kmlview_rs::KmlError;

mod test_utils;
use test_utils::shared::{kml_document, placemark};

#[test]
fn test_parse_rejects_malformed_documents() {
    for input in [
        "",
        "   ",
        "<kml><Document></kml>",
        "<kml><Placemark>",
        "<kml></kml><kml></kml>",
        "stray text <kml/>",
        "<kml><name>unterminated</kml",
    ] {
        match XmlDocument::parse(input) {
            Err(KmlError::InvalidDocument(_)) => {}
            other => panic!("{:?} should be an invalid document, got {:?}", input, other),
        }
    }
}

#[test]
fn test_parse_accepts_prolog_comments_and_cdata() {
    let text = r#"<?xml version="1.0"?>
<!-- exported -->
<kml><Placemark><description><![CDATA[<i>rich</i> text]]></description></Placemark></kml>"#;
    let document = XmlDocument::parse(text).expect("document should parse");
    assert_eq!(document.root().local_name(), "kml");
    let description = document
        .root()
        .lookup_first("description")
        .expect("description present");
    assert_eq!(
        description.text_content().expect("text decodes"),
        "<i>rich</i> text"
    );
}

#[test]
fn test_lookup_prefers_exact_names_and_falls_back_to_any_namespace() {
    let text = r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2">
  <kml:Placemark><kml:name>prefixed</kml:name></kml:Placemark>
  <kml:Placemark><kml:name>second</kml:name></kml:Placemark>
</kml:kml>"#;
    let document = XmlDocument::parse(text).expect("document should parse");

    assert!(document.root().find_all("Placemark", LookupStrategy::Exact).is_empty());
    assert_eq!(
        document
            .root()
            .find_all("Placemark", LookupStrategy::AnyNamespace)
            .len(),
        2
    );
    assert_eq!(document.lookup("Placemark").len(), 2);
    assert_eq!(document.lookup("kml:Placemark").len(), 2);

    let mixed = r#"<kml xmlns:x="urn:x"><Placemark/><x:Placemark/></kml>"#;
    let document = XmlDocument::parse(mixed).expect("document should parse");
    let found = document.lookup("Placemark");
    assert_eq!(found.len(), 1, "exact matches win, no fallback needed");
    assert_eq!(found[0].qualified_name(), "Placemark");
}

#[test]
fn test_extract_records_in_document_order() {
    let text = kml_document(&[
        placemark(Some("  Alpha  "), Some("first"), Some("1,2")),
        placemark(None, None, Some("3,4")),
        placemark(Some(""), None, None),
    ]);
    let document = XmlDocument::parse(&text).expect("document should parse");
    let mut placemarks = extract_placemarks(&document);
    assert_eq!(placemarks.total(), 3);

    let records: Vec<_> = placemarks.by_ref().collect();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].index, 1);
    assert_eq!(records[0].name_text.as_deref(), Some("Alpha"));
    assert_eq!(records[0].description_text.as_deref(), Some("first"));
    assert_eq!(records[0].coordinate_text.as_deref(), Some("1,2"));

    assert_eq!(records[1].index, 2);
    assert_eq!(records[1].name_text, None);
    assert_eq!(records[1].description_text, None);

    assert_eq!(records[2].index, 3);
    assert_eq!(records[2].name_text.as_deref(), Some(""));
    assert_eq!(records[2].coordinate_text, None);

    assert_eq!(placemarks.visited(), 3);
    assert_eq!(placemarks.skipped(), 0);
}

#[test]
fn test_extract_handles_prefixed_fields() {
    let text = r#"<k:kml xmlns:k="http://www.opengis.net/kml/2.2"><k:Document>
<k:Placemark>
  <k:name>Prefixed</k:name>
  <k:Point><k:coordinates>-0.1276,51.5072,0</k:coordinates></k:Point>
</k:Placemark>
</k:Document></k:kml>"#;
    let document = XmlDocument::parse(text).expect("document should parse");
    let records: Vec<_> = extract_placemarks(&document).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name_text.as_deref(), Some("Prefixed"));
    assert_eq!(
        records[0].coordinate_text.as_deref(),
        Some("-0.1276,51.5072,0")
    );
}

#[test]
fn test_coordinates_outside_point_are_ignored() {
    let text = r#"<kml><Placemark>
  <LineString><coordinates>1,1 2,2</coordinates></LineString>
</Placemark></kml>"#;
    let document = XmlDocument::parse(text).expect("document should parse");
    let records: Vec<_> = extract_placemarks(&document).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].coordinate_text, None);
}

#[test]
fn test_unreadable_placemark_is_skipped_not_fatal() {
    let text = kml_document(&[
        placemark(Some("Good"), None, Some("1,2")),
        placemark(Some("Broken &bogus; name"), None, Some("3,4")),
        placemark(Some("Also good"), None, Some("5,6")),
    ]);
    let document = XmlDocument::parse(&text).expect("bad entity only poisons its placemark");
    let mut placemarks = extract_placemarks(&document);
    let names: Vec<_> = placemarks
        .by_ref()
        .map(|record| (record.index, record.name_text.unwrap_or_default()))
        .collect();

    assert_eq!(
        names,
        vec![(1, "Good".to_string()), (3, "Also good".to_string())]
    );
    assert_eq!(placemarks.visited(), 3);
    assert_eq!(placemarks.skipped(), 1);
}

#[test]
fn test_document_without_placemarks_yields_nothing() {
    let document = XmlDocument::parse(&kml_document(&[])).expect("document should parse");
    let placemarks = extract_placemarks(&document);
    assert_eq!(placemarks.total(), 0);
    assert_eq!(placemarks.count(), 0);
}
