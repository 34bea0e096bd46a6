use kmlview_rs::pipeline::{KmlPipeline, EXTRACTED_PERCENT, PARSED_PERCENT, PROCESSED_PERCENT};
use kmlview_rs::status::Progress;
use kmlview_rs::KmlError;
use rand::Rng;

mod test_utils;
use test_utils::shared::{kml_document, placemark, random_kml};

fn assert_monotonic(progress: &[Progress]) {
    for pair in progress.windows(2) {
        assert!(
            pair[0].percent <= pair[1].percent,
            "progress went backwards: {:?}",
            progress
        );
    }
    assert!(progress.iter().all(|p| p.percent <= 100));
}

#[test]
fn test_three_placemarks_one_valid() {
    let text = kml_document(&[
        placemark(None, None, Some("10.0,20.0")),
        placemark(None, None, Some("200.0,20.0")),
        placemark(None, None, Some("")),
    ]);
    let mut progress: Vec<Progress> = Vec::new();
    let result = KmlPipeline::default()
        .run(&text, &mut progress)
        .expect("one valid point should be enough");

    assert_eq!(result.points.len(), 1);
    assert_eq!(result.points[0].lat, 20.0);
    assert_eq!(result.points[0].lng, 10.0);
    assert_eq!(result.points[0].name, "Point 1");
    assert_eq!(result.points[0].description, "");
    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.rejected_count, 2);

    assert_monotonic(&progress);
    assert_eq!(progress.first().map(|p| p.percent), Some(PARSED_PERCENT));
    assert!(progress.iter().any(|p| p.percent == EXTRACTED_PERCENT));
    assert_eq!(progress.last().map(|p| p.percent), Some(PROCESSED_PERCENT));
}

#[test]
fn test_placeholder_name_uses_one_based_position() {
    let text = kml_document(&[
        placemark(Some("Named"), Some("desc"), Some("1,1")),
        placemark(None, None, Some("bad")),
        placemark(None, Some("third"), Some("2,2")),
    ]);
    let result = KmlPipeline::default()
        .run(&text, &mut Vec::<Progress>::new())
        .expect("two points are valid");

    let names: Vec<_> = result.points.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Named", "Point 3"]);
    assert_eq!(result.points[0].description, "desc");
    assert_eq!(result.points[1].description, "third");
}

#[test]
fn test_zero_placemarks_is_no_valid_points() {
    let text = kml_document(&[]);
    match KmlPipeline::default().run(&text, &mut Vec::<Progress>::new()) {
        Err(KmlError::NoValidPoints { total_candidates }) => assert_eq!(total_candidates, 0),
        other => panic!("expected NoValidPoints, got {:?}", other),
    }
}

#[test]
fn test_placemarks_without_valid_coordinates_is_no_valid_points() {
    let text = kml_document(&[
        placemark(Some("a"), None, None),
        placemark(Some("b"), None, Some("0,95")),
    ]);
    match KmlPipeline::default().run(&text, &mut Vec::<Progress>::new()) {
        Err(KmlError::NoValidPoints { total_candidates }) => assert_eq!(total_candidates, 2),
        other => panic!("expected NoValidPoints, got {:?}", other),
    }
}

#[test]
fn test_malformed_xml_is_invalid_document() {
    let mut progress: Vec<Progress> = Vec::new();
    let outcome = KmlPipeline::default().run("<kml><Placemark></kml>", &mut progress);
    assert!(matches!(outcome, Err(KmlError::InvalidDocument(_))));
    assert!(progress.is_empty(), "no milestone is reached before the parse");
}

#[test]
fn test_parser_error_marker_is_invalid_document() {
    let text = "<html><body><parsererror>line 1: junk</parsererror></body></html>";
    match KmlPipeline::default().run(text, &mut Vec::<Progress>::new()) {
        Err(KmlError::InvalidDocument(message)) => assert!(message.contains("junk")),
        other => panic!("expected InvalidDocument, got {:?}", other),
    }
}

#[test]
fn test_unreadable_placemark_counts_as_rejected() {
    let text = kml_document(&[
        placemark(Some("ok"), None, Some("1,1")),
        placemark(Some("&broken;"), None, Some("2,2")),
    ]);
    let result = KmlPipeline::default()
        .run(&text, &mut Vec::<Progress>::new())
        .expect("the readable placemark survives");
    assert_eq!(result.points.len(), 1);
    assert_eq!(result.total_candidates, 2);
    assert_eq!(result.rejected_count, 1);
}

#[test]
fn test_counts_match_for_random_documents() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let total = rng.gen_range(1..200);
        let mut valid = 0;
        let placemarks: Vec<String> = (0..total)
            .map(|_| {
                if rng.gen_bool(0.6) {
                    valid += 1;
                    let lat: f64 = rng.gen_range(-90.0..=90.0);
                    let lng: f64 = rng.gen_range(-180.0..=180.0);
                    placemark(None, None, Some(&format!("{} {}", lng, lat)))
                } else {
                    let bad = ["", "1", "x,y", "181,0", "0,-91"][rng.gen_range(0..5)];
                    placemark(None, None, Some(bad))
                }
            })
            .collect();

        let text = kml_document(&placemarks);
        let outcome = KmlPipeline::default().run(&text, &mut Vec::<Progress>::new());
        if valid == 0 {
            assert!(matches!(outcome, Err(KmlError::NoValidPoints { .. })));
            continue;
        }
        let result = outcome.expect("at least one valid placemark");
        assert_eq!(result.points.len(), valid);
        assert_eq!(result.total_candidates, total);
        assert_eq!(result.rejected_count, total - valid);
    }
}

#[test]
fn test_progress_is_coarse_and_interpolated() {
    let (text, coords) = random_kml(1200);
    let mut progress: Vec<Progress> = Vec::new();
    let result = KmlPipeline::new(500)
        .run(&text, &mut progress)
        .expect("all placemarks are valid");
    assert_eq!(result.points.len(), coords.len());

    assert_monotonic(&progress);
    let processing: Vec<u8> = progress
        .iter()
        .filter(|p| p.message.starts_with("Processing"))
        .map(|p| p.percent)
        .collect();
    // Records 0, 500 and 1000 report: 40%, 57%, 73%.
    assert_eq!(processing, vec![40, 57, 73]);
    assert_eq!(progress.len(), 2 + processing.len() + 1);
}
