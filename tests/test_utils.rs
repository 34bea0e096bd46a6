use dotenvy::dotenv;
use kmlview_rs::fetch::KmlFetcher;
use kmlview_rs::{KmlViewer, MemorySink, ViewerConfig};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Once;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

fn initialize_logger_once() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub mod shared {
    use super::*;

    /// Configuration for tests: environment overrides are honoured, but batches are
    /// spaced 1ms apart so tests finish quickly.
    #[allow(dead_code)]
    pub fn test_config() -> ViewerConfig {
        initialize_logger_once();
        dotenv().ok();
        let mut config = ViewerConfig::from_env().unwrap_or_default();
        config.batch_delay_ms = 1;
        config
    }

    #[allow(dead_code)]
    pub fn setup_viewer() -> KmlViewer<MemorySink> {
        setup_viewer_with(test_config())
    }

    /// A headless viewer whose HTTP client ignores proxy settings, so the local test
    /// server is always reachable.
    #[allow(dead_code)]
    pub fn setup_viewer_with(config: ViewerConfig) -> KmlViewer<MemorySink> {
        initialize_logger_once();
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("Failed to build HTTP client");
        KmlViewer::headless(config)
            .expect("Failed to create viewer")
            .with_fetcher(KmlFetcher::with_client(client))
    }

    /// One `<Placemark>`; `None` leaves the corresponding element out.
    #[allow(dead_code)]
    pub fn placemark(
        name: Option<&str>,
        description: Option<&str>,
        coordinates: Option<&str>,
    ) -> String {
        let mut out = String::from("<Placemark>");
        if let Some(name) = name {
            out.push_str(&format!("<name>{}</name>", name));
        }
        if let Some(description) = description {
            out.push_str(&format!("<description>{}</description>", description));
        }
        if let Some(coordinates) = coordinates {
            out.push_str(&format!(
                "<Point><coordinates>{}</coordinates></Point>",
                coordinates
            ));
        }
        out.push_str("</Placemark>");
        out
    }

    /// Wraps placemarks in a KML 2.2 document.
    #[allow(dead_code)]
    pub fn kml_document(placemarks: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n{}\n</Document>\n</kml>\n",
            placemarks.join("\n")
        )
    }

    /// A document with `count` valid placemarks at random in-range positions.
    /// Returns the text and the `(lat, lng)` of each placemark in order.
    #[allow(dead_code)]
    pub fn random_kml(count: usize) -> (String, Vec<(f64, f64)>) {
        let mut rng = rand::thread_rng();
        let mut coords = Vec::with_capacity(count);
        let placemarks: Vec<String> = (0..count)
            .map(|i| {
                let lat: f64 = rng.gen_range(-90.0..=90.0);
                let lng: f64 = rng.gen_range(-180.0..=180.0);
                coords.push((lat, lng));
                placemark(
                    Some(&format!("Site {}", i)),
                    None,
                    Some(&format!("{},{},0", lng, lat)),
                )
            })
            .collect();
        (kml_document(&placemarks), coords)
    }

    /// Writes `contents` to a uniquely named file in the temp directory.
    #[allow(dead_code)]
    pub fn write_temp_file(extension: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "kmlview_test_{}.{}",
            Uuid::new_v4().simple(),
            extension
        ));
        std::fs::write(&path, contents).expect("Failed to write temp file");
        path
    }

    /// Serves a single HTTP response on a random local port and returns the base URL.
    #[allow(dead_code)]
    pub async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Test server has no address");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = vec![0u8; 8192];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/vnd.google-earth.kml+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }
}
