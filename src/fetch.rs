// src/fetch.rs

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use url::Url;

use crate::error::KmlError;

/// Query parameter of the hosting page that names a remote KML document.
pub const KML_QUERY_PARAM: &str = "kml";

const KML_ACCEPT: &str =
    "application/vnd.google-earth.kml+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// Reads the `kml` query parameter of a page URL, e.g.
/// `https://viewer.example/index.html?kml=https%3A%2F%2Fdata.example%2Fsites.kml`.
///
/// Returns `Ok(None)` when the page carries no such parameter. The value is
/// percent-decoded before it is parsed as a URL.
pub fn kml_param_from_page_url(page_url: &str) -> Result<Option<Url>, KmlError> {
    let page = Url::parse(page_url)?;
    let raw = match page
        .query_pairs()
        .find(|(key, _)| key == KML_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
    {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };

    let target = Url::parse(raw.trim())
        .map_err(|e| KmlError::InvalidUrl(format!("'{}' is not a valid URL: {}", raw, e)))?;
    check_scheme(&target)?;
    Ok(Some(target))
}

fn check_scheme(url: &Url) -> Result<(), KmlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(KmlError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Downloads KML documents by URL.
///
/// The remote host has to allow the retrieval; a non-success status becomes a
/// `ReadFailure`.
#[derive(Debug, Clone)]
pub struct KmlFetcher {
    http_client: Client,
}

impl KmlFetcher {
    pub fn new() -> Result<Self, KmlError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(KML_ACCEPT));

        let http_client = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(KmlError::ReqwestError)?;

        Ok(Self { http_client })
    }

    /// Creates a fetcher around an existing `reqwest::Client`.
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }

    pub async fn fetch(&self, url: &Url) -> Result<String, KmlError> {
        check_scheme(url)?;
        log::debug!("--- KML fetch ---");
        log::debug!("URL: {}", url.as_str());

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(KmlError::ReqwestError)?;

        let status = response.status();
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Status: {}", status);
            for (name, value) in response.headers() {
                log::debug!("Header: {}: {:?}", name, value);
            }
        }

        let body = response.text().await.map_err(KmlError::ReqwestError)?;
        if status.is_success() {
            log::debug!("Fetched {} bytes from {}", body.len(), url);
            Ok(body)
        } else {
            log::warn!("Fetching {} failed with status {}", url, status);
            Err(KmlError::from_status(status.as_u16(), &body))
        }
    }
}
