//! ODRE open-data retrieval of the `eco2mix-metropoles-tr` extract.
//!
//! One blocking GET, no retry: a failed download aborts the run.

use reqwest::blocking::Client;
use tracing::info;

use crate::error::{AppError, EXIT_RUNTIME};
use crate::io::ingest::{RawExtract, load_extract_str};

pub const EXPORT_URL: &str =
    "https://odre.opendatasoft.com/api/explore/v2.1/catalog/datasets/eco2mix-metropoles-tr/exports/csv";

pub struct OdreClient {
    client: Client,
    base_url: String,
}

impl OdreClient {
    pub fn new() -> Self {
        Self::with_base_url(EXPORT_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Download the extract of one metropole, by display name.
    pub fn fetch_metropole(&self, name: &str) -> Result<RawExtract, AppError> {
        let req = self.client.get(&self.base_url).query(&export_query(name));
        self.fetch(req, &format!("metropole '{name}'"))
    }

    /// Download an extract from an explicit URL.
    pub fn fetch_url(&self, url: &str) -> Result<RawExtract, AppError> {
        self.fetch(self.client.get(url), url)
    }

    fn fetch(&self, req: reqwest::blocking::RequestBuilder, what: &str) -> Result<RawExtract, AppError> {
        let resp = req
            .send()
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("ODRE request for {what} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                EXIT_RUNTIME,
                format!("ODRE request for {what} failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to read ODRE response: {e}")))?;
        let extract = load_extract_str(&body)?;
        info!(source = what, rows = extract.readings.len(), "extract downloaded");
        Ok(extract)
    }
}

impl Default for OdreClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters of the CSV export, refined to one metropole.
pub fn export_query(name: &str) -> Vec<(&'static str, String)> {
    vec![
        ("lang", "fr".to_string()),
        ("refine", format!("libelle_metropole:\"{name}\"")),
        ("timezone", "Europe/Paris".to_string()),
        ("use_labels", "true".to_string()),
        ("delimiter", ";".to_string()),
    ]
}
