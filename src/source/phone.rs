use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::debug;

use super::http::{BROWSER_USER_AGENT, read_body, require_success};
use super::{Record, SourceAdapter, SourceError, SourceId, html};
use crate::query::Query;

const BASE_URL: &str = "https://calltracer.in";
const TIMEOUT: Duration = Duration::from_secs(15);

/// Shown for trace fields the page did not contain.
pub const FIELD_MISSING: &str = "Not available";

/// Labels as they appear on the trace results page (including its spelling).
pub const TRACE_FIELDS: [&str; 18] = [
    "Owner Name",
    "Owner Address",
    "Hometown",
    "Refrence City",
    "Mobile Locations",
    "Tower Locations",
    "Country",
    "Mobile State",
    "SIM card",
    "IMEI number",
    "MAC address",
    "Connection",
    "IP address",
    "Owner Personality",
    "Language",
    "Tracking History",
    "Tracker Id",
    "Complaints",
];

/// Scrapes the public call-trace form for a phone number.
pub struct PhoneTrace {
    http: Client,
    base_url: String,
}

impl PhoneTrace {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for PhoneTrace {
    fn id(&self) -> SourceId {
        SourceId::PhoneTrace
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let response = self
            .http
            .post(&self.base_url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .form(&[("country", "IN"), ("q", query.normalized.as_str())])
            .timeout(TIMEOUT)
            .send()
            .await?;
        let body = read_body(require_success(response).await?).await?;

        let record = parse_trace_page(&body, &query.raw, &query.normalized);
        debug!(bytes = body.len(), "trace page parsed");
        Ok(record)
    }
}

/// Every field is always present; missing ones degrade to [`FIELD_MISSING`].
fn parse_trace_page(body: &str, input: &str, cleaned: &str) -> Record {
    let doc = Html::parse_document(body);
    let mut record = Record::new()
        .with("Number (Input)", input)
        .with("Number (Cleaned)", cleaned);
    for label in TRACE_FIELDS {
        let value = html::next_cell_after(&doc, label)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| FIELD_MISSING.to_string());
        record.push(label, value);
    }
    record
}
