//! Vehicle registration lookups: a JSON API and an independent HTML scraper.
//!
//! Both always run for a vehicle query; the scraper is labelled "fallback"
//! only because its data is less structured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::debug;

use super::http::{BROWSER_USER_AGENT, encode_segment, read_body, read_json, require_success};
use super::record::json_field;
use super::{NOT_AVAILABLE, Record, SourceAdapter, SourceError, SourceId, html};
use crate::query::Query;

const API_BASE_URL: &str = "https://vahan-api.vercel.app";
const API_TIMEOUT: Duration = Duration::from_secs(10);

const SCRAPER_BASE_URL: &str = "https://vahanx.in";
const SCRAPER_TIMEOUT: Duration = Duration::from_secs(15);

/// Labels scraped from the RC search page, in display order.
pub const RC_FIELDS: [&str; 11] = [
    "Owner Name",
    "Father's Name",
    "Owner Serial No",
    "Model Name",
    "Registration Date",
    "Insurance Expiry",
    "Fitness Upto",
    "Tax Upto",
    "Financier Name",
    "Registered RTO",
    "Address",
];

pub struct VehiclePrimaryApi {
    http: Client,
    base_url: String,
}

impl VehiclePrimaryApi {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: API_BASE_URL.to_string(),
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
impl SourceAdapter for VehiclePrimaryApi {
    fn id(&self) -> SourceId {
        SourceId::VehiclePrimaryApi
    }

    fn timeout(&self) -> Duration {
        API_TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let url = format!(
            "{}/api/vehicle/{}",
            self.base_url,
            encode_segment(&query.normalized)
        );
        let response = self
            .http
            .get(&url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = read_json(require_success(response).await?).await?;

        let record = map_registry_payload(&body, &query.normalized).ok_or_else(|| {
            SourceError::upstream(status, "API returned no data or an unexpected format")
        })?;
        debug!(plate = %query.normalized, "vehicle API record mapped");
        Ok(record)
    }
}

/// `None` unless the payload carries a non-empty `data` object.
fn map_registry_payload(body: &serde_json::Value, plate: &str) -> Option<Record> {
    let info = body.get("data").filter(|d| d.as_object().is_some_and(|o| !o.is_empty()))?;

    let vehicle_number = info
        .get("registrationNumber")
        .and_then(|v| v.as_str())
        .unwrap_or(plate);

    Some(
        Record::new()
            .with("Vehicle Number", vehicle_number)
            .with("Owner Name", json_field(info, "ownerName"))
            .with("Registration Date", json_field(info, "registrationDate"))
            .with("Make & Model", json_field(info, "makeModel"))
            .with("Fuel Type", json_field(info, "fuelType"))
            .with("Vehicle Class", json_field(info, "vehicleClass"))
            .with("RTO Office", json_field(info, "rtoOffice"))
            .with("Chassis No (Partial)", last_chars(&json_field(info, "chassisNumber"), 4))
            .with("Engine No (Partial)", last_chars(&json_field(info, "engineNumber"), 4)),
    )
}

/// Keep only the last `n` characters, for partial disclosure of identifiers.
fn last_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

pub struct VehicleFallbackScraper {
    http: Client,
    base_url: String,
}

impl VehicleFallbackScraper {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: SCRAPER_BASE_URL.to_string(),
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
impl SourceAdapter for VehicleFallbackScraper {
    fn id(&self) -> SourceId {
        SourceId::VehicleFallbackScraper
    }

    fn timeout(&self) -> Duration {
        SCRAPER_TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let url = format!(
            "{}/rc-search/{}",
            self.base_url,
            encode_segment(&query.normalized)
        );
        let response = self
            .http
            .get(&url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9")
            .header("Referer", format!("{}/rc-search", self.base_url))
            .timeout(SCRAPER_TIMEOUT)
            .send()
            .await?;
        let body = read_body(require_success(response).await?).await?;

        let record = parse_rc_page(&body);
        if record.is_empty() {
            return Err(SourceError::NotFound(
                "no meaningful details found on the RC search page".to_string(),
            ));
        }
        debug!(fields = record.len(), "RC page parsed");
        Ok(record)
    }
}

/// Only fields with a real value survive: blanks, `N/A` and `NONE` are dropped.
fn parse_rc_page(body: &str) -> Record {
    let doc = Html::parse_document(body);
    let mut record = Record::new();
    for label in RC_FIELDS {
        let Some(value) = html::span_labelled_paragraph(&doc, label) else {
            continue;
        };
        let upper = value.trim().to_ascii_uppercase();
        if upper.is_empty() || upper == NOT_AVAILABLE || upper == "NONE" {
            continue;
        }
        record.push(label, value);
    }
    record
}
