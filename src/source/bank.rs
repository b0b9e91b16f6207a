use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::http::{encode_segment, read_json, require_success};
use super::record::json_field;
use super::{Record, SourceAdapter, SourceError, SourceId};
use crate::query::Query;

const BASE_URL: &str = "https://ifsc.razorpay.com";
const TIMEOUT: Duration = Duration::from_secs(5);

/// IFSC → bank branch details.
pub struct BankCodeLookup {
    http: Client,
    base_url: String,
}

impl BankCodeLookup {
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
impl SourceAdapter for BankCodeLookup {
    fn id(&self) -> SourceId {
        SourceId::BankCodeLookup
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let code = &query.normalized;
        let url = format!("{}/{}", self.base_url, encode_segment(code));
        let response = self.http.get(&url).timeout(TIMEOUT).send().await?;

        // The API answers unknown codes with a bare 404.
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found(code));
        }
        let data = read_json(require_success(response).await?).await?;

        let has_bank = data
            .get("BANK")
            .and_then(|b| b.as_str())
            .is_some_and(|b| !b.is_empty());
        if !has_bank {
            return Err(not_found(code));
        }

        debug!(ifsc = %code, "IFSC lookup complete");
        Ok(map_branch(&data))
    }
}

fn not_found(code: &str) -> SourceError {
    SourceError::NotFound(format!("IFSC code {code} not found or is invalid"))
}

fn map_branch(data: &serde_json::Value) -> Record {
    let upi = if data.get("UPI").and_then(|u| u.as_bool()).unwrap_or(false) {
        "Enabled"
    } else {
        "Disabled"
    };
    Record::new()
        .with("Bank Name", json_field(data, "BANK"))
        .with("Branch", json_field(data, "BRANCH"))
        .with("Address", json_field(data, "ADDRESS"))
        .with("City", json_field(data, "CITY"))
        .with("District", json_field(data, "DISTRICT"))
        .with("State", json_field(data, "STATE"))
        .with("IFSC Code", json_field(data, "IFSC"))
        .with("MICR Code", json_field(data, "MICR"))
        .with("Contact", json_field(data, "CONTACT"))
        .with("UPI", upi)
}
