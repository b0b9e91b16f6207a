use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::http::{read_json, require_success};
use super::record::json_scalar;
use super::{Record, SourceAdapter, SourceError, SourceId, Value};
use crate::config::LeakConfig;
use crate::query::Query;

const BASE_URL: &str = "https://leakosintapi.com/";
const TIMEOUT: Duration = Duration::from_secs(20);

/// Bucket name the API uses to say it found nothing.
const ABSENCE_MARKER: &str = "no results found";

#[derive(Debug, Serialize)]
struct LeakRequest<'a> {
    token: &'a str,
    request: &'a str,
    limit: u32,
    lang: &'a str,
}

/// Leak-search API: groups leaked records under named database buckets.
pub struct LeakDatabase {
    http: Client,
    config: LeakConfig,
    base_url: String,
}

impl LeakDatabase {
    pub fn new(http: Client, config: LeakConfig) -> Self {
        Self {
            http,
            config,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, config: LeakConfig, base_url: &str) -> Self {
        Self {
            http,
            config,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for LeakDatabase {
    fn id(&self) -> SourceId {
        SourceId::LeakDatabase
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or(SourceError::Unconfigured("SLEUTH_LEAK_TOKEN"))?;

        let term = search_term(&query.normalized);
        let target = if term == query.normalized {
            query.normalized.clone()
        } else {
            format!("{} (searched as {term})", query.normalized)
        };
        info!(search = %target, "searching leak database");

        let request = LeakRequest {
            token,
            request: &term,
            limit: self.config.limit,
            lang: &self.config.lang,
        };
        let response = self
            .http
            .post(&self.base_url)
            .json(&request)
            .timeout(TIMEOUT)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = read_json(require_success(response).await?).await?;

        let record = parse_buckets(&body, status)?;
        if record.is_empty() {
            return Err(SourceError::Empty(format!(
                "No leaked data found for '{target}'"
            )));
        }
        debug!(entries = record.len(), "leak search complete");
        Ok(record)
    }
}

/// Bare 10-12 digit numbers (optionally `+`-prefixed) are searched as `+91…`.
/// Anything else is sent as typed.
pub fn search_term(query: &str) -> Cow<'_, str> {
    let q = query.trim();
    let digits = q.strip_prefix('+').unwrap_or(q);
    if !(10..=12).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(q);
    }
    let local = q.strip_prefix("+91").unwrap_or(q).trim_start_matches('+');
    Cow::Owned(format!("+91{local}"))
}

fn bucket_title(name: &str) -> &str {
    if name.eq_ignore_ascii_case("1win") {
        "STARK (1WIN)"
    } else {
        name
    }
}

/// Flatten `List.<bucket>.Data[]` into one nested map per leaked record.
/// Every matched bucket contributes at least one entry, so an empty record
/// means only the absence marker came back.
fn parse_buckets(body: &serde_json::Value, status: u16) -> Result<Record, SourceError> {
    if let Some(code) = body.get("Error code") {
        return Err(SourceError::upstream(
            status,
            format!("API error: {}", json_scalar(code)),
        ));
    }
    let Some(buckets) = body.get("List").and_then(|l| l.as_object()) else {
        return Err(SourceError::upstream(
            status,
            "unexpected response format from API",
        ));
    };

    let mut record = Record::new();
    for (name, bucket) in buckets {
        if name.eq_ignore_ascii_case(ABSENCE_MARKER) {
            continue;
        }
        let title = bucket_title(name);

        if let Some(info) = bucket.get("InfoLeak").and_then(|i| i.as_str())
            && !info.trim().is_empty()
        {
            record.push(format!("{title}: about"), info.trim());
        }

        let rows = bucket
            .get("Data")
            .and_then(|d| d.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        if rows.is_empty() {
            record.push(title, "0 records");
        }
        for (i, row) in rows.iter().enumerate() {
            let label = format!("{title} #{}", i + 1);
            match row.as_object() {
                Some(fields) => record.push(
                    label,
                    Value::Map(
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), json_scalar(v)))
                            .collect(),
                    ),
                ),
                None => record.push(label, json_scalar(row)),
            }
        }
    }
    Ok(record)
}
