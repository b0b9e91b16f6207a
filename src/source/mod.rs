//! Source adapters: one per external data source, all behind [`SourceAdapter`].

pub mod bank;
mod html;
mod http;
pub mod image;
pub mod ip;
pub mod leak;
pub mod phone;
pub mod record;
pub mod vehicle;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::query::Query;
pub(crate) use http::BROWSER_USER_AGENT;
pub use record::{Record, Value};

/// Placeholder for a field the source did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Stable identity of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    PhoneTrace,
    VehiclePrimaryApi,
    VehicleFallbackScraper,
    IpGeo,
    IpWhois,
    BankCodeLookup,
    LeakDatabase,
    ImageMetadata,
    ImageText,
}

impl SourceId {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::PhoneTrace => "phone_trace",
            SourceId::VehiclePrimaryApi => "vehicle_primary_api",
            SourceId::VehicleFallbackScraper => "vehicle_fallback_scraper",
            SourceId::IpGeo => "ip_geo",
            SourceId::IpWhois => "ip_whois",
            SourceId::BankCodeLookup => "bank_code_lookup",
            SourceId::LeakDatabase => "leak_database",
            SourceId::ImageMetadata => "image_metadata",
            SourceId::ImageText => "image_text",
        }
    }

    /// Heading shown above this source's entries in a report.
    pub fn display_name(self) -> &'static str {
        match self {
            SourceId::PhoneTrace => "Call Trace",
            SourceId::VehiclePrimaryApi => "Vehicle Registry API",
            SourceId::VehicleFallbackScraper => "Vehicle RC Scraper",
            SourceId::IpGeo => "IP Geolocation",
            SourceId::IpWhois => "IP Whois",
            SourceId::BankCodeLookup => "IFSC Lookup",
            SourceId::LeakDatabase => "Leak Database",
            SourceId::ImageMetadata => "EXIF / Metadata",
            SourceId::ImageText => "OCR / Text Extraction",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single adapter. Never fatal to the overall dispatch.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("upstream error: {message}")]
    Upstream { code: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("text recognition failed: {0}")]
    Engine(String),

    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("source task failed: {0}")]
    Internal(String),

    #[error("{0}")]
    Empty(String),
}

impl SourceError {
    /// Short machine-readable kind, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Network(_) | SourceError::Timeout(_) => "network",
            SourceError::Upstream { .. } => "upstream",
            SourceError::NotFound(_) => "not_found",
            SourceError::Decode(_) => "decode",
            SourceError::Engine(_) => "engine",
            SourceError::Unconfigured(_) => "unconfigured",
            SourceError::Internal(_) => "internal",
            SourceError::Empty(_) => "empty",
        }
    }

    pub(crate) fn upstream(code: u16, message: impl Into<String>) -> Self {
        SourceError::Upstream {
            code,
            message: message.into(),
        }
    }
}

/// One external data source behind a uniform fetch contract.
///
/// Implementations own their request building and response parsing; the
/// dispatcher only sees a [`Record`] or a [`SourceError`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Upper bound for one `fetch`, enforced by the dispatcher.
    fn timeout(&self) -> Duration;

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(SourceError::Timeout(Duration::from_secs(5)).kind(), "network");
        assert_eq!(SourceError::upstream(503, "down").kind(), "upstream");
        assert_eq!(SourceError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(SourceError::Empty("none".into()).kind(), "empty");
    }

    #[test]
    fn timeout_message_includes_seconds() {
        let err = SourceError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "timed out after 20s");
    }

    #[test]
    fn source_ids_have_distinct_names() {
        let all = [
            SourceId::PhoneTrace,
            SourceId::VehiclePrimaryApi,
            SourceId::VehicleFallbackScraper,
            SourceId::IpGeo,
            SourceId::IpWhois,
            SourceId::BankCodeLookup,
            SourceId::LeakDatabase,
            SourceId::ImageMetadata,
            SourceId::ImageText,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), all.len());
    }
}
