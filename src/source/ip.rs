use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::http::{encode_segment, read_json, require_success};
use super::record::{json_field, json_scalar};
use super::{Record, SourceAdapter, SourceError, SourceId, Value};
use crate::query::Query;

const GEO_BASE_URL: &str = "http://ip-api.com";
const WHOIS_BASE_URL: &str = "https://ipwho.is";
const TIMEOUT: Duration = Duration::from_secs(5);

const GEO_FIELDS: &str =
    "status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query";

/// ip-api.com geolocation.
pub struct IpGeo {
    http: Client,
    base_url: String,
}

impl IpGeo {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: GEO_BASE_URL.to_string(),
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
impl SourceAdapter for IpGeo {
    fn id(&self) -> SourceId {
        SourceId::IpGeo
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let url = format!(
            "{}/json/{}?fields={GEO_FIELDS}",
            self.base_url,
            encode_segment(&query.normalized)
        );
        let response = self.http.get(&url).timeout(TIMEOUT).send().await?;
        let status = response.status().as_u16();
        let data = read_json(require_success(response).await?).await?;

        if data.get("status").and_then(|s| s.as_str()) != Some("success") {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return Err(SourceError::upstream(
                status,
                format!("IP lookup failed: {message}"),
            ));
        }

        debug!(ip = %query.normalized, "ip-api lookup complete");
        Ok(map_geo(&data, &query.normalized))
    }
}

fn map_geo(data: &serde_json::Value, ip: &str) -> Record {
    Record::new()
        .with("IP Address", json_field(data, "query"))
        .with("Address Type", address_type(ip))
        .with(
            "Country",
            format!("{} ({})", json_field(data, "country"), json_field(data, "countryCode")),
        )
        .with(
            "Region/State",
            format!("{} ({})", json_field(data, "regionName"), json_field(data, "region")),
        )
        .with("City", json_field(data, "city"))
        .with("Postal Code", json_field(data, "zip"))
        .with("Timezone", json_field(data, "timezone"))
        .with("ISP", json_field(data, "isp"))
        .with("Organization", json_field(data, "org"))
        .with("AS Number/Name", json_field(data, "as"))
        .with(
            "Coordinates",
            format!("Lat: {}, Lon: {}", json_field(data, "lat"), json_field(data, "lon")),
        )
}

/// Classify by the reserved IPv4 ranges; needs no network.
fn address_type(ip: &str) -> &'static str {
    let mut octets = ip.split('.').map(|o| o.parse::<u16>().ok());
    let (Some(Some(first)), Some(Some(second))) = (octets.next(), octets.next()) else {
        return "Invalid";
    };
    match (first, second) {
        (10, _) => "Private (Class A)",
        (172, 16..=31) => "Private (Class B)",
        (192, 168) => "Private (Class C)",
        (127, _) => "Loopback",
        (169, 254) => "Link-Local",
        (224..=239, _) => "Multicast",
        _ => "Public",
    }
}

/// ipwho.is: a second opinion on location plus connection and security details.
pub struct IpWhois {
    http: Client,
    base_url: String,
}

impl IpWhois {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: WHOIS_BASE_URL.to_string(),
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
impl SourceAdapter for IpWhois {
    fn id(&self) -> SourceId {
        SourceId::IpWhois
    }

    fn timeout(&self) -> Duration {
        TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let url = format!("{}/{}", self.base_url, encode_segment(&query.normalized));
        let response = self.http.get(&url).timeout(TIMEOUT).send().await?;
        let status = response.status().as_u16();
        let data = read_json(require_success(response).await?).await?;

        if data.get("success").and_then(|s| s.as_bool()) != Some(true) {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("IPWhois lookup failed");
            return Err(SourceError::upstream(status, message));
        }

        debug!(ip = %query.normalized, "ipwho.is lookup complete");
        Ok(map_whois(&data))
    }
}

fn map_whois(data: &serde_json::Value) -> Record {
    let mut record = Record::new()
        .with("Type", json_field(data, "type"))
        .with("Country", json_field(data, "country"))
        .with("Region", json_field(data, "region"))
        .with("City", json_field(data, "city"))
        .with("Latitude", json_field(data, "latitude"))
        .with("Longitude", json_field(data, "longitude"));

    if let Some(borders) = data.get("borders").and_then(|b| b.as_str())
        && !borders.is_empty()
    {
        record.push(
            "Borders",
            Value::List(borders.split(',').map(|b| b.trim().to_string()).collect()),
        );
    }

    let sections = [
        ("Connection", "connection", &["asn", "isp", "org", "domain"][..]),
        ("Timezone", "timezone", &["id", "utc"][..]),
        ("Security", "security", &["proxy", "vpn", "tor", "hosting"][..]),
    ];
    for (label, key, fields) in sections {
        let Some(obj) = data.get(key).filter(|v| v.is_object()) else {
            continue;
        };
        let entries = fields
            .iter()
            .filter_map(|f| obj.get(*f).map(|v| (f.to_ascii_uppercase(), json_scalar(v))))
            .collect::<Vec<_>>();
        if !entries.is_empty() {
            record.push(label, Value::Map(entries));
        }
    }
    record
}
