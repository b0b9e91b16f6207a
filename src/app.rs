use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::dispatch::{Dispatcher, Policy};
use crate::query::{Category, Query};
use crate::report::Report;
use crate::source::bank::BankCodeLookup;
use crate::source::image::{ImageMetadata, ImageText, TesseractCli};
use crate::source::ip::{IpGeo, IpWhois};
use crate::source::leak::LeakDatabase;
use crate::source::phone::PhoneTrace;
use crate::source::vehicle::{VehicleFallbackScraper, VehiclePrimaryApi};
use crate::source::{BROWSER_USER_AGENT, SourceAdapter};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Every shipped source wired to the default policy.
///
/// Configuration via environment variables, see [`Config::from_env`].
pub struct Sleuth {
    dispatcher: Dispatcher,
}

impl Sleuth {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(PhoneTrace::new(http.clone())),
            Arc::new(VehiclePrimaryApi::new(http.clone())),
            Arc::new(VehicleFallbackScraper::new(http.clone())),
            Arc::new(IpGeo::new(http.clone())),
            Arc::new(IpWhois::new(http.clone())),
            Arc::new(BankCodeLookup::new(http.clone())),
            Arc::new(LeakDatabase::new(http, config.leak.clone())),
            Arc::new(ImageMetadata),
            Arc::new(ImageText::new(TesseractCli::new(config.tesseract.clone()))),
        ];
        info!(sources = adapters.len(), leak = ?config.leak, "sources registered");

        Ok(Self {
            dispatcher: Dispatcher::new(adapters, Policy::default()),
        })
    }

    pub async fn lookup(&self, query: &Query) -> Report {
        let results = self.dispatcher.dispatch(query).await;
        Report::from_results(report_title(query), &results)
    }
}

fn report_title(query: &Query) -> String {
    let kind = match query.category {
        Category::Phone => "Phone Number Lookup",
        Category::Vehicle => "Vehicle Registration Lookup",
        Category::Ip => "IP Address Lookup",
        Category::BankCode => "IFSC Code Lookup",
        Category::FreeText => "Leak Search",
        Category::Image => "Image Analysis",
    };
    format!("{kind}: {}", query.normalized)
}
