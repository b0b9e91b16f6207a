//! Category policy and concurrent fan-out over source adapters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::query::{Category, Query};
use crate::source::{Record, SourceAdapter, SourceError, SourceId};

/// How the adapters listed for a category are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Every adapter runs concurrently; all results are kept.
    RunAll,
    /// Adapters run in order until one succeeds; the rest are skipped.
    StopOnSuccess,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub fan_out: FanOut,
    /// Priority order. Never empty.
    pub sources: Vec<SourceId>,
}

/// Category → ordered adapter list.
#[derive(Debug, Clone)]
pub struct Policy {
    routes: HashMap<Category, Route>,
}

impl Policy {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Replace the route for `category`. An empty `sources` list removes it.
    pub fn with_route(mut self, category: Category, fan_out: FanOut, sources: &[SourceId]) -> Self {
        if sources.is_empty() {
            self.routes.remove(&category);
        } else {
            self.routes.insert(
                category,
                Route {
                    fan_out,
                    sources: sources.to_vec(),
                },
            );
        }
        self
    }

    pub fn route(&self, category: Category) -> Option<&Route> {
        self.routes.get(&category)
    }
}

impl Default for Policy {
    fn default() -> Self {
        use SourceId::*;
        Self::empty()
            .with_route(Category::Phone, FanOut::RunAll, &[PhoneTrace, LeakDatabase])
            .with_route(
                Category::Vehicle,
                FanOut::RunAll,
                &[VehiclePrimaryApi, VehicleFallbackScraper],
            )
            .with_route(Category::Ip, FanOut::RunAll, &[IpGeo, IpWhois])
            .with_route(Category::BankCode, FanOut::RunAll, &[BankCodeLookup])
            .with_route(Category::FreeText, FanOut::RunAll, &[LeakDatabase])
            .with_route(Category::Image, FanOut::RunAll, &[ImageMetadata, ImageText])
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success(Record),
    /// The source answered but had nothing for this query.
    Empty(String),
    Error(SourceError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Result<Record, SourceError>> for Outcome {
    fn from(result: Result<Record, SourceError>) -> Self {
        match result {
            Ok(record) => Outcome::Success(record),
            Err(SourceError::Empty(message)) => Outcome::Empty(message),
            Err(e) => Outcome::Error(e),
        }
    }
}

#[derive(Debug)]
pub struct SourceResult {
    pub source: SourceId,
    pub outcome: Outcome,
}

pub struct Dispatcher {
    adapters: HashMap<SourceId, Arc<dyn SourceAdapter>>,
    policy: Policy,
}

impl Dispatcher {
    /// Later adapters with a duplicate id replace earlier ones.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, policy: Policy) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.id(), a)).collect();
        Self { adapters, policy }
    }

    /// One result per adapter in the category's route, in route order.
    /// Adapter failures never abort the dispatch.
    pub async fn dispatch(&self, query: &Query) -> Vec<SourceResult> {
        let Some(route) = self.policy.route(query.category) else {
            warn!(category = %query.category, "no sources routed for category");
            return Vec::new();
        };

        let started = Instant::now();
        let query = Arc::new(query.clone());
        let results = match route.fan_out {
            FanOut::RunAll => self.run_all(&route.sources, &query).await,
            FanOut::StopOnSuccess => self.run_until_success(&route.sources, &query).await,
        };

        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Error(_)))
            .count();
        info!(
            category = %query.category,
            sources = results.len(),
            succeeded,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query dispatched"
        );
        results
    }

    async fn run_all(&self, sources: &[SourceId], query: &Arc<Query>) -> Vec<SourceResult> {
        let tasks = sources.iter().map(|&id| {
            let adapter = self.adapters.get(&id).cloned();
            let query = Arc::clone(query);
            async move {
                let outcome = match adapter {
                    Some(adapter) => spawn_adapter(adapter, query).await,
                    None => unregistered(id),
                };
                SourceResult { source: id, outcome }
            }
        });
        join_all(tasks).await
    }

    async fn run_until_success(
        &self,
        sources: &[SourceId],
        query: &Arc<Query>,
    ) -> Vec<SourceResult> {
        let mut results = Vec::with_capacity(sources.len());
        let mut winner: Option<SourceId> = None;
        for &id in sources {
            let outcome = match (winner, self.adapters.get(&id)) {
                (Some(w), _) => {
                    Outcome::Empty(format!("skipped: {} already answered", w.display_name()))
                }
                (None, Some(adapter)) => {
                    spawn_adapter(Arc::clone(adapter), Arc::clone(query)).await
                }
                (None, None) => unregistered(id),
            };
            if winner.is_none() && outcome.is_success() {
                winner = Some(id);
            }
            results.push(SourceResult { source: id, outcome });
        }
        results
    }
}

fn unregistered(id: SourceId) -> Outcome {
    warn!(source = %id, "source is routed but not registered");
    Outcome::Error(SourceError::Unconfigured(id.as_str()))
}

/// Run one adapter on its own task so a panic stays contained.
async fn spawn_adapter(adapter: Arc<dyn SourceAdapter>, query: Arc<Query>) -> Outcome {
    let id = adapter.id();
    match tokio::spawn(run_adapter(adapter, query)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(source = %id, error = %e, "source task aborted");
            Outcome::Error(SourceError::Internal(e.to_string()))
        }
    }
}

async fn run_adapter(adapter: Arc<dyn SourceAdapter>, query: Arc<Query>) -> Outcome {
    let id = adapter.id();
    let limit = adapter.timeout();
    let started = Instant::now();

    let result = tokio::time::timeout(limit, adapter.fetch(&query))
        .await
        .unwrap_or(Err(SourceError::Timeout(limit)));

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(record) => debug!(source = %id, elapsed_ms, fields = record.len(), "source answered"),
        Err(SourceError::Empty(message)) => {
            debug!(source = %id, elapsed_ms, reason = %message, "source had no data")
        }
        Err(e) => warn!(source = %id, elapsed_ms, kind = e.kind(), error = %e, "source failed"),
    }
    result.into()
}
