//! Overpass mirror client.

use std::sync::Arc;
use std::time::Duration;

use nearloo_core::{NetworkError, ReqwestErrorExt, SearchConfig, SearchError};
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::instrument;
use url::Url;

use crate::parse::{parse_elements, OverpassResponse};
use crate::query::{build_query, QueryShape};
use crate::retry::{EndpointFailure, RetryDecision};
use crate::schedule::{AttemptSchedule, Outcome, PlanState, SearchPlan};
use crate::types::{Place, SearchRequest};

pub const MIN_MAX_RESULTS: usize = 50;
pub const MAX_MAX_RESULTS: usize = 800;
pub const DEFAULT_MAX_RESULTS: usize = 300;
pub const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_secs(55);

/// Tunables of a [`RemoteSearchClient`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub endpoints: Vec<Url>,
    pub max_results: usize,
    /// Client-side bound on a single endpoint call.
    pub hard_timeout: Duration,
    pub schedule: AttemptSchedule,
}

impl SearchOptions {
    pub fn new(endpoints: Vec<Url>) -> Self {
        Self {
            endpoints,
            max_results: DEFAULT_MAX_RESULTS,
            hard_timeout: DEFAULT_HARD_TIMEOUT,
            schedule: AttemptSchedule::default(),
        }
    }

    /// Build options from configuration; unparseable endpoints are skipped with a warning.
    pub fn from_config(config: &SearchConfig) -> Self {
        let endpoints = config
            .endpoints
            .iter()
            .filter_map(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring invalid search endpoint '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Self {
            endpoints,
            max_results: config.max_results as usize,
            hard_timeout: Duration::from_secs(config.hard_timeout_secs),
            schedule: AttemptSchedule::new(
                &config.attempt_timeouts_secs,
                Duration::from_millis(config.retry_pause_ms),
            ),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_hard_timeout(mut self, hard_timeout: Duration) -> Self {
        self.hard_timeout = hard_timeout;
        self
    }

    pub fn with_schedule(mut self, schedule: AttemptSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    fn result_limit(&self) -> usize {
        self.max_results.clamp(MIN_MAX_RESULTS, MAX_MAX_RESULTS)
    }
}

/// Searches public toilets across mirror endpoints with retry and fallback.
///
/// Stateless between calls; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct RemoteSearchClient {
    client: Arc<Client>,
    options: SearchOptions,
}

impl RemoteSearchClient {
    pub fn new(options: SearchOptions) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent(concat!("nearloo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| e.into_network_error())?;

        Ok(Self {
            client: Arc::new(client),
            options,
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Places around `request`, at most `max_results`, in mirror order.
    ///
    /// An answer without places in range counts as not found and the schedule goes on;
    /// once it runs out, any such answer makes the result an empty list, not an error.
    ///
    /// # Errors
    /// `SearchError::RemoteUnavailable` with the last failure once every mirror, attempt
    /// and query shape has failed.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Place>, SearchError> {
        let endpoints = &self.options.endpoints;
        let mut plan = SearchPlan::new(
            request.include_likely(),
            &self.options.schedule,
            endpoints.len(),
        );
        let mut last_failure: Option<EndpointFailure> = None;
        let mut last_shape: Option<QueryShape> = None;

        while let Some(step) = plan.current() {
            if last_shape.is_some_and(|shape| shape != step.shape) {
                tracing::info!("Falling back to {:?} query", step.shape);
            }
            last_shape = Some(step.shape);

            if !step.pause_before.is_zero() {
                tokio::time::sleep(step.pause_before).await;
            }

            let endpoint = &endpoints[step.endpoint];
            let query = build_query(step.shape, request, step.server_timeout_secs);
            tracing::debug!(
                "Querying {} (attempt {}, shape {:?})",
                endpoint,
                step.attempt + 1,
                step.shape
            );

            let outcome = match self.fetch(endpoint, &query).await {
                Ok(response) => {
                    let mut places = parse_elements(&response.elements, step.shape);
                    if places.is_empty() {
                        tracing::debug!("{} answered with no places", endpoint);
                        Outcome::Empty
                    } else {
                        places.truncate(self.options.result_limit());
                        tracing::info!("Found {} places via {}", places.len(), endpoint);
                        return Ok(places);
                    }
                }
                Err(failure) => {
                    let outcome = match failure.decision() {
                        RetryDecision::Retry => {
                            tracing::warn!("Retryable failure from {}: {}", endpoint, failure);
                            Outcome::Retryable
                        }
                        RetryDecision::NoRetry => {
                            tracing::warn!("Permanent failure from {}: {}", endpoint, failure);
                            Outcome::Permanent
                        }
                    };
                    last_failure = Some(failure);
                    outcome
                }
            };

            plan.advance(outcome);
        }

        match plan.state() {
            PlanState::Empty => Ok(Vec::new()),
            _ => {
                let reason = last_failure
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "no search endpoints configured".to_string());
                tracing::error!("Remote search exhausted: {}", reason);
                Err(SearchError::unavailable(reason))
            }
        }
    }

    async fn fetch(&self, endpoint: &Url, query: &str) -> Result<OverpassResponse, EndpointFailure> {
        let call = async {
            let response = self
                .client
                .post(endpoint.clone())
                .header(ACCEPT, "application/json")
                .form(&[("data", query)])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EndpointFailure::status(status, &body));
            }

            response
                .json::<OverpassResponse>()
                .await
                .map_err(|e| EndpointFailure::Decode(e.to_string()))
        };

        tokio::time::timeout(self.options.hard_timeout, call)
            .await
            .map_err(|_| EndpointFailure::Timeout)?
    }
}
