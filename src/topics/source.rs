//! Per-topic polling unit: TTL gate, last-good rows, failure tracking, sort.
//!
//! A refresh is split into [`TopicSource::begin_refresh`] (the gate, cheap and
//! taken under the lock) and [`TopicSource::complete_refresh`] (token lookup
//! and the blocking fetch, run without the lock). The dashboard runs the second
//! half on a worker thread; [`TopicSource::maybe_refresh`] runs both inline.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{CredentialCache, Token};
use crate::backend::Backend;
use crate::core::errors::Result;
use crate::topics::TopicId;
use crate::topics::catalog::{self, TopicDefinition};
use crate::topics::dataset::{SortState, SortableDataset};
use crate::topics::row::Row;

/// Fetch collaborator for one topic.
pub trait TopicFetcher: Send + Sync {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>>;
}

/// Why the latest attempt did not produce rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum FailureReason {
    Unauthenticated,
    BackendError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::BackendError(details) => write!(f, "backend error: {details}"),
        }
    }
}

/// Observable lifecycle of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    /// Never attempted.
    Idle,
    /// Last attempt succeeded and the interval has not elapsed.
    Fresh,
    /// Last attempt succeeded and the interval has elapsed.
    Stale,
    /// An attempt is in flight.
    Fetching,
    /// Last attempt failed; the previous rows (if any) are still served.
    Failed,
}

/// Result of one call into the refresh path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReport {
    /// Gated by the interval or by an attempt already in flight.
    Skipped,
    Refreshed { rows: usize },
    Failed(FailureReason),
}

/// Proof that the gate admitted an attempt. Consumed by
/// [`TopicSource::complete_refresh`] or [`TopicSource::cancel_refresh`].
#[derive(Debug)]
#[must_use]
pub struct RefreshTicket {
    topic: TopicId,
    started: Instant,
}

impl RefreshTicket {
    #[must_use]
    pub const fn topic(&self) -> TopicId {
        self.topic
    }

    #[must_use]
    pub const fn started(&self) -> Instant {
        self.started
    }
}

#[derive(Debug)]
struct SourceState {
    last_attempt: Option<Instant>,
    last_success_at: Option<DateTime<Utc>>,
    has_succeeded: bool,
    failure: Option<FailureReason>,
    in_flight: bool,
    token: Option<Token>,
    dataset: SortableDataset,
    fetch_calls: u64,
}

/// Point-in-time copy of what the view needs from a source.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub topic: TopicId,
    pub state: TopicState,
    pub failure: Option<FailureReason>,
    pub sort: SortState,
    pub sort_key: &'static str,
    pub rows: Vec<Row>,
    pub last_success_at: Option<DateTime<Utc>>,
}

pub struct TopicSource {
    definition: &'static TopicDefinition,
    interval: Duration,
    fetcher: Arc<dyn TopicFetcher>,
    credentials: Arc<CredentialCache>,
    state: Mutex<SourceState>,
}

impl fmt::Debug for TopicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicSource")
            .field("topic", &self.definition.id)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag if the fetch unwinds before settling.
struct InFlight<'a> {
    source: &'a TopicSource,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let mut state = self.source.state.lock();
            state.in_flight = false;
            state.failure = Some(FailureReason::BackendError(
                "fetch worker panicked".to_string(),
            ));
        }
    }
}

impl TopicSource {
    pub fn new(
        topic: TopicId,
        interval: Duration,
        fetcher: Arc<dyn TopicFetcher>,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self> {
        let definition = catalog::definition(topic);
        let dataset = SortableDataset::new(definition.columns, definition.default_sort)?;
        Ok(Self {
            definition,
            interval,
            fetcher,
            credentials,
            state: Mutex::new(SourceState {
                last_attempt: None,
                last_success_at: None,
                has_succeeded: false,
                failure: None,
                in_flight: false,
                token: None,
                dataset,
                fetch_calls: 0,
            }),
        })
    }

    #[must_use]
    pub fn topic(&self) -> TopicId {
        self.definition.id
    }

    #[must_use]
    pub const fn definition(&self) -> &'static TopicDefinition {
        self.definition
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.definition.id.backend()
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    // ─── refresh path ───

    /// Admit an attempt if the interval has elapsed and none is in flight.
    /// Records `now` as the attempt time.
    pub fn begin_refresh(&self, now: Instant) -> Option<RefreshTicket> {
        let mut state = self.state.lock();
        if state.in_flight {
            return None;
        }
        if let Some(last) = state.last_attempt
            && now.saturating_duration_since(last) < self.interval
        {
            return None;
        }
        state.last_attempt = Some(now);
        state.in_flight = true;
        debug!(topic = %self.topic(), "refresh admitted");
        Some(RefreshTicket {
            topic: self.topic(),
            started: now,
        })
    }

    /// Whether `ticket` was issued by this source for the attempt in flight.
    fn holds(&self, ticket: &RefreshTicket) -> bool {
        ticket.topic == self.topic() && self.state.lock().in_flight
    }

    /// Obtain a token, fetch, and publish the outcome. A ticket issued by
    /// another source, or arriving with no attempt in flight, is `Skipped`.
    pub fn complete_refresh(&self, ticket: RefreshTicket) -> RefreshReport {
        if !self.holds(&ticket) {
            warn!(
                topic = %self.topic(),
                ticket = %ticket.topic(),
                "foreign refresh ticket ignored"
            );
            return RefreshReport::Skipped;
        }
        let mut guard = InFlight {
            source: self,
            settled: false,
        };
        let prior = self.state.lock().token.clone();
        let backend = self.backend();

        let report = match self.credentials.get_token(backend, prior.as_ref()) {
            None => {
                let mut state = self.state.lock();
                state.token = None;
                state.failure = Some(FailureReason::Unauthenticated);
                state.in_flight = false;
                RefreshReport::Failed(FailureReason::Unauthenticated)
            }
            Some(token) => {
                let outcome = {
                    self.state.lock().fetch_calls += 1;
                    self.fetcher.fetch(&token)
                };
                let mut state = self.state.lock();
                state.token = Some(token);
                state.in_flight = false;
                match outcome {
                    Ok(rows) => {
                        let count = rows.len();
                        state.dataset.replace_rows(rows);
                        state.failure = None;
                        state.has_succeeded = true;
                        state.last_success_at = Some(Utc::now());
                        RefreshReport::Refreshed { rows: count }
                    }
                    Err(err) => {
                        let reason = FailureReason::BackendError(err.to_string());
                        state.failure = Some(reason.clone());
                        RefreshReport::Failed(reason)
                    }
                }
            }
        };
        guard.settled = true;
        drop(guard);

        let elapsed = ticket.started().elapsed();
        match &report {
            RefreshReport::Refreshed { rows } => info!(
                topic = %self.topic(),
                rows,
                elapsed_ms = elapsed.as_millis(),
                "topic refreshed"
            ),
            RefreshReport::Failed(reason) => warn!(
                topic = %self.topic(),
                reason = %reason,
                "topic refresh failed; keeping previous rows"
            ),
            RefreshReport::Skipped => {}
        }
        report
    }

    /// Abandon an admitted attempt that could not be started. The attempt
    /// still counts against the interval.
    pub fn cancel_refresh(&self, ticket: RefreshTicket, details: &str) -> RefreshReport {
        if !self.holds(&ticket) {
            return RefreshReport::Skipped;
        }
        let reason = FailureReason::BackendError(details.to_string());
        let mut state = self.state.lock();
        state.in_flight = false;
        state.failure = Some(reason.clone());
        drop(state);
        warn!(topic = %ticket.topic(), details, "refresh cancelled");
        RefreshReport::Failed(reason)
    }

    /// Gate and run an attempt on the calling thread.
    pub fn maybe_refresh(&self, now: Instant) -> RefreshReport {
        self.begin_refresh(now)
            .map_or(RefreshReport::Skipped, |ticket| self.complete_refresh(ticket))
    }

    // ─── reads ───

    #[must_use]
    pub fn state(&self, now: Instant) -> TopicState {
        let state = self.state.lock();
        Self::derive_state(&state, now, self.interval)
    }

    fn derive_state(state: &SourceState, now: Instant, interval: Duration) -> TopicState {
        if state.in_flight {
            return TopicState::Fetching;
        }
        if state.failure.is_some() {
            return TopicState::Failed;
        }
        match state.last_attempt {
            None => TopicState::Idle,
            Some(_) if !state.has_succeeded => TopicState::Idle,
            Some(last) if now.saturating_duration_since(last) < interval => TopicState::Fresh,
            Some(_) => TopicState::Stale,
        }
    }

    /// Rows of the latest success in display order; empty before the first.
    #[must_use]
    pub fn current_rows(&self) -> Vec<Row> {
        self.state.lock().dataset.ordered_rows()
    }

    #[must_use]
    pub fn failure(&self) -> Option<FailureReason> {
        self.state.lock().failure.clone()
    }

    #[must_use]
    pub fn last_attempt(&self) -> Option<Instant> {
        self.state.lock().last_attempt
    }

    #[must_use]
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_success_at
    }

    /// Number of calls made to the fetch collaborator.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.state.lock().fetch_calls
    }

    /// Everything the view needs, taken under one lock.
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> SourceSnapshot {
        let state = self.state.lock();
        SourceSnapshot {
            topic: self.topic(),
            state: Self::derive_state(&state, now, self.interval),
            failure: state.failure.clone(),
            sort: state.dataset.sort_state(),
            sort_key: state.dataset.sort_column().key,
            rows: state.dataset.ordered_rows(),
            last_success_at: state.last_success_at,
        }
    }

    // ─── sorting ───

    #[must_use]
    pub fn sort_state(&self) -> SortState {
        self.state.lock().dataset.sort_state()
    }

    pub fn set_sort(&self, column: usize, ascending: bool) -> Result<()> {
        self.state.lock().dataset.set_sort(column, ascending)?;
        debug!(topic = %self.topic(), column, ascending, "sort changed");
        Ok(())
    }

    pub fn set_sort_by_key(&self, key: &str, ascending: bool) -> Result<()> {
        self.state.lock().dataset.set_sort_by_key(key, ascending)?;
        debug!(topic = %self.topic(), key, ascending, "sort changed");
        Ok(())
    }

    pub fn cycle_sort(&self, forward: bool) {
        let mut state = self.state.lock();
        state.dataset.cycle_sort(forward);
        debug!(topic = %self.topic(), key = state.dataset.sort_column().key, "sort column cycled");
    }

    pub fn reverse_sort(&self) {
        let mut state = self.state.lock();
        state.dataset.reverse();
        debug!(
            topic = %self.topic(),
            ascending = state.dataset.sort_state().ascending,
            "sort direction reversed"
        );
    }
}
