//! Tick-driven controller: owns the topic sources and the selected topic.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::CredentialCache;
use crate::backend::Backend;
use crate::core::errors::{Result, SquadError};
use crate::topics::TopicId;
use crate::topics::dataset::SortState;
use crate::topics::projection::Grid;
use crate::topics::source::{FailureReason, RefreshReport, TopicSource, TopicState};

/// Where refresh attempts run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// On the ticking thread. Used by one-shot commands and tests.
    Inline,
    /// On a named worker thread per attempt; completions arrive as notices.
    Background,
}

/// Completion of a background refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshNotice {
    pub topic: TopicId,
    pub report: RefreshReport,
}

/// User intents the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    Select(TopicId),
    NextTopic,
    PrevTopic,
    NextSortColumn,
    PrevSortColumn,
    ReverseSort,
}

/// Authentication status of one backend, as shown in the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub backend: Backend,
    pub authenticated: bool,
}

/// Everything needed to draw one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub topic: TopicId,
    pub state: TopicState,
    pub failure: Option<FailureReason>,
    pub sort: SortState,
    pub sort_key: &'static str,
    pub interval_secs: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub auth: Vec<AuthStatus>,
    pub grid: Grid,
}

pub struct DashboardController {
    sources: BTreeMap<TopicId, Arc<TopicSource>>,
    credentials: Arc<CredentialCache>,
    selected: TopicId,
    mode: RefreshMode,
    notices_tx: Sender<RefreshNotice>,
    notices_rx: Receiver<RefreshNotice>,
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardController")
            .field("topics", &self.sources.keys().collect::<Vec<_>>())
            .field("selected", &self.selected)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl DashboardController {
    /// Controller over `sources`, starting on `initial`, which must be one of them.
    pub fn new(
        sources: Vec<Arc<TopicSource>>,
        credentials: Arc<CredentialCache>,
        initial: TopicId,
        mode: RefreshMode,
    ) -> Result<Self> {
        let sources: BTreeMap<TopicId, Arc<TopicSource>> = sources
            .into_iter()
            .map(|source| (source.topic(), source))
            .collect();
        if !sources.contains_key(&initial) {
            return Err(SquadError::UnknownTopic {
                name: initial.name().to_string(),
            });
        }
        let (notices_tx, notices_rx) = unbounded();
        Ok(Self {
            sources,
            credentials,
            selected: initial,
            mode,
            notices_tx,
            notices_rx,
        })
    }

    #[must_use]
    pub const fn selected(&self) -> TopicId {
        self.selected
    }

    #[must_use]
    pub fn source(&self, topic: TopicId) -> Option<&Arc<TopicSource>> {
        self.sources.get(&topic)
    }

    fn selected_source(&self) -> &Arc<TopicSource> {
        // `new` and `select` only ever admit topics present in the map.
        &self.sources[&self.selected]
    }

    // ─── tick ───

    /// Offer the selected topic a refresh. Returns the inline report, or
    /// `Skipped` when gated or handed to a worker.
    pub fn tick(&self, now: Instant) -> RefreshReport {
        let source = self.selected_source();
        let Some(ticket) = source.begin_refresh(now) else {
            return RefreshReport::Skipped;
        };
        match self.mode {
            RefreshMode::Inline => source.complete_refresh(ticket),
            RefreshMode::Background => {
                let worker_source = Arc::clone(source);
                let tx = self.notices_tx.clone();
                let topic = source.topic();
                // The worker takes the ticket; a failed spawn leaves it here.
                let slot = Arc::new(Mutex::new(Some(ticket)));
                let worker_slot = Arc::clone(&slot);
                let spawned = thread::Builder::new()
                    .name(format!("squad-fetch-{topic}"))
                    .spawn(move || {
                        let Some(ticket) = worker_slot.lock().take() else {
                            return;
                        };
                        let report = worker_source.complete_refresh(ticket);
                        // Receiver gone means the dashboard is shutting down.
                        let _ = tx.send(RefreshNotice { topic, report });
                    });
                match spawned {
                    Ok(_) => {
                        debug!(topic = %topic, "refresh handed to worker");
                        RefreshReport::Skipped
                    }
                    Err(err) => slot.lock().take().map_or(RefreshReport::Skipped, |ticket| {
                        source.cancel_refresh(ticket, &format!("worker spawn failed: {err}"))
                    }),
                }
            }
        }
    }

    /// Completions that arrived since the last call.
    pub fn drain_notices(&self) -> Vec<RefreshNotice> {
        self.notices_rx.try_iter().collect()
    }

    /// Block until a background refresh completes or `timeout` elapses.
    pub fn wait_for_notice(&self, timeout: Duration) -> Option<RefreshNotice> {
        self.notices_rx.recv_timeout(timeout).ok()
    }

    // ─── navigation ───

    /// Switch topics. Never triggers a refresh; the topic shows its cached
    /// outcome until the next tick.
    pub fn select(&mut self, topic: TopicId) -> bool {
        if topic == self.selected || !self.sources.contains_key(&topic) {
            return false;
        }
        info!(from = %self.selected, to = %topic, "topic selected");
        self.selected = topic;
        true
    }

    fn step(&mut self, forward: bool) {
        let mut candidate = self.selected;
        for _ in 0..TopicId::ALL.len() {
            candidate = if forward {
                candidate.next()
            } else {
                candidate.prev()
            };
            if self.sources.contains_key(&candidate) {
                self.select(candidate);
                return;
            }
        }
    }

    pub fn apply(&mut self, action: ControllerAction) {
        match action {
            ControllerAction::Select(topic) => {
                self.select(topic);
            }
            ControllerAction::NextTopic => self.step(true),
            ControllerAction::PrevTopic => self.step(false),
            ControllerAction::NextSortColumn => self.selected_source().cycle_sort(true),
            ControllerAction::PrevSortColumn => self.selected_source().cycle_sort(false),
            ControllerAction::ReverseSort => self.selected_source().reverse_sort(),
        }
    }

    // ─── render ───

    #[must_use]
    pub fn auth_status(&self) -> Vec<AuthStatus> {
        Backend::ALL
            .into_iter()
            .map(|backend| AuthStatus {
                backend,
                authenticated: self.credentials.is_authenticated(backend),
            })
            .collect()
    }

    /// Project the selected topic's cached outcome.
    #[must_use]
    pub fn frame(&self, now: Instant) -> Frame {
        let source = self.selected_source();
        let snapshot = source.snapshot(now);
        let grid = source.definition().projection().project(&snapshot.rows);
        Frame {
            topic: snapshot.topic,
            state: snapshot.state,
            failure: snapshot.failure,
            sort: snapshot.sort,
            sort_key: snapshot.sort_key,
            interval_secs: source.interval().as_secs(),
            last_success_at: snapshot.last_success_at,
            auth: self.auth_status(),
            grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authenticator, Token};
    use crate::topics::row::Row;
    use crate::topics::source::TopicFetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Always;

    impl Authenticator for Always {
        fn obtain_token(&self, _: Backend, prior: Option<&Token>) -> Option<Token> {
            Some(prior.cloned().unwrap_or_else(|| Token::new("t")))
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl TopicFetcher for Counting {
        fn fetch(&self, _: &Token) -> Result<Vec<Row>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                Row::new().with("collection", "b").with("job", "x"),
                Row::new().with("collection", "a").with("job", "y"),
            ])
        }
    }

    fn controller(mode: RefreshMode) -> (DashboardController, Vec<Arc<Counting>>) {
        let credentials = Arc::new(CredentialCache::new(Arc::new(Always)));
        let mut fetchers = Vec::new();
        let sources = [TopicId::DefinedExchangeRates, TopicId::UndefinedExchangeRates]
            .into_iter()
            .map(|topic| {
                let fetcher = Arc::new(Counting::default());
                fetchers.push(Arc::clone(&fetcher));
                Arc::new(
                    TopicSource::new(
                        topic,
                        Duration::from_secs(20),
                        fetcher,
                        Arc::clone(&credentials),
                    )
                    .unwrap(),
                )
            })
            .collect();
        let controller = DashboardController::new(
            sources,
            credentials,
            TopicId::DefinedExchangeRates,
            mode,
        )
        .unwrap();
        (controller, fetchers)
    }

    #[test]
    fn initial_topic_must_exist() {
        let credentials = Arc::new(CredentialCache::new(Arc::new(Always)));
        let err = DashboardController::new(
            Vec::new(),
            credentials,
            TopicId::Instances,
            RefreshMode::Inline,
        )
        .unwrap_err();
        assert_eq!(err.code(), "SQD-1005");
    }

    #[test]
    fn tick_refreshes_only_the_selected_topic() {
        let (controller, fetchers) = controller(RefreshMode::Inline);
        let report = controller.tick(Instant::now());
        assert_eq!(report, RefreshReport::Refreshed { rows: 2 });
        assert_eq!(fetchers[0].0.load(Ordering::SeqCst), 1);
        assert_eq!(fetchers[1].0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn selecting_does_not_refresh() {
        let (mut controller, fetchers) = controller(RefreshMode::Inline);
        assert!(controller.select(TopicId::UndefinedExchangeRates));
        assert!(!controller.select(TopicId::UndefinedExchangeRates));
        assert!(!controller.select(TopicId::Instances), "not configured");
        let frame = controller.frame(Instant::now());
        assert_eq!(frame.state, TopicState::Idle);
        assert!(frame.grid.is_empty());
        assert_eq!(fetchers[1].0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn navigation_skips_missing_topics() {
        let (mut controller, _) = controller(RefreshMode::Inline);
        controller.apply(ControllerAction::NextTopic);
        assert_eq!(controller.selected(), TopicId::UndefinedExchangeRates);
        controller.apply(ControllerAction::NextTopic);
        assert_eq!(controller.selected(), TopicId::DefinedExchangeRates);
        controller.apply(ControllerAction::PrevTopic);
        assert_eq!(controller.selected(), TopicId::UndefinedExchangeRates);
    }

    #[test]
    fn frame_reflects_sort_actions() {
        let (mut controller, _) = controller(RefreshMode::Inline);
        let now = Instant::now();
        controller.tick(now);
        let frame = controller.frame(now);
        assert_eq!(frame.state, TopicState::Fresh);
        assert_eq!(frame.sort_key, "collection");
        assert_eq!(frame.grid.title, "Defined exchange rates (2)");
        assert_eq!(frame.grid.rows[0][1].text, "a");

        controller.apply(ControllerAction::ReverseSort);
        assert_eq!(controller.frame(now).grid.rows[0][1].text, "b");
        controller.apply(ControllerAction::NextSortColumn);
        assert_eq!(controller.frame(now).sort_key, "job");
        assert_eq!(
            frame.auth,
            vec![
                AuthStatus {
                    backend: Backend::AccountServer,
                    authenticated: false,
                },
                AuthStatus {
                    backend: Backend::DataManager,
                    authenticated: true,
                },
            ]
        );
    }

    #[test]
    fn background_refresh_reports_through_channel() {
        let (controller, fetchers) = controller(RefreshMode::Background);
        let now = Instant::now();
        assert_eq!(controller.tick(now), RefreshReport::Skipped);
        let notice = controller
            .wait_for_notice(Duration::from_secs(5))
            .expect("worker should finish");
        assert_eq!(notice.topic, TopicId::DefinedExchangeRates);
        assert_eq!(notice.report, RefreshReport::Refreshed { rows: 2 });
        assert_eq!(fetchers[0].0.load(Ordering::SeqCst), 1);
        assert_eq!(controller.frame(now).grid.row_count(), 2);
        assert!(controller.drain_notices().is_empty());
    }
}
