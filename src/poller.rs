//! Repeating aggregate cycles for one tracked flight.
//!
//! A [`Poller`] is `Idle` until [`Poller::start`], `Active` while its timer
//! runs, and `Stopped` after [`Poller::stop`]; [`Poller::clear`] returns it to
//! `Idle`. It can always be started again with a new query.
//!
//! Guarantees:
//! - at most one timer per poller; starting again cancels the previous one
//! - at most one cycle in flight; a tick that finds a cycle still running is
//!   dropped, not queued
//! - nothing is published after `stop`, even if a cycle completes later
//!
//! Results are published through a [`watch`] slot, so a slow consumer only
//! ever sees the latest update.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info};

use crate::aggregator::Aggregator;
use crate::observation::AggregateResult;
use crate::query::FlightQuery;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

/// One published cycle.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub result: AggregateResult,
    /// 1-based count of publishes since the last `start`.
    pub cycle: u64,
    pub published_at: DateTime<Utc>,
    /// Time until the next scheduled refresh, as of publishing.
    pub next_refresh_in: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Active { query: FlightQuery, interval: Duration },
    Stopped { query: FlightQuery },
}

struct Session {
    id: u64,
    query: FlightQuery,
    interval: Duration,
    cancel: CancellationToken,
}

enum Phase {
    Idle,
    Active(Session),
    Stopped(FlightQuery),
}

struct Shared {
    phase: Phase,
    next_session: u64,
    cycles: u64,
    last_publish: Option<Instant>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Poller {
    aggregator: Arc<Aggregator>,
    per_call_timeout: Duration,
    shared: Arc<Mutex<Shared>>,
    slot: Arc<watch::Sender<Option<PollUpdate>>>,
}

impl Poller {
    pub fn new(aggregator: Arc<Aggregator>, per_call_timeout: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            aggregator,
            per_call_timeout,
            shared: Arc::new(Mutex::new(Shared {
                phase: Phase::Idle,
                next_session: 0,
                cycles: 0,
                last_publish: None,
            })),
            slot: Arc::new(slot),
        }
    }

    /// Receiver for published updates. `None` until the first publish and
    /// again after [`Poller::clear`].
    pub fn subscribe(&self) -> watch::Receiver<Option<PollUpdate>> {
        self.slot.subscribe()
    }

    /// Starts polling `query` every `interval`, running the first cycle
    /// immediately. Any running session is cancelled first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, query: FlightQuery, interval: Duration) -> Result<(), PollerError> {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        let mut shared = lock(&self.shared);
        if let Phase::Active(previous) = &shared.phase {
            info!(query = %previous.query, "Replacing active poll session");
            previous.cancel.cancel();
        }

        shared.next_session += 1;
        shared.cycles = 0;
        shared.last_publish = None;

        let session = Session {
            id: shared.next_session,
            query: query.clone(),
            interval,
            cancel: CancellationToken::new(),
        };

        let ctx = CycleContext {
            aggregator: Arc::clone(&self.aggregator),
            query,
            interval,
            per_call_timeout: self.per_call_timeout,
            session_id: session.id,
            cancel: session.cancel.clone(),
            in_flight: Arc::new(AtomicBool::new(false)),
            shared: Arc::clone(&self.shared),
            slot: Arc::clone(&self.slot),
        };

        let span =
            tracing::info_span!("poll_session", session = session.id, query = %session.query);
        info!(
            query = %session.query,
            interval_ms = interval.as_millis() as u64,
            "Polling started"
        );
        tokio::spawn(run_timer(ctx).instrument(span));

        shared.phase = Phase::Active(session);
        Ok(())
    }

    /// Cancels the timer. A cycle still in flight is abandoned and its result
    /// is never published. No-op unless active.
    pub fn stop(&self) {
        let mut shared = lock(&self.shared);
        let phase = std::mem::replace(&mut shared.phase, Phase::Idle);
        shared.phase = match phase {
            Phase::Active(session) => {
                session.cancel.cancel();
                info!(query = %session.query, "Polling stopped");
                Phase::Stopped(session.query)
            }
            other => other,
        };
        shared.last_publish = None;
    }

    /// Stops if needed, returns to `Idle` and empties the published slot.
    pub fn clear(&self) {
        self.stop();
        let mut shared = lock(&self.shared);
        shared.phase = Phase::Idle;
        self.slot.send_replace(None);
    }

    pub fn state(&self) -> PollerState {
        match &lock(&self.shared).phase {
            Phase::Idle => PollerState::Idle,
            Phase::Active(session) => PollerState::Active {
                query: session.query.clone(),
                interval: session.interval,
            },
            Phase::Stopped(query) => PollerState::Stopped { query: query.clone() },
        }
    }

    /// Countdown to the next refresh, measured from the last publish.
    /// `None` unless active with at least one published update.
    pub fn next_refresh_in(&self) -> Option<Duration> {
        let shared = lock(&self.shared);
        match (&shared.phase, shared.last_publish) {
            (Phase::Active(session), Some(at)) => {
                Some(session.interval.saturating_sub(at.elapsed()))
            }
            _ => None,
        }
    }

    pub fn latest(&self) -> Option<PollUpdate> {
        self.slot.borrow().clone()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Phase::Active(session) = &lock(&self.shared).phase {
            session.cancel.cancel();
        }
    }
}

#[derive(Clone)]
struct CycleContext {
    aggregator: Arc<Aggregator>,
    query: FlightQuery,
    interval: Duration,
    per_call_timeout: Duration,
    session_id: u64,
    cancel: CancellationToken,
    in_flight: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
    slot: Arc<watch::Sender<Option<PollUpdate>>>,
}

async fn run_timer(ctx: CycleContext) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if ctx
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous cycle still in flight, skipping tick");
            continue;
        }

        tokio::spawn(run_cycle(ctx.clone()).in_current_span());
    }

    debug!("Poll timer exited");
}

async fn run_cycle(ctx: CycleContext) {
    let result = tokio::select! {
        _ = ctx.cancel.cancelled() => None,
        result = ctx.aggregator.aggregate(&ctx.query, ctx.per_call_timeout) => Some(result),
    };

    match result {
        Some(result) => ctx.publish(result),
        None => debug!("Cycle abandoned after stop"),
    }

    ctx.in_flight.store(false, Ordering::Release);
}

impl CycleContext {
    fn publish(&self, result: AggregateResult) {
        let mut shared = lock(&self.shared);

        let current = matches!(&shared.phase, Phase::Active(s) if s.id == self.session_id);
        if !current || self.cancel.is_cancelled() {
            debug!("Discarding result of a stopped session");
            return;
        }

        shared.cycles += 1;
        shared.last_publish = Some(Instant::now());

        let update = PollUpdate {
            result,
            cycle: shared.cycles,
            published_at: Utc::now(),
            next_refresh_in: self.interval,
        };
        debug!(cycle = update.cycle, source = ?update.result.source(), "Publishing update");
        self.slot.send_replace(Some(update));
    }
}
