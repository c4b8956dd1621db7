//! The simulated real-time feed.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::debug;
use log::info;

use crate::error::FeedError;
use crate::event::DomainEvent;
use crate::event::EventKind;
use crate::event::event_bus::DispatchReport;
use crate::event::event_bus::SubscriberRegistry;
use crate::event::event_bus::Subscription;
use crate::event::generator::EventGenerator;
use crate::event::generator::HistoricalSample;
use crate::subscriber::Subscriber;
use crate::task::scheduler::Cancel;
use crate::task::scheduler::Scheduler;

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Stopped,
    Running,
}

/// Bounds for the randomized gap between ticks, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self, FeedError> {
        if min >= max {
            return Err(FeedError::InvalidDelayRange {
                min_ms: min.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}

enum RunState {
    Stopped,
    Running {
        generation: u64,
        pending: Option<Box<dyn Cancel>>,
    },
}

struct Lifecycle {
    run: RunState,
    generation: u64,
    leases: usize,
}

struct FeedInner {
    registry: SubscriberRegistry,
    scheduler: Arc<dyn Scheduler>,
    generator: Mutex<EventGenerator>,
    lifecycle: Mutex<Lifecycle>,
    delays: DelayRange,
}

/// Produces synthetic domain events on a randomized timer and fans each one
/// out to every subscriber.
///
/// Cloning yields another handle to the same feed. The subscriber registry
/// outlives stop/start cycles.
#[derive(Clone)]
pub struct EventFeed {
    inner: Arc<FeedInner>,
}

impl EventFeed {
    pub fn new(scheduler: Arc<dyn Scheduler>, generator: EventGenerator) -> Self {
        Self::with_delays(scheduler, generator, DelayRange::default())
    }

    pub fn with_delays(
        scheduler: Arc<dyn Scheduler>,
        generator: EventGenerator,
        delays: DelayRange,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                registry: SubscriberRegistry::new(),
                scheduler,
                generator: Mutex::new(generator),
                lifecycle: Mutex::new(Lifecycle {
                    run: RunState::Stopped,
                    generation: 0,
                    leases: 0,
                }),
                delays,
            }),
        }
    }

    pub fn state(&self) -> FeedState {
        match self.inner.lifecycle().run {
            RunState::Stopped => FeedState::Stopped,
            RunState::Running { .. } => FeedState::Running,
        }
    }

    /// Begins producing events. Does nothing if already running.
    pub fn start(&self) {
        FeedInner::start_locked(&self.inner, &mut self.inner.lifecycle());
    }

    /// Cancels the pending tick. Subscriptions are kept. Does nothing if
    /// already stopped.
    pub fn stop(&self) {
        FeedInner::stop_locked(&mut self.inner.lifecycle());
    }

    /// Registers `callback` for every event produced from now on.
    ///
    /// A callback returning `Err` or panicking is logged and skipped; other
    /// subscribers still receive the event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.registry.register_callback(callback)
    }

    pub fn subscribe_subscriber<S>(&self, subscriber: Arc<S>) -> Subscription
    where
        S: Subscriber + ?Sized + 'static,
    {
        self.inner.registry.register_subscriber(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Keeps the feed running for as long as the lease lives.
    ///
    /// Acquiring a lease starts the feed if it is stopped, including after a
    /// plain [`EventFeed::stop`] while other leases were held. Dropping the
    /// last outstanding lease stops the feed however it was started.
    /// Consumers sharing one feed use this so that one of them leaving does
    /// not stop delivery to the others.
    pub fn acquire(&self) -> FeedLease {
        let mut lifecycle = self.inner.lifecycle();
        lifecycle.leases += 1;
        FeedInner::start_locked(&self.inner, &mut lifecycle);
        FeedLease {
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// Milliseconds on the clock that stamps `produced_at`.
    pub fn now_millis(&self) -> u64 {
        self.inner.scheduler.now_millis()
    }

    /// Produces and dispatches one event now, outside the timer.
    pub fn produce_now(&self) -> (DomainEvent, DispatchReport) {
        FeedInner::produce(&self.inner)
    }

    /// Synthetic hourly series for `kind` ending now, oldest first.
    pub fn historical_data(&self, kind: EventKind, window_hours: u32) -> Vec<HistoricalSample> {
        self.inner
            .generator()
            .historical(kind, window_hours, Utc::now())
    }
}

impl FeedInner {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generator(&self) -> MutexGuard<'_, EventGenerator> {
        self.generator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(this: &Arc<Self>, lifecycle: &mut Lifecycle) {
        if matches!(lifecycle.run, RunState::Running { .. }) {
            return;
        }
        lifecycle.generation += 1;
        let generation = lifecycle.generation;
        let pending = FeedInner::schedule_tick(this, generation);
        lifecycle.run = RunState::Running {
            generation,
            pending: Some(pending),
        };
        info!("Event feed started.");
    }

    fn stop_locked(lifecycle: &mut Lifecycle) {
        if let RunState::Running { pending, .. } =
            std::mem::replace(&mut lifecycle.run, RunState::Stopped)
        {
            if let Some(pending) = pending {
                pending.cancel();
            }
            info!("Event feed stopped.");
        }
    }

    fn schedule_tick(this: &Arc<Self>, generation: u64) -> Box<dyn Cancel> {
        let delay = this
            .generator()
            .next_delay(this.delays.min(), this.delays.max());
        debug!("Next feed tick in {}ms.", delay.as_millis());
        let feed: Weak<Self> = Arc::downgrade(this);
        this.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(feed) = feed.upgrade() {
                    FeedInner::tick(&feed, generation);
                }
            }),
        )
    }

    fn is_current(&self, generation: u64) -> bool {
        matches!(
            self.lifecycle().run,
            RunState::Running { generation: g, .. } if g == generation
        )
    }

    fn tick(this: &Arc<Self>, generation: u64) {
        if !this.is_current(generation) {
            debug!("Skipping stale feed tick (generation {generation}).");
            return;
        }

        FeedInner::produce(this);

        let mut lifecycle = this.lifecycle();
        if let RunState::Running {
            generation: g,
            pending,
        } = &mut lifecycle.run
        {
            if *g == generation {
                *pending = Some(FeedInner::schedule_tick(this, generation));
            }
        }
    }

    fn produce(this: &Arc<Self>) -> (DomainEvent, DispatchReport) {
        let payload = this.generator().next_payload();
        let event = DomainEvent::new(payload, this.scheduler.now_millis());
        let report = this.registry.dispatch(&event);
        debug!(
            "Dispatched {} event to {} subscriber(s), {} failed.",
            event.kind(),
            report.delivered,
            report.failed
        );
        (event, report)
    }
}

/// Guard returned by [`EventFeed::acquire`].
pub struct FeedLease {
    feed: Weak<FeedInner>,
}

impl Drop for FeedLease {
    fn drop(&mut self) {
        let Some(inner) = self.feed.upgrade() else {
            return;
        };
        let mut lifecycle = inner.lifecycle();
        lifecycle.leases = lifecycle.leases.saturating_sub(1);
        if lifecycle.leases == 0 {
            FeedInner::stop_locked(&mut lifecycle);
        }
    }
}
