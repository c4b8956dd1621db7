//! Common test utilities.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use agri_feed::event::DomainEvent;
use agri_feed::event::generator::EventGenerator;
use agri_feed::task::event_feed::DelayRange;
use agri_feed::task::event_feed::EventFeed;
use agri_feed::task::scheduler::ManualScheduler;

/// Interval used by [`fixed_interval_feed`]; every tick lands exactly here.
#[allow(dead_code)]
pub const TICK: Duration = Duration::from_millis(1000);

/// Feed on virtual time with the default randomized delays.
#[allow(dead_code)]
pub fn manual_feed(seed: u64) -> (EventFeed, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let feed = EventFeed::new(Arc::new(scheduler.clone()), EventGenerator::seeded(seed));
    (feed, scheduler)
}

/// Feed on virtual time that ticks every [`TICK`] exactly.
#[allow(dead_code)]
pub fn fixed_interval_feed(seed: u64) -> (EventFeed, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let delays = DelayRange::new(TICK, TICK + Duration::from_millis(1)).unwrap();
    let feed = EventFeed::with_delays(
        Arc::new(scheduler.clone()),
        EventGenerator::seeded(seed),
        delays,
    );
    (feed, scheduler)
}

/// Events collected by a subscriber callback.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Recorder {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(
        &self,
    ) -> impl Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync + use<> {
        let events = self.events.clone();
        move |event: &DomainEvent| {
            events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}
