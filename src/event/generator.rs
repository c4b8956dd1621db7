//! Synthetic event and sample generation.

use std::time::Duration;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::event::AdvisoryPayload;
use crate::event::EventKind;
use crate::event::EventPayload;
use crate::event::HotspotPayload;
use crate::event::QueryPayload;
use crate::event::Urgency;
use crate::event::YieldPayload;

const QUERY_CROPS: &[&str] = &["Wheat", "Rice", "Maize", "Cotton"];
const QUERY_ISSUES: &[&str] = &["Disease", "Weather", "Pest", "Soil"];
const ADVISORY_CROPS: &[&str] = &["Wheat", "Rice"];
const ADVISORY_REGIONS: &[&str] = &["Punjab", "Sindh"];
const HOTSPOT_DISEASES: &[&str] = &["Rust", "Blight", "Wilt"];
const HOTSPOT_CROPS: &[&str] = &["Wheat", "Rice", "Maize"];
const HOTSPOT_REGIONS: &[&str] = &["Punjab", "Sindh", "KPK"];
const YIELD_CROPS: &[&str] = &["Wheat", "Rice", "Maize"];

const QUERY_STATUS: &str = "pending";
const HISTORY_MIN_VALUE: u32 = 50;
const HISTORY_MAX_VALUE: u32 = 150;

/// One point of a synthetic hourly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HistoricalSample {
    pub timestamp: DateTime<Utc>,
    pub value: u32,
}

/// Random source for everything the feed makes up: event kinds, payload
/// fields, tick delays and historical samples.
///
/// Build it with [`EventGenerator::seeded`] for reproducible output.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    rng: StdRng,
}

impl EventGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_kind(&mut self) -> EventKind {
        EventKind::ALL[self.rng.random_range(0..EventKind::ALL.len())]
    }

    /// Picks a kind uniformly and fills a payload for it.
    pub fn next_payload(&mut self) -> EventPayload {
        let kind = self.next_kind();
        self.payload_for(kind)
    }

    pub fn payload_for(&mut self, kind: EventKind) -> EventPayload {
        match kind {
            EventKind::Query => EventPayload::Query(QueryPayload {
                farmer_name: format!("Farmer {}", self.rng.random_range(0..1000)),
                crop: self.pick(QUERY_CROPS),
                issue: self.pick(QUERY_ISSUES),
                status: QUERY_STATUS.to_string(),
            }),
            EventKind::Advisory => EventPayload::Advisory(AdvisoryPayload {
                title: format!("Advisory {}", self.rng.random_range(0..100)),
                crops: self.pick(ADVISORY_CROPS),
                regions: self.pick(ADVISORY_REGIONS),
                urgency: Urgency::ALL[self.rng.random_range(0..Urgency::ALL.len())],
            }),
            EventKind::Hotspot => EventPayload::Hotspot(HotspotPayload {
                disease: self.pick(HOTSPOT_DISEASES),
                crop: self.pick(HOTSPOT_CROPS),
                region: self.pick(HOTSPOT_REGIONS),
                severity: self.rng.random_range(0..100),
            }),
            EventKind::Yield => EventPayload::Yield(YieldPayload {
                crop: self.pick(YIELD_CROPS),
                predicted_yield: self.rng.random_range(2000..3000),
                confidence: self.rng.random_range(0..100),
            }),
        }
    }

    /// Uniform delay in `[min, max)`. Returns `min` when the range is empty.
    pub fn next_delay(&mut self, min: Duration, max: Duration) -> Duration {
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        if max_ms <= min_ms {
            return min;
        }
        Duration::from_millis(self.rng.random_range(min_ms..max_ms))
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// `window_hours` hourly samples ending at `now`, oldest first.
    ///
    /// The kind does not shape the series; every kind gets values in
    /// `[50, 150)`.
    pub fn historical(
        &mut self,
        _kind: EventKind,
        window_hours: u32,
        now: DateTime<Utc>,
    ) -> Vec<HistoricalSample> {
        let mut samples: Vec<HistoricalSample> = (0..window_hours)
            .map(|i| HistoricalSample {
                timestamp: now - TimeDelta::hours(i64::from(i)),
                value: self.rng.random_range(HISTORY_MIN_VALUE..HISTORY_MAX_VALUE),
            })
            .collect();
        samples.reverse();
        samples
    }

    fn pick(&mut self, vocabulary: &[&str]) -> String {
        vocabulary[self.rng.random_range(0..vocabulary.len())].to_string()
    }
}

impl Default for EventGenerator {
    fn default() -> Self {
        Self::new()
    }
}
