use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::Result;
use serde::Serialize;

use crate::event::DomainEvent;
use crate::event::EventPayload;
use crate::event::generator::EventGenerator;
use crate::subscriber::Subscriber;

/// Chance threshold for counting a query as a new active farmer.
const ACTIVE_FARMER_THRESHOLD: f64 = 0.9;

/// Stat cards on the dashboard overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_queries: u64,
    pub advisories_sent: u64,
    pub active_farmers: u64,
    pub disease_alerts: u64,
    /// Latest predicted yield per crop, kg/ha.
    pub latest_yields: BTreeMap<String, u32>,
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            total_queries: 12_486,
            advisories_sent: 247,
            active_farmers: 8_932,
            disease_alerts: 23,
            latest_yields: BTreeMap::new(),
        }
    }
}

/// Bumps dashboard counters as events arrive.
#[derive(Debug)]
pub struct DashboardCounters {
    stats: Mutex<DashboardStats>,
    generator: Mutex<EventGenerator>,
}

impl DashboardCounters {
    pub fn new(baseline: DashboardStats, generator: EventGenerator) -> Self {
        Self {
            stats: Mutex::new(baseline),
            generator: Mutex::new(generator),
        }
    }

    pub fn snapshot(&self) -> DashboardStats {
        self.stats().clone()
    }

    fn stats(&self) -> MutexGuard<'_, DashboardStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_adds_farmer(&self) -> bool {
        self.generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_unit()
            > ACTIVE_FARMER_THRESHOLD
    }
}

impl Subscriber for DashboardCounters {
    fn callback(&self, event: &DomainEvent) -> Result<()> {
        let adds_farmer =
            matches!(event.payload(), EventPayload::Query(_)) && self.query_adds_farmer();
        let mut stats = self.stats();
        match event.payload() {
            EventPayload::Query(_) => {
                stats.total_queries += 1;
                if adds_farmer {
                    stats.active_farmers += 1;
                }
            }
            EventPayload::Advisory(_) => stats.advisories_sent += 1,
            EventPayload::Hotspot(_) => stats.disease_alerts += 1,
            EventPayload::Yield(y) => {
                stats.latest_yields.insert(y.crop.clone(), y.predicted_yield);
            }
        }
        Ok(())
    }
}
