//! Domain events produced by the feed.

use std::fmt;

use serde::Serialize;

pub mod event_bus;
pub mod generator;

/// The four kinds of simulated occurrence the feed produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Query,
    Advisory,
    Hotspot,
    Yield,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Query,
        EventKind::Advisory,
        EventKind::Hotspot,
        EventKind::Yield,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Query => "query",
            EventKind::Advisory => "advisory",
            EventKind::Hotspot => "hotspot",
            EventKind::Yield => "yield",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Low => "Low",
            Urgency::Medium => "Medium",
            Urgency::High => "High",
        };
        f.write_str(s)
    }
}

/// A farmer asking the advisory desk about a crop problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPayload {
    pub farmer_name: String,
    pub crop: String,
    pub issue: String,
    pub status: String,
}

/// An advisory that went out to farmers.
///
/// `crops` and `regions` each hold a single label. Message formatting
/// downstream relies on that shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryPayload {
    pub title: String,
    pub crops: String,
    pub regions: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotPayload {
    pub disease: String,
    pub crop: String,
    pub region: String,
    /// 0..=99
    pub severity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPayload {
    pub crop: String,
    /// kg/ha, 2000..=2999
    pub predicted_yield: u32,
    /// 0..=99
    pub confidence: u8,
}

/// Payload of a [`DomainEvent`], one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Query(QueryPayload),
    Advisory(AdvisoryPayload),
    Hotspot(HotspotPayload),
    Yield(YieldPayload),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Query(_) => EventKind::Query,
            EventPayload::Advisory(_) => EventKind::Advisory,
            EventPayload::Hotspot(_) => EventKind::Hotspot,
            EventPayload::Yield(_) => EventKind::Yield,
        }
    }
}

/// One unit of delivery from the feed to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    kind: EventKind,
    payload: EventPayload,
    produced_at: u64,
}

impl DomainEvent {
    /// Creates an event. The kind is taken from the payload variant.
    pub fn new(payload: EventPayload, produced_at: u64) -> Self {
        Self {
            kind: payload.kind(),
            payload,
            produced_at,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Milliseconds on the producing feed's monotonic clock.
    pub fn produced_at(&self) -> u64 {
        self.produced_at
    }
}
