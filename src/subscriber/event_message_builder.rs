use crate::event::DomainEvent;
use crate::event::EventPayload;

/// Formats a feed event as a one-line notification message.
pub struct EventMessageBuilder<'a> {
    event: &'a DomainEvent,
}

impl<'a> EventMessageBuilder<'a> {
    pub fn new(event: &'a DomainEvent) -> Self {
        Self { event }
    }

    pub fn build(&self) -> String {
        match self.event.payload() {
            EventPayload::Query(q) => {
                format!("New query from {} about {} {}", q.farmer_name, q.crop, q.issue)
            }
            EventPayload::Advisory(a) => {
                format!("Advisory sent: {} for {} in {}", a.title, a.crops, a.regions)
            }
            EventPayload::Hotspot(h) => format!(
                "Disease alert: {} detected in {} ({})",
                h.disease, h.crop, h.region
            ),
            EventPayload::Yield(y) => format!(
                "Yield update: {} prediction {} kg/ha",
                y.crop, y.predicted_yield
            ),
        }
    }
}

/// Human-readable age of something `elapsed_ms` old.
pub fn format_age(elapsed_ms: u64) -> String {
    let minutes = elapsed_ms / 60_000;
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    format!("{}h ago", minutes / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AdvisoryPayload;
    use crate::event::HotspotPayload;
    use crate::event::QueryPayload;
    use crate::event::Urgency;
    use crate::event::YieldPayload;

    fn message(payload: EventPayload) -> String {
        EventMessageBuilder::new(&DomainEvent::new(payload, 0)).build()
    }

    #[test]
    fn test_messages_per_kind() {
        assert_eq!(
            message(EventPayload::Query(QueryPayload {
                farmer_name: "Farmer 12".to_string(),
                crop: "Cotton".to_string(),
                issue: "Pest".to_string(),
                status: "pending".to_string(),
            })),
            "New query from Farmer 12 about Cotton Pest"
        );
        assert_eq!(
            message(EventPayload::Advisory(AdvisoryPayload {
                title: "Advisory 8".to_string(),
                crops: "Rice".to_string(),
                regions: "Sindh".to_string(),
                urgency: Urgency::High,
            })),
            "Advisory sent: Advisory 8 for Rice in Sindh"
        );
        assert_eq!(
            message(EventPayload::Hotspot(HotspotPayload {
                disease: "Blight".to_string(),
                crop: "Maize".to_string(),
                region: "KPK".to_string(),
                severity: 80,
            })),
            "Disease alert: Blight detected in Maize (KPK)"
        );
        assert_eq!(
            message(EventPayload::Yield(YieldPayload {
                crop: "Wheat".to_string(),
                predicted_yield: 2710,
                confidence: 64,
            })),
            "Yield update: Wheat prediction 2710 kg/ha"
        );
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "Just now");
        assert_eq!(format_age(59_999), "Just now");
        assert_eq!(format_age(60_000), "1m ago");
        assert_eq!(format_age(59 * 60_000), "59m ago");
        assert_eq!(format_age(60 * 60_000), "1h ago");
        assert_eq!(format_age(150 * 60_000), "2h ago");
    }
}
