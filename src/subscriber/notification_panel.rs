use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::Result;
use log::debug;

use crate::event::DomainEvent;
use crate::event::EventKind;
use crate::subscriber::Subscriber;
use crate::subscriber::event_message_builder::EventMessageBuilder;
use crate::subscriber::event_message_builder::format_age;

pub const DEFAULT_PANEL_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: EventKind,
    pub message: String,
    pub produced_at: u64,
    pub read: bool,
}

impl Notification {
    /// Relative age at feed time `now_ms`, e.g. `5m ago`.
    pub fn age(&self, now_ms: u64) -> String {
        format_age(now_ms.saturating_sub(self.produced_at))
    }
}

/// Most-recent-first notification history with an unread counter.
#[derive(Debug)]
pub struct NotificationList {
    capacity: usize,
    items: VecDeque<Notification>,
    unread: usize,
    next_id: u64,
}

impl NotificationList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
            unread: 0,
            next_id: 1,
        }
    }

    pub fn push(&mut self, event: &DomainEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_front(Notification {
            id,
            kind: event.kind(),
            message: EventMessageBuilder::new(event).build(),
            produced_at: event.produced_at(),
            read: false,
        });
        self.items.truncate(self.capacity);
        self.unread += 1;
        id
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    /// Text shown on a bell icon: empty when nothing is unread, `9+` past nine.
    pub fn label(&self) -> String {
        match self.unread {
            0 => String::new(),
            n if n > 9 => "9+".to_string(),
            n => n.to_string(),
        }
    }

    pub fn items(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    pub fn mark_all_read(&mut self) {
        self.unread = 0;
        for item in self.items.iter_mut() {
            item.read = true;
        }
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Live-updates panel on the dashboard.
///
/// Opening the panel marks everything read. The unread counter keeps
/// counting events that were already pushed out of the capped history.
#[derive(Debug)]
pub struct NotificationPanel {
    state: Mutex<PanelState>,
}

#[derive(Debug)]
struct PanelState {
    list: NotificationList,
    visible: bool,
}

impl NotificationPanel {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PanelState {
                list: NotificationList::new(capacity),
                visible: false,
            }),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().list.items()
    }

    pub fn unread(&self) -> usize {
        self.state().list.unread()
    }

    /// Unread count as shown on the panel's own bell.
    pub fn label(&self) -> String {
        self.state().list.label()
    }

    pub fn is_visible(&self) -> bool {
        self.state().visible
    }

    /// Shows the panel if hidden (marking all read) or hides it.
    pub fn toggle(&self) {
        let mut state = self.state();
        if !state.visible {
            state.list.mark_all_read();
        }
        state.visible = !state.visible;
    }

    pub fn dismiss(&self, id: u64) -> bool {
        self.state().list.dismiss(id)
    }

    pub fn clear(&self) {
        self.state().list.clear();
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotificationPanel {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_CAPACITY)
    }
}

impl Subscriber for NotificationPanel {
    fn callback(&self, event: &DomainEvent) -> Result<()> {
        let id = self.state().list.push(event);
        debug!("Notification panel received {} event as #{id}.", event.kind());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::generator::EventGenerator;

    fn events(n: usize) -> Vec<DomainEvent> {
        let mut generator = EventGenerator::seeded(23);
        (0..n)
            .map(|i| DomainEvent::new(generator.next_payload(), i as u64 * 1000))
            .collect()
    }

    #[test]
    fn test_history_is_capped_newest_first() {
        let panel = NotificationPanel::new(3);
        for event in events(5) {
            panel.callback(&event).unwrap();
        }

        let items = panel.notifications();
        assert_eq!(items.len(), 3);
        let stamps: Vec<u64> = items.iter().map(|n| n.produced_at).collect();
        assert_eq!(stamps, [4000, 3000, 2000]);
        assert_eq!(panel.unread(), 5);
    }

    #[test]
    fn test_opening_marks_read() {
        let panel = NotificationPanel::default();
        for event in events(2) {
            panel.callback(&event).unwrap();
        }

        assert_eq!(panel.label(), "2");
        panel.toggle();
        assert!(panel.is_visible());
        assert_eq!(panel.unread(), 0);
        assert_eq!(panel.label(), "");
        assert!(panel.notifications().iter().all(|n| n.read));

        panel.toggle();
        assert!(!panel.is_visible());
    }

    #[test]
    fn test_dismiss_and_clear() {
        let panel = NotificationPanel::default();
        for event in events(3) {
            panel.callback(&event).unwrap();
        }
        let first = panel.notifications()[0].id;

        assert!(panel.dismiss(first));
        assert!(!panel.dismiss(first));
        assert_eq!(panel.notifications().len(), 2);

        panel.clear();
        assert!(panel.notifications().is_empty());
    }

    #[test]
    fn test_bell_label_caps_at_nine() {
        let panel = NotificationPanel::new(3);
        for event in events(12) {
            panel.callback(&event).unwrap();
        }
        assert_eq!(panel.notifications().len(), 3);
        assert_eq!(panel.unread(), 12);
        assert_eq!(panel.label(), "9+");
    }

    #[test]
    fn test_notification_age() {
        let panel = NotificationPanel::default();
        for event in events(2) {
            panel.callback(&event).unwrap();
        }
        let items = panel.notifications();
        assert_eq!(items[0].age(1000), "Just now");
        assert_eq!(items[1].age(5 * 60_000), "5m ago");
        assert_eq!(items[1].age(0), "Just now");
    }
}
