use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::Result;

use crate::event::DomainEvent;
use crate::subscriber::Subscriber;
use crate::subscriber::notification_panel::Notification;
use crate::subscriber::notification_panel::NotificationList;

pub const DEFAULT_BADGE_CAPACITY: usize = 10;

/// Bell icon in the page header. Keeps its own history and unread count,
/// independent of the notification panel.
#[derive(Debug)]
pub struct HeaderBadge {
    list: Mutex<NotificationList>,
}

impl HeaderBadge {
    pub fn new(capacity: usize) -> Self {
        Self {
            list: Mutex::new(NotificationList::new(capacity)),
        }
    }

    pub fn unread(&self) -> usize {
        self.list().unread()
    }

    pub fn label(&self) -> String {
        self.list().label()
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.list().items()
    }

    pub fn mark_all_read(&self) {
        self.list().mark_all_read();
    }

    fn list(&self) -> MutexGuard<'_, NotificationList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HeaderBadge {
    fn default() -> Self {
        Self::new(DEFAULT_BADGE_CAPACITY)
    }
}

impl Subscriber for HeaderBadge {
    fn callback(&self, event: &DomainEvent) -> Result<()> {
        self.list().push(event);
        Ok(())
    }
}
