//! Consumers of feed events.

pub mod dashboard_counters;
pub mod event_message_builder;
pub mod header_badge;
pub mod notification_panel;

use std::sync::Arc;

use anyhow::Result;

use crate::event::DomainEvent;
use crate::event::event_bus::Subscription;
use crate::task::event_feed::EventFeed;
use crate::task::event_feed::FeedLease;

/// Receives every event dispatched by the feed it is subscribed to.
///
/// Called synchronously on the feed's tick, so implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait Subscriber: Send + Sync {
    fn callback(&self, event: &DomainEvent) -> Result<()>;
}

/// A consumer mounted on a feed: its subscription plus, for consumers that
/// drive the feed, a lease keeping it running.
///
/// Dropping the attachment unmounts the consumer.
pub struct Attachment {
    subscription: Subscription,
    lease: Option<FeedLease>,
}

impl Attachment {
    /// Subscribes `subscriber` and keeps the feed running until detached.
    pub fn driving<S>(feed: &EventFeed, subscriber: Arc<S>) -> Self
    where
        S: Subscriber + 'static,
    {
        let subscription = feed.subscribe_subscriber(subscriber);
        Self {
            subscription,
            lease: Some(feed.acquire()),
        }
    }

    /// Subscribes `subscriber` without affecting whether the feed runs.
    pub fn passive<S>(feed: &EventFeed, subscriber: Arc<S>) -> Self
    where
        S: Subscriber + 'static,
    {
        Self {
            subscription: feed.subscribe_subscriber(subscriber),
            lease: None,
        }
    }

    /// Unsubscribes and releases the lease, if any.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        self.lease.take();
    }
}
