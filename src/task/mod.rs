//! Timer-driven event production.

pub mod event_feed;
pub mod scheduler;
