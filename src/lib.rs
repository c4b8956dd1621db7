//! agri-feed - simulated real-time event feed for an agricultural advisory
//! dashboard.
//!
//! This crate provides:
//! - Typed domain events (farmer queries, advisories, disease hotspots, yield predictions)
//! - A timer-driven feed that fans each event out to its subscribers
//! - Dashboard consumers (notification panel, header badge, stat counters)

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod subscriber;
pub mod task;
