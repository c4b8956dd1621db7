//! Application entry point for agri-feed.
//!
//! Wires one shared event feed to the dashboard consumers and runs until
//! Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use agri_feed::config::Config;
use agri_feed::event::EventKind;
use agri_feed::event::event_bus::Subscription;
use agri_feed::event::generator::EventGenerator;
use agri_feed::logging::setup_logging;
use agri_feed::subscriber::Attachment;
use agri_feed::subscriber::dashboard_counters::DashboardCounters;
use agri_feed::subscriber::dashboard_counters::DashboardStats;
use agri_feed::subscriber::event_message_builder::EventMessageBuilder;
use agri_feed::subscriber::header_badge::HeaderBadge;
use agri_feed::subscriber::notification_panel::NotificationPanel;
use agri_feed::task::event_feed::EventFeed;
use agri_feed::task::scheduler::TokioScheduler;
use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;

struct Consumers {
    panel: Arc<NotificationPanel>,
    badge: Arc<HeaderBadge>,
    counters: Arc<DashboardCounters>,
    attachments: Vec<Attachment>,
    logger: Subscription,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;
    let _log_guard = setup_logging(&config)?;
    info!("Starting agri-feed...");

    let feed = setup_feed(&config)?;
    log_history(&feed, &config);
    let consumers = setup_consumers(&config, &feed);

    let (event, report) = feed.produce_now();
    debug!(
        "Warm-up {} event delivered to {} subscribers ({} failed).",
        event.kind(),
        report.delivered,
        report.failed
    );

    run(init_start).await?;

    shutdown(&feed, consumers);
    Ok(())
}

fn load_config() -> Result<Config> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    Ok(config)
}

fn setup_feed(config: &Config) -> Result<EventFeed> {
    debug!("Setting up EventFeed...");
    let generator = match config.seed {
        Some(seed) => EventGenerator::seeded(seed),
        None => EventGenerator::new(),
    };
    let scheduler = Arc::new(TokioScheduler::current()?);
    let feed = EventFeed::with_delays(scheduler, generator, config.delay_range()?);
    info!(
        "Feed ticks every {}-{}ms.",
        config.min_delay.as_millis(),
        config.max_delay.as_millis()
    );
    Ok(feed)
}

fn log_history(feed: &EventFeed, config: &Config) {
    let samples = feed.historical_data(EventKind::Yield, config.history_window_hours);
    match serde_json::to_string(&samples) {
        Ok(json) => debug!("Historical yield series: {json}"),
        Err(e) => debug!("Could not serialize historical series: {e}"),
    }
    info!("Loaded {} hours of historical yield data.", samples.len());
}

fn setup_consumers(config: &Config, feed: &EventFeed) -> Consumers {
    debug!("Setting up Subscribers...");
    let panel = Arc::new(NotificationPanel::new(config.notification_capacity));
    let badge = Arc::new(HeaderBadge::new(config.badge_capacity));
    let counter_rng = match config.seed {
        Some(seed) => EventGenerator::seeded(seed.wrapping_add(1)),
        None => EventGenerator::new(),
    };
    let counters = Arc::new(DashboardCounters::new(
        DashboardStats::default(),
        counter_rng,
    ));

    let attachments = vec![
        Attachment::passive(feed, counters.clone()),
        Attachment::driving(feed, panel.clone()),
        Attachment::driving(feed, badge.clone()),
    ];

    let logger = feed.subscribe(|event| {
        info!("[{}] {}", event.kind(), EventMessageBuilder::new(event).build());
        Ok(())
    });

    Consumers {
        panel,
        badge,
        counters,
        attachments,
        logger,
    }
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "agri-feed is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}

fn shutdown(feed: &EventFeed, consumers: Consumers) {
    let Consumers {
        panel,
        badge,
        counters,
        attachments,
        logger,
    } = consumers;
    logger.unsubscribe();
    drop(attachments);
    feed.stop();

    let stats = counters.snapshot();
    info!(
        "Final stats: {} queries, {} advisories, {} active farmers, {} disease alerts.",
        stats.total_queries, stats.advisories_sent, stats.active_farmers, stats.disease_alerts
    );
    info!(
        "Panel bell: '{}', header badge: '{}'.",
        panel.label(),
        badge.label()
    );
    let now = feed.now_millis();
    for notification in panel.notifications() {
        info!("  {} ({})", notification.message, notification.age(now));
    }
}
