//! Integration tests for the feed's lifecycle and delivery contract.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use agri_feed::event::EventKind;
use agri_feed::event::generator::EventGenerator;
use agri_feed::task::event_feed::EventFeed;
use agri_feed::task::event_feed::FeedState;
use agri_feed::task::scheduler::TokioScheduler;
use common::Recorder;
use common::TICK;

mod common;

#[test]
fn test_double_start_keeps_one_pending_tick() {
    let (feed, scheduler) = common::fixed_interval_feed(1);
    let recorder = Recorder::new();
    let _sub = feed.subscribe(recorder.callback());

    feed.start();
    feed.start();
    assert_eq!(scheduler.pending(), 1);

    scheduler.advance(TICK);
    assert_eq!(recorder.len(), 1);
    scheduler.advance(TICK);
    assert_eq!(recorder.len(), 2);
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn test_double_stop_is_harmless() {
    let (feed, scheduler) = common::manual_feed(2);
    feed.stop();
    feed.start();
    feed.stop();
    feed.stop();
    assert_eq!(feed.state(), FeedState::Stopped);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_fan_out_delivers_same_event_once() {
    let (feed, scheduler) = common::fixed_interval_feed(3);
    let a = Recorder::new();
    let b = Recorder::new();
    let _a = feed.subscribe(a.callback());
    let _b = feed.subscribe(b.callback());

    feed.start();
    scheduler.advance(TICK);

    assert_eq!(a.len(), 1);
    assert_eq!(a.events(), b.events());
}

#[test]
fn test_unsubscribe_removes_only_that_registration() {
    let (feed, scheduler) = common::fixed_interval_feed(4);
    let a = Recorder::new();
    let b = Recorder::new();
    let sub_a = feed.subscribe(a.callback());
    let _sub_b = feed.subscribe(b.callback());

    feed.start();
    scheduler.advance(TICK);

    sub_a.unsubscribe();
    sub_a.unsubscribe();
    assert_eq!(feed.subscriber_count(), 1);

    scheduler.advance(TICK * 3);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 4);
}

#[test]
fn test_payload_fields_match_kind() {
    let (feed, _scheduler) = common::manual_feed(5);
    let expected = |kind: EventKind| -> BTreeSet<&'static str> {
        let fields: &[&str] = match kind {
            EventKind::Query => &["farmerName", "crop", "issue", "status"],
            EventKind::Advisory => &["title", "crops", "regions", "urgency"],
            EventKind::Hotspot => &["disease", "crop", "region", "severity"],
            EventKind::Yield => &["crop", "predictedYield", "confidence"],
        };
        fields.iter().copied().collect()
    };

    let mut kinds = BTreeSet::new();
    for _ in 0..10_000 {
        let (event, _) = feed.produce_now();
        let json = serde_json::to_value(&event).unwrap();
        let payload = json["payload"].as_object().unwrap();

        let fields: BTreeSet<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(fields, expected(event.kind()), "{json}");
        assert!(payload.values().all(|v| !v.is_null()));
        assert_eq!(json["kind"], event.kind().as_str());
        kinds.insert(event.kind().as_str());
    }
    assert_eq!(kinds.len(), 4);
}

#[test]
fn test_historical_data_shape() {
    let (feed, _scheduler) = common::manual_feed(6);
    let samples = feed.historical_data(EventKind::Yield, 24);

    assert_eq!(samples.len(), 24);
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(samples.iter().all(|s| (50..150).contains(&s.value)));
    assert!(feed.historical_data(EventKind::Query, 0).is_empty());
}

#[test]
fn test_events_arrive_in_production_order() {
    let (feed, scheduler) = common::manual_feed(7);
    let recorder = Recorder::new();
    let _sub = feed.subscribe(recorder.callback());

    feed.start();
    scheduler.advance(Duration::from_secs(60));

    let events = recorder.events();
    assert!(events.len() >= 12, "only {} events", events.len());
    assert!(
        events
            .windows(2)
            .all(|w| w[0].produced_at() < w[1].produced_at())
    );
    assert!(
        events
            .windows(2)
            .all(|w| (2000..5000).contains(&(w[1].produced_at() - w[0].produced_at())))
    );
}

#[test]
fn test_no_delivery_while_stopped() {
    let (feed, scheduler) = common::fixed_interval_feed(8);
    let recorder = Recorder::new();
    let _sub = feed.subscribe(recorder.callback());

    feed.start();
    scheduler.advance(TICK * 2);
    feed.stop();
    scheduler.advance(TICK * 10);
    assert_eq!(recorder.len(), 2);

    feed.start();
    scheduler.advance(TICK);
    assert_eq!(recorder.len(), 3);
}

#[test]
fn test_subscriptions_survive_restart() {
    let (feed, scheduler) = common::fixed_interval_feed(9);
    let recorder = Recorder::new();
    let _sub = feed.subscribe(recorder.callback());

    for _ in 0..3 {
        feed.start();
        scheduler.advance(TICK);
        feed.stop();
    }
    assert_eq!(recorder.len(), 3);
    assert_eq!(feed.subscriber_count(), 1);
}

#[test]
fn test_panicking_subscriber_does_not_stop_the_feed() {
    let (feed, scheduler) = common::fixed_interval_feed(10);
    let _bad = feed.subscribe(|_| panic!("render failed"));
    let recorder = Recorder::new();
    let _good = feed.subscribe(recorder.callback());

    feed.start();
    scheduler.advance(TICK * 3);

    assert_eq!(recorder.len(), 3);
    assert_eq!(feed.state(), FeedState::Running);
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn test_independent_feeds_do_not_share_subscribers() {
    let (first, first_clock) = common::fixed_interval_feed(11);
    let (second, _second_clock) = common::fixed_interval_feed(12);
    let recorder = Recorder::new();
    let _sub = second.subscribe(recorder.callback());

    first.start();
    first_clock.advance(TICK * 5);
    assert_eq!(recorder.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tokio_feed_end_to_end() {
    let scheduler = Arc::new(TokioScheduler::current().unwrap());
    let feed = EventFeed::new(scheduler, EventGenerator::seeded(13));
    let recorder = Recorder::new();
    let _sub = feed.subscribe(recorder.callback());

    feed.start();
    tokio::time::sleep(Duration::from_millis(1999)).await;
    assert_eq!(recorder.len(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let delivered = recorder.len();
    assert!((6..=16).contains(&delivered), "delivered {delivered}");

    feed.stop();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(recorder.len(), delivered);
}
