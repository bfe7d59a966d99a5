//! Tests for the fallback chain.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::oneshot;

use crate::cache::{MemoryCache, PayloadCache, STATIONS_KEY};
use crate::domain::{DataSource, FixedClock, StationId};
use crate::planner::MaxChanges;
use crate::preferences::Preferences;
use crate::domain::RouteQuery;
use crate::rail::{
    FetchError, MockResponse, MockUpstream, RailClient, SourceConfig, SourceKind, Upstream,
};

use super::TimetableService;

type Service = TimetableService<MockUpstream, MemoryCache>;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// 07:50 in Tel Aviv.
fn t0() -> DateTime<Utc> {
    utc("2025-06-01T04:50:00Z")
}

/// A payload with one travel per `(train numbers, departure, arrival)`.
/// Train numbers are space separated, one per leg. Times are network local.
fn timetable(travels: &[(&str, &str, &str)]) -> Vec<u8> {
    let travels: Vec<serde_json::Value> = travels
        .iter()
        .map(|(trains, dep, arr)| {
            let legs: Vec<serde_json::Value> = trains
                .split_whitespace()
                .enumerate()
                .map(|(i, train)| {
                    serde_json::json!({
                        "trainNumber": train,
                        "orignStation": 3700,
                        "destinationStation": 2300,
                        "originPlatform": i + 1,
                        "departureTime": format!("2025-06-01T{dep}:00"),
                        "arrivalTime": format!("2025-06-01T{arr}:00"),
                    })
                })
                .collect();
            serde_json::json!({ "trains": legs })
        })
        .collect();
    serde_json::to_vec(&serde_json::json!({ "result": { "travels": travels } })).unwrap()
}

fn morning() -> Vec<u8> {
    timetable(&[
        ("310", "08:20", "09:20"),
        ("101", "08:00", "09:05"),
        ("205 411", "08:05", "09:30"),
    ])
}

fn proxy_morning() -> Vec<u8> {
    timetable(&[("777", "08:10", "09:10")])
}

fn stations_payload() -> Vec<u8> {
    br#"{"result": [
        {"stationId": 3700, "stationName": "Tel Aviv Savidor"},
        {"stationId": 2300, "stationName": "Haifa Hof HaCarmel"},
        {"stationId": 4900, "stationName": "Nahariya"}
    ]}"#
    .to_vec()
}

fn build(primary: MockUpstream, proxy: MockUpstream) -> (Service, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(t0()));
    let service = TimetableService::new(primary, MemoryCache::default())
        .with_proxy(proxy)
        .with_clock(clock.clone());
    (service, clock)
}

fn down() -> MockUpstream {
    MockUpstream::unreachable()
}

fn serving(timetable: Vec<u8>) -> MockUpstream {
    MockUpstream::new(MockResponse::Body(timetable), MockResponse::Status(404))
}

fn trains(records: &[crate::domain::JourneyRecord]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r.primary_train_number.as_str())
        .collect()
}

#[tokio::test]
async fn primary_success_is_live_sorted_and_cached() {
    let (service, _) = build(serving(morning()), down());

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    assert_eq!(trains(&records), vec!["101", "205", "310"]);
    assert!(records.iter().all(|r| r.source == DataSource::Live));
    assert_eq!(records[1].change_count, 1);
    assert_eq!(records[1].all_train_numbers, vec!["205", "411"]);

    assert_eq!(service.primary().timetable_calls(), 1);
    assert_eq!(service.proxy().unwrap().timetable_calls(), 0);

    let cached = service.cache().get("3700_2300", t0()).await.unwrap();
    assert_eq!(cached.payload, morning());
    assert_eq!(cached.age_minutes, 0);
}

#[tokio::test]
async fn proxy_answers_when_primary_fails() {
    let primary = MockUpstream::new(MockResponse::Status(500), MockResponse::Status(500));
    let (service, _) = build(primary, serving(proxy_morning()));

    // A stale entry from an hour ago
    service
        .cache()
        .put("3700_2300", &morning(), t0() - Duration::hours(1))
        .await;

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    assert_eq!(trains(&records), vec!["777"]);
    assert!(!records[0].is_from_cache());
    assert_eq!(service.primary().timetable_calls(), 1);
    assert_eq!(service.proxy().unwrap().timetable_calls(), 1);

    let cached = service.cache().get("3700_2300", t0()).await.unwrap();
    assert_eq!(cached.payload, proxy_morning());
    assert_eq!(cached.age_minutes, 0);
}

#[tokio::test]
async fn stale_cache_is_last_resort() {
    let (service, clock) = build(serving(morning()), down());

    service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    service
        .primary()
        .set_timetable(MockResponse::Status(503));
    clock.advance(Duration::minutes(12));

    // 08:02 local now; the 08:00 train is gone
    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    assert_eq!(trains(&records), vec!["205", "310"]);
    for record in &records {
        assert!(record.is_from_cache());
        assert_eq!(record.cache_age_minutes(), Some(12));
    }
    assert_eq!(service.primary().timetable_calls(), 2);
    assert_eq!(service.proxy().unwrap().timetable_calls(), 1);
}

#[tokio::test]
async fn fresh_cache_skips_network() {
    let (service, _) = build(serving(proxy_morning()), down());
    service
        .cache()
        .put("3700_2300", &morning(), t0() - Duration::minutes(4))
        .await;

    let prefs = Preferences {
        refresh_interval_secs: 300,
        ..Preferences::default()
    };
    let records = service.fetch_timetable(&prefs).await.unwrap();

    assert_eq!(trains(&records), vec!["101", "205", "310"]);
    for record in &records {
        assert_eq!(record.source, DataSource::Cached { age_minutes: 4 });
    }
    assert_eq!(service.primary().timetable_calls(), 0);
    assert_eq!(service.proxy().unwrap().timetable_calls(), 0);
}

#[tokio::test]
async fn sub_minute_interval_always_fetches() {
    let (service, _) = build(serving(proxy_morning()), down());
    service.cache().put("3700_2300", &morning(), t0()).await;

    let prefs = Preferences {
        refresh_interval_secs: 30,
        ..Preferences::default()
    };
    let records = service.fetch_timetable(&prefs).await.unwrap();

    assert_eq!(trains(&records), vec!["777"]);
    assert_eq!(service.primary().timetable_calls(), 1);
}

#[tokio::test]
async fn every_source_failing_is_terminal() {
    let primary = MockUpstream::new(MockResponse::Status(500), MockResponse::Status(500));
    let proxy = MockUpstream::new(
        MockResponse::Transport("timed out".into()),
        MockResponse::Transport("timed out".into()),
    );
    let (service, _) = build(primary, proxy);

    let err = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        FetchError::CacheUnavailable { key, .. } if key == "3700_2300"
    ));
    assert!(!err.is_fallback_trigger());

    let attempts = err.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].source, SourceKind::Primary);
    assert!(matches!(
        attempts[0].error,
        FetchError::HttpStatus { status: 500, .. }
    ));
    assert_eq!(attempts[1].source, SourceKind::Proxy);
    assert!(matches!(attempts[1].error, FetchError::Transport(_)));
}

#[tokio::test]
async fn undecodable_response_falls_through() {
    let primary = MockUpstream::new(MockResponse::body("<html>busy</html>"), MockResponse::Empty);
    let (service, _) = build(primary, serving(proxy_morning()));

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    assert_eq!(trains(&records), vec!["777"]);
    let cached = service.cache().get("3700_2300", t0()).await.unwrap();
    assert_eq!(cached.payload, proxy_morning());
}

#[tokio::test]
async fn unparsable_date_falls_through() {
    let bad = br#"{"result": {"travels": [{"trains": [
        {"trainNumber": 1, "departureTime": "soon", "arrivalTime": "later"}
    ]}]}}"#;
    let primary = MockUpstream::new(MockResponse::body(bad), MockResponse::Empty);
    let (service, _) = build(primary, serving(morning()));

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn unusable_cache_is_terminal() {
    let (service, _) = build(down(), down());
    service
        .cache()
        .put("3700_2300", b"not json", t0() - Duration::hours(2))
        .await;

    let err = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap_err();

    match err {
        FetchError::CacheUnavailable { reason, attempts, .. } => {
            assert!(reason.contains("normalize"));
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn empty_timetable_is_success() {
    let (service, _) = build(serving(timetable(&[])), down());

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn reversed_route_swaps_query_and_key() {
    let (service, _) = build(serving(morning()), down());
    let prefs = Preferences {
        reversed: true,
        ..Preferences::default()
    };

    service.fetch_timetable(&prefs).await.unwrap();

    let query = service.primary().last_query().unwrap();
    assert_eq!(query.from, StationId::new("2300"));
    assert_eq!(query.to, StationId::new("3700"));
    assert!(service.cache().get("2300_3700", t0()).await.is_some());
    assert!(service.cache().get("3700_2300", t0()).await.is_none());
}

#[tokio::test]
async fn filters_apply_to_cached_results() {
    let (service, _) = build(down(), down());
    service
        .cache()
        .put("3700_2300", &morning(), t0() - Duration::minutes(1))
        .await;

    // 07:50 now; 10 minute walk leaves only trains after 08:00; direct only
    let prefs = Preferences {
        walk_buffer_mins: 10,
        max_changes: MaxChanges::AtMost(0),
        ..Preferences::default()
    };
    let records = service.fetch_timetable(&prefs).await.unwrap();

    assert_eq!(trains(&records), vec!["310"]);
    assert!(records[0].is_from_cache());
}

#[tokio::test]
async fn station_names_come_from_directory() {
    let (service, _) = build(serving(morning()), down());
    service
        .primary()
        .set_stations(MockResponse::Body(stations_payload()));

    service.fetch_stations().await.unwrap();
    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();

    assert_eq!(records[0].from_station_name, "Tel Aviv Savidor");
    assert_eq!(records[0].to_station_name, "Haifa Hof HaCarmel");
}

#[tokio::test]
async fn stations_always_hit_network_and_update_directory() {
    let primary = MockUpstream::new(MockResponse::Empty, MockResponse::Body(stations_payload()));
    let (service, _) = build(primary, down());
    service
        .cache()
        .put(STATIONS_KEY, b"[]", t0() - Duration::minutes(1))
        .await;

    let stations = service.fetch_stations().await.unwrap();

    assert_eq!(stations.len(), 3);
    assert_eq!(service.primary().stations_calls(), 1);
    assert_eq!(service.directory().len().await, 3);
    assert_eq!(
        service
            .directory()
            .name_of(&StationId::new("4900"))
            .await
            .as_deref(),
        Some("Nahariya")
    );

    let cached = service.cache().get(STATIONS_KEY, t0()).await.unwrap();
    assert_eq!(cached.payload, stations_payload());
}

#[tokio::test]
async fn stations_fall_back_to_cache() {
    let (service, clock) = build(down(), down());
    service
        .cache()
        .put(STATIONS_KEY, &stations_payload(), t0())
        .await;
    clock.advance(Duration::days(3));

    let stations = service.fetch_stations().await.unwrap();
    assert_eq!(stations.len(), 3);
    assert_eq!(service.directory().len().await, 3);

    let (empty, _) = build(down(), down());
    let err = empty.fetch_stations().await.unwrap_err();
    assert!(matches!(err, FetchError::CacheUnavailable { key, .. } if key == STATIONS_KEY));
    assert_eq!(empty.directory().len().await, 2);
}

#[tokio::test]
async fn cold_start_serves_default_then_refreshes() {
    let primary = MockUpstream::new(MockResponse::Empty, MockResponse::Body(stations_payload()));
    let (service, _) = build(primary, down());

    let cold = service.fetch_stations_cold_start().await;
    assert_eq!(cold.stations.len(), 2);

    let refreshed = cold.refresh.await.unwrap().unwrap();
    assert_eq!(refreshed.len(), 3);
    assert_eq!(service.directory().len().await, 3);
}

#[tokio::test]
async fn cold_start_serves_cached_directory() {
    let (service, _) = build(down(), down());
    service
        .cache()
        .put(STATIONS_KEY, &stations_payload(), t0() - Duration::days(1))
        .await;

    let cold = service.fetch_stations_cold_start().await;
    assert_eq!(cold.stations.len(), 3);

    // Network is down, so the refresh falls back to the same cached copy.
    let refreshed = cold.refresh.await.unwrap().unwrap();
    assert_eq!(refreshed.len(), 3);
}

#[tokio::test]
async fn callback_wrappers_deliver_results() {
    let primary = MockUpstream::new(MockResponse::Body(morning()), MockResponse::Status(500));
    let (service, _) = build(primary, down());

    let (tx, rx) = oneshot::channel();
    service
        .fetch_timetable_with(Preferences::default(), move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap().unwrap().len(), 3);

    let (tx, rx) = oneshot::channel();
    service
        .fetch_stations_with(move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();
    assert!(matches!(
        rx.await.unwrap(),
        Err(FetchError::CacheUnavailable { .. })
    ));
}

/// A source that takes `delay` of clock time to answer.
struct SlowUpstream {
    inner: MockUpstream,
    clock: Arc<FixedClock>,
    delay: Duration,
}

impl Upstream for SlowUpstream {
    async fn fetch_timetable(&self, query: &RouteQuery) -> Result<Vec<u8>, FetchError> {
        self.clock.advance(self.delay);
        self.inner.fetch_timetable(query).await
    }

    async fn fetch_stations(&self) -> Result<Vec<u8>, FetchError> {
        self.clock.advance(self.delay);
        self.inner.fetch_stations().await
    }
}

#[tokio::test]
async fn cache_is_stamped_when_written() {
    let clock = Arc::new(FixedClock::new(t0()));
    let slow = |inner, secs| SlowUpstream {
        inner,
        clock: clock.clone(),
        delay: Duration::seconds(secs),
    };
    let service = TimetableService::new(
        slow(
            MockUpstream::new(MockResponse::Status(500), MockResponse::Status(500)),
            40,
        ),
        MemoryCache::default(),
    )
    .with_proxy(slow(serving(morning()), 50))
    .with_clock(clock.clone());

    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    let entry = service.cache().entry("3700_2300").await.unwrap();
    assert_eq!(entry.timestamp, t0() + Duration::seconds(90));
}

#[tokio::test]
async fn misconfigured_primary_still_reaches_cache() {
    let primary = RailClient::new_or_misconfigured(SourceConfig::primary("key\nbroken"));
    assert!(primary.is_misconfigured());

    let clock = Arc::new(FixedClock::new(t0()));
    let service = TimetableService::new(primary, MemoryCache::default()).with_clock(clock);

    let err = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.attempts()[0].error,
        FetchError::InvalidQuery(_)
    ));

    service
        .cache()
        .put("3700_2300", &morning(), t0() - Duration::hours(1))
        .await;
    let records = service
        .fetch_timetable(&Preferences::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.cache_age_minutes() == Some(60)));
}

