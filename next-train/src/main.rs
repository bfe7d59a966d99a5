use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use next_train::cache::DiskCache;
use next_train::config::AppConfig;
use next_train::domain::{JourneyRecord, minutes_until};
use next_train::preferences::{Preferences, PreferencesStore, Urgency};
use next_train::rail::{MockUpstream, RailClient, Upstream};
use next_train::timetable::TimetableService;

/// How often to refresh the station directory (24 hours).
const STATION_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_CONFIG_PATH: &str = "next-train.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = if config_path.exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path.display(), "no config file; using defaults");
        AppConfig::default()
    };

    let store = PreferencesStore::new(&config.preferences_path);
    let cache = DiskCache::new(&config.cache_dir);

    if let Some(dir) = &config.mock_data_dir {
        info!(dir = %dir.display(), "serving mock data");
        let service = TimetableService::new(MockUpstream::from_dir(dir)?, cache);
        run(service, store).await;
    } else {
        let primary = RailClient::new_or_misconfigured(config.primary_source());
        if primary.is_misconfigured() {
            warn!("primary source is misconfigured; relying on proxy and cache");
        }

        let mut service = TimetableService::new(primary, cache);
        if let Some(proxy) = config.proxy_source() {
            match RailClient::new(proxy) {
                Ok(proxy) => service = service.with_proxy(proxy),
                Err(e) => warn!(error = %e, "proxy source is misconfigured; running without it"),
            }
        }
        run(service, store).await;
    }

    Ok(())
}

async fn run<U>(service: TimetableService<U, DiskCache>, store: PreferencesStore)
where
    U: Upstream + 'static,
{
    let prefs = load_preferences(&store).await;

    let cold = service.fetch_stations_cold_start().await;
    info!(count = cold.stations.len(), "station directory ready");

    let (refresh, departures) =
        futures::join!(cold.refresh, service.fetch_timetable(&prefs));
    if let Ok(Ok(stations)) = refresh {
        info!(count = stations.len(), "station directory refreshed");
    }
    report(&prefs, departures);

    // Refresh the directory daily
    let stations_service = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATION_REFRESH_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = stations_service.fetch_stations().await {
                warn!(error = %e, "station directory refresh failed");
            }
        }
    });

    let mut interval = tokio::time::interval(prefs.refresh_interval());
    interval.tick().await;
    loop {
        interval.tick().await;

        let prefs = load_preferences(&store).await;
        if interval.period() != prefs.refresh_interval() {
            interval = tokio::time::interval(prefs.refresh_interval());
            interval.tick().await;
        }

        if !prefs.is_active_at(Utc::now()) {
            continue;
        }
        report(&prefs, service.fetch_timetable(&prefs).await);
    }
}

async fn load_preferences(store: &PreferencesStore) -> Preferences {
    match store.load().await {
        Ok(prefs) => prefs,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "unreadable preferences; using defaults");
            Preferences::default()
        }
    }
}

fn report<E: std::fmt::Display>(prefs: &Preferences, result: Result<Vec<JourneyRecord>, E>) {
    let records = match result {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "could not load departures");
            return;
        }
    };

    let Some(first) = records.first() else {
        println!("No trains match the current filters.");
        return;
    };

    println!("{} → {}", first.from_station_name, first.to_station_name);
    if let Some(age) = first.cache_age_minutes() {
        println!("(offline, data from {age} min ago)");
    }

    let now = Utc::now();
    for record in records.iter().take(5) {
        let minutes = minutes_until(record.departure_time, now);
        let cue = match prefs.urgency(minutes) {
            Urgency::Red => "!!",
            Urgency::Yellow => "! ",
            Urgency::Normal => "  ",
        };
        let changes = if record.is_direct() {
            "direct".to_string()
        } else {
            format!("{} change(s) via {}", record.change_count, record.all_train_numbers.join("/"))
        };
        println!(
            "{cue} {} → {}  train {:<5} platform {:<3} {:>7}  in {minutes} min  {changes}",
            record.departure_clock(),
            record.arrival_clock(),
            record.primary_train_number,
            record.origin_platform,
            record.duration_label(),
        );
    }
}
