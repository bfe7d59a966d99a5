//! Conversion from timetable DTOs to journey records.
//!
//! This is the only place that knows the upstream payload shape. Each
//! travel candidate becomes exactly one [`JourneyRecord`]: the first leg
//! supplies the departure, train number and platform, the last leg supplies
//! the arrival, and every leg contributes its train number and origin
//! platform to the per-leg lists.

use chrono::{DateTime, Utc};

use crate::domain::{
    DataSource, JourneyRecord, RouteQuery, Station, StationId, TimeParseError,
    parse_upstream_instant,
};

use super::types::{StationsEnvelope, TimetableEnvelope, TrainLeg, Travel};

/// Error during payload decoding or normalization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// Body was empty or whitespace
    #[error("empty payload")]
    Empty,

    /// Body did not match the expected envelope shape
    #[error("invalid JSON: {0}")]
    Json(String),

    /// A required date-time matched none of the known formats
    #[error("in train {train}: {source}")]
    InvalidTime {
        train: String,
        source: TimeParseError,
    },
}

/// Decode and normalize a raw timetable payload.
///
/// `stations` is used to fill in station names the payload omits.
pub fn normalize_timetable(
    body: &[u8],
    query: &RouteQuery,
    stations: &[Station],
) -> Result<Vec<JourneyRecord>, ConversionError> {
    let envelope = decode_timetable(body)?;
    convert_timetable(&envelope, query, stations)
}

/// Parse the timetable envelope without normalizing it.
pub fn decode_timetable(body: &[u8]) -> Result<TimetableEnvelope, ConversionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ConversionError::Empty);
    }
    serde_json::from_slice(body).map_err(|e| ConversionError::Json(e.to_string()))
}

/// Convert a decoded envelope into journey records, in upstream order.
///
/// Travels with no legs are dropped. A single unparsable date fails the
/// whole conversion.
pub fn convert_timetable(
    envelope: &TimetableEnvelope,
    query: &RouteQuery,
    stations: &[Station],
) -> Result<Vec<JourneyRecord>, ConversionError> {
    let mut records = Vec::with_capacity(envelope.result.travels.len());

    for travel in &envelope.result.travels {
        if let Some(record) = convert_travel(travel, query, stations)? {
            records.push(record);
        }
    }

    Ok(records)
}

/// Convert one travel candidate. `Ok(None)` if it has no legs.
pub fn convert_travel(
    travel: &Travel,
    query: &RouteQuery,
    stations: &[Station],
) -> Result<Option<JourneyRecord>, ConversionError> {
    let (Some(first), Some(last)) = (travel.trains.first(), travel.trains.last()) else {
        return Ok(None);
    };

    let departure_time = parse_leg_time(first, &first.departure_time)?;
    let arrival_time = parse_leg_time(last, &last.arrival_time)?;

    // Later legs' dates are required too, even though only the ends are kept.
    for leg in &travel.trains {
        parse_leg_time(leg, &leg.departure_time)?;
        parse_leg_time(leg, &leg.arrival_time)?;
    }

    let from_station_name = station_name(
        first.origin_station_name.as_deref(),
        first.origin_station.as_deref(),
        stations,
    )
    .unwrap_or_else(|| query.from.to_string());

    let to_station_name = station_name(
        last.destination_station_name.as_deref(),
        last.destination_station.as_deref(),
        stations,
    )
    .or_else(|| {
        station_name(
            first.destination_station_name.as_deref(),
            first.destination_station.as_deref(),
            stations,
        )
    })
    .unwrap_or_else(|| query.to.to_string());

    let all_train_numbers: Vec<String> = travel
        .trains
        .iter()
        .map(|leg| leg.train_number.clone())
        .collect();
    let all_platforms: Vec<String> = travel.trains.iter().map(origin_platform).collect();

    Ok(Some(JourneyRecord {
        primary_train_number: first.train_number.clone(),
        departure_time,
        arrival_time,
        origin_platform: origin_platform(first),
        from_station_name,
        to_station_name,
        change_count: travel.trains.len() - 1,
        all_train_numbers,
        all_platforms,
        source: DataSource::Live,
    }))
}

/// Decode a raw station directory payload.
///
/// Entries with a blank identifier are dropped.
pub fn normalize_stations(body: &[u8]) -> Result<Vec<Station>, ConversionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ConversionError::Empty);
    }

    let envelope: StationsEnvelope =
        serde_json::from_slice(body).map_err(|e| ConversionError::Json(e.to_string()))?;

    Ok(envelope
        .into_stations()
        .into_iter()
        .map(|dto| Station::new(StationId::new(&dto.id), dto.name.trim()))
        .filter(|s| !s.id.is_empty())
        .collect())
}

fn parse_leg_time(leg: &TrainLeg, s: &str) -> Result<DateTime<Utc>, ConversionError> {
    parse_upstream_instant(s).map_err(|source| ConversionError::InvalidTime {
        train: leg.train_number.clone(),
        source,
    })
}

/// The platform shown for a leg: always its origin platform.
fn origin_platform(leg: &TrainLeg) -> String {
    leg.origin_platform.clone().unwrap_or_default()
}

/// Resolve a display name: explicit name first, then a directory lookup.
fn station_name(explicit: Option<&str>, id: Option<&str>, stations: &[Station]) -> Option<String> {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }

    let id = StationId::new(id?);
    stations
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.name.clone())
}
