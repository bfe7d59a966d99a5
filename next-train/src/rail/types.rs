//! Timetable API response DTOs.
//!
//! These types map directly to the upstream JSON. They use `Option` and
//! `#[serde(default)]` liberally because the API omits fields rather than
//! sending nulls, and they accept both the numeric and the string encodings
//! the API uses for train numbers, platforms and station identifiers. Field
//! names that have drifted between API versions are listed as aliases here
//! and nowhere else.

use serde::{Deserialize, Deserializer};

/// Response from the timetable search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEnvelope {
    pub result: TimetableResult,
}

/// The `result` object of a timetable response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResult {
    /// Candidate journeys, in upstream order.
    #[serde(default)]
    pub travels: Vec<Travel>,
}

/// One door-to-door option: a sequence of train legs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Travel {
    /// Legs in travel order. Empty travels are dropped by the normalizer.
    #[serde(default)]
    pub trains: Vec<TrainLeg>,
}

/// A single train segment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainLeg {
    /// Train number. Sent as a JSON number or string.
    #[serde(deserialize_with = "string_or_number")]
    pub train_number: String,

    /// Departure from the origin station (see `parse_upstream_instant`).
    pub departure_time: String,

    /// Arrival at the destination station.
    pub arrival_time: String,

    /// Platform at the origin station.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub origin_platform: Option<String>,

    /// Platform at the destination station.
    #[serde(
        default,
        alias = "destinationPlatform",
        deserialize_with = "opt_string_or_number"
    )]
    pub dest_platform: Option<String>,

    /// Origin station identifier. Upstream has spelled this `orignStation`.
    #[serde(
        default,
        alias = "orignStation",
        alias = "originStationId",
        deserialize_with = "opt_string_or_number"
    )]
    pub origin_station: Option<String>,

    /// Destination station identifier.
    #[serde(
        default,
        alias = "destinationStationId",
        deserialize_with = "opt_string_or_number"
    )]
    pub destination_station: Option<String>,

    /// Origin station display name, when the API includes it.
    #[serde(default)]
    pub origin_station_name: Option<String>,

    /// Destination station display name, when the API includes it.
    #[serde(default)]
    pub destination_station_name: Option<String>,
}

/// Response from the station directory endpoint.
///
/// Some deployments wrap the list in a `result` object, others return the
/// bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StationsEnvelope {
    Wrapped { result: Vec<StationDto> },
    Bare(Vec<StationDto>),
}

impl StationsEnvelope {
    pub fn into_stations(self) -> Vec<StationDto> {
        match self {
            StationsEnvelope::Wrapped { result } => result,
            StationsEnvelope::Bare(stations) => stations,
        }
    }
}

/// A station directory entry.
///
/// The identifier has been published as `stationId` and as `id` by
/// different API versions.
#[derive(Debug, Clone, Deserialize)]
pub struct StationDto {
    #[serde(
        rename = "stationId",
        alias = "id",
        alias = "stationID",
        deserialize_with = "string_or_number"
    )]
    pub id: String,

    #[serde(rename = "stationName", alias = "name")]
    pub name: String,
}

/// A JSON scalar that may be a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s.trim().to_string(),
        }
    }
}

/// Deserialize a number or string field as a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

/// Like [`string_or_number`], tolerating `null`.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}
