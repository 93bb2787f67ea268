/// Flight track parsing and aggregation
use crate::domain::TrackPoint;
use crate::utils::{haversine_km, strip_quotes};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const TIMESTAMP_COLUMN: &str = "Timestamp";
const POSITION_COLUMN: &str = "Position";
const CALLSIGN_COLUMN: &str = "Callsign";

/// Structural problems with the track CSV
#[derive(Debug, Error, PartialEq)]
pub enum TrackError {
    #[error("flight track CSV must contain the columns {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Ordered track plus the first callsign seen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrack {
    pub track: Vec<TrackPoint>,
    pub callsign: Option<String>,
}

/// Aggregate metrics of a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub distance_km: f64,
    pub flight_hours: f64,
}

/// Parse a flight track export (one header line, then one fix per line).
///
/// Missing `Timestamp`/`Position` headers fail the whole parse. Bad rows are
/// dropped and parsing carries on.
pub fn parse_flight_track(csv: &str) -> Result<ParsedTrack, TrackError> {
    let lines: Vec<&str> = csv.trim().lines().collect();
    if lines.len() < 2 {
        return Ok(ParsedTrack::default());
    }

    let header: Vec<&str> = lines[0].split(',').map(str::trim).collect();
    let column = |name: &str| header.iter().position(|h| *h == name);
    let timestamp_idx = column(TIMESTAMP_COLUMN);
    let position_idx = column(POSITION_COLUMN);
    let callsign_idx = column(CALLSIGN_COLUMN);

    let (timestamp_idx, position_idx) = match (timestamp_idx, position_idx) {
        (Some(t), Some(p)) => (t, p),
        _ => {
            let missing = [
                (TIMESTAMP_COLUMN, timestamp_idx),
                (POSITION_COLUMN, position_idx),
            ]
            .into_iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
            return Err(TrackError::MissingColumns(missing));
        }
    };
    let required_len = timestamp_idx.max(position_idx) + 1;

    let mut parsed = ParsedTrack::default();
    for (line_no, raw) in lines.iter().enumerate().skip(1) {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let values = split_row(line);
        if values.len() < required_len {
            debug!(line = line_no + 1, "skipping short track row");
            continue;
        }

        let Some(point) = parse_point(&values[timestamp_idx], &values[position_idx]) else {
            debug!(line = line_no + 1, "skipping unparsable track row");
            continue;
        };
        parsed.track.push(point);

        if parsed.callsign.is_none() {
            if let Some(cell) = callsign_idx.and_then(|idx| values.get(idx)) {
                let callsign = strip_quotes(cell).trim().to_string();
                if !callsign.is_empty() {
                    parsed.callsign = Some(callsign);
                }
            }
        }
    }

    Ok(parsed)
}

/// Quote-aware comma split. Quotes toggle state and are not kept.
fn split_row(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    values.push(current.trim().to_string());
    values
}

fn parse_point(timestamp: &str, position: &str) -> Option<TrackPoint> {
    let timestamp_seconds = timestamp.parse::<i64>().ok()?;

    let position = strip_quotes(position);
    let mut parts = position.split(',');
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat.trim(), lon.trim()),
        _ => return None,
    };
    let lat = lat.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lon = lon.parse::<f64>().ok().filter(|v| v.is_finite())?;

    Some(TrackPoint {
        lat,
        lon,
        timestamp_seconds,
    })
}

/// Sum of leg distances in track order and elapsed hours first to last.
///
/// Out-of-order timestamps yield negative hours; callers decide what to do.
pub fn analyze_track(track: &[TrackPoint]) -> TrackSummary {
    let [first, .., last] = track else {
        return TrackSummary::default();
    };

    let distance_km = track
        .windows(2)
        .map(|pair| haversine_km(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
        .sum();
    // i128 so that any pair of i64 epochs has a representable delta
    let elapsed = i128::from(last.timestamp_seconds) - i128::from(first.timestamp_seconds);
    let flight_hours = elapsed as f64 / 3600.0;

    TrackSummary {
        distance_km,
        flight_hours,
    }
}
