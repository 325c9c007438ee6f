//! Field normalization
//!
//! Maps one [`RawRecord`] onto the fixed staging schema. Normalization is
//! pure and total: every record yields a [`NormalizedRow`], and problems that
//! only affect part of the row come back as [`FieldWarning`]s.

use thiserror::Error;

use crate::record::{LocationField, RawRecord, DATETIME_KEY, DESCRIPTION_KEYS, NAME_KEY, TYPE_KEY};

/// One row of the staging table
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub event_id: String,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub location_name: String,
    pub location_raw: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Unparsed; the transformation layer owns timestamp parsing
    pub event_datetime: String,
    pub raw_payload: String,
}

impl NormalizedRow {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Non-fatal problem found while normalizing a record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWarning {
    /// The `gps` string was present but unusable; both coordinates dropped
    Coordinates {
        event_id: String,
        raw: String,
        reason: CoordinateError,
    },
}

impl std::fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldWarning::Coordinates {
                event_id,
                raw,
                reason,
            } => write!(f, "event '{event_id}': discarded coordinates {raw:?}: {reason}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("expected exactly one comma, found {0}")]
    WrongSeparatorCount(usize),

    #[error("{0:?} is not a finite number")]
    InvalidNumber(String),
}

/// A normalized row plus whatever warnings it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub row: NormalizedRow,
    pub warnings: Vec<FieldWarning>,
}

/// Normalize a single record
pub fn normalize(raw: &RawRecord) -> Normalized {
    let event_id = raw.id();
    let mut warnings = Vec::new();

    let (location_name, location_raw, coordinates) = match raw.location() {
        LocationField::Absent => (String::new(), String::new(), None),
        LocationField::Plain(place) => (place.clone(), place, None),
        LocationField::Structured { name, gps, raw: object } => {
            let coordinates = gps.and_then(|gps| match parse_coordinates(&gps) {
                Ok(pair) => Some(pair),
                Err(reason) => {
                    warnings.push(FieldWarning::Coordinates {
                        event_id: event_id.clone(),
                        raw: gps,
                        reason,
                    });
                    None
                },
            });
            (name.unwrap_or_default(), object.to_string(), coordinates)
        },
    };

    let (latitude, longitude) = match coordinates {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };

    let row = NormalizedRow {
        name: raw.text(NAME_KEY),
        description: raw.text_any(DESCRIPTION_KEYS),
        event_type: raw.text(TYPE_KEY),
        location_name,
        location_raw,
        latitude,
        longitude,
        event_datetime: raw.text(DATETIME_KEY),
        raw_payload: raw.to_payload(),
        event_id,
    };

    Normalized { row, warnings }
}

/// Parse a combined `"lat, lon"` string
///
/// Exactly one comma; both halves are trimmed and must be finite floats.
pub fn parse_coordinates(gps: &str) -> Result<(f64, f64), CoordinateError> {
    let commas = gps.matches(',').count();
    if commas != 1 {
        return Err(CoordinateError::WrongSeparatorCount(commas));
    }

    let (lat, lon) = gps
        .split_once(',')
        .ok_or(CoordinateError::WrongSeparatorCount(0))?;

    Ok((parse_component(lat)?, parse_component(lon)?))
}

fn parse_component(part: &str) -> Result<f64, CoordinateError> {
    let trimmed = part.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoordinateError::InvalidNumber(trimmed.to_string()))
}
