//! Payload Codec
//!
//! Sensor nodes send one reading per datagram as ASCII text:
//!
//! ```text
//! "<temperature*10>,<humidity*10>"      e.g. "235,601" → 23.5 °C, 60.1 %
//! ```
//!
//! The payload carries no node identifier; identity comes from the
//! transport-layer source address (see `ingest`). Decoding is pure and
//! performs no range checks: any integer that fits in an `i64` is accepted.

use crate::error::DecodeError;

/// Number of fields in a well-formed payload
const FIELD_COUNT: usize = 2;

/// Wire values are tenths of the physical unit
const SCALE: f64 = 10.0;

/// One decoded sensor reading in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Reading {
    /// Build a reading from wire-level tenths
    pub fn from_tenths(temperature: i64, humidity: i64) -> Self {
        Self {
            temperature: temperature as f64 / SCALE,
            humidity: humidity as f64 / SCALE,
        }
    }
}

/// Decode a raw datagram body into a reading
///
/// Surrounding whitespace (a trailing newline from a serial console, for
/// example) is ignored, as is whitespace around each field.
pub fn decode(raw: &[u8]) -> Result<Reading, DecodeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| DecodeError::Malformed(format!("payload is not text: {}", e)))?
        .trim();

    if text.is_empty() {
        return Err(DecodeError::Malformed("empty payload".to_string()));
    }

    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(DecodeError::Malformed(format!(
            "expected {} comma-separated fields, got {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let temperature = parse_tenths(fields[0], "temperature")?;
    let humidity = parse_tenths(fields[1], "humidity")?;

    Ok(Reading::from_tenths(temperature, humidity))
}

/// Encode a reading the way sensor firmware formats it
///
/// Values are rounded to the nearest tenth.
pub fn encode(reading: &Reading) -> String {
    format!(
        "{},{}",
        (reading.temperature * SCALE).round() as i64,
        (reading.humidity * SCALE).round() as i64
    )
}

fn parse_tenths(field: &str, name: &str) -> Result<i64, DecodeError> {
    let token = field.trim();
    token.parse::<i64>().map_err(|e| {
        DecodeError::Malformed(format!("{} field {:?} is not an integer: {}", name, token, e))
    })
}
