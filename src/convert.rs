//! Field converters between the textual CIDDS columns and typed values.
//!
//! Every function here is pure. Numeric converters try the plain form first
//! and fall back to the irregular encodings found in the dataset; when no form
//! applies they return [`Error::MalformedField`] carrying the raw text.

use crate::error::{Error, Result};
use crate::record::TcpFlags;
use chrono::NaiveDateTime;

/// Timestamp layout used when writing.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Marker the dataset uses for an absent attack attribute.
pub const ABSENT: &str = "---";

const BYTES_MULTIPLIER: f64 = 1e6;
const PORT_MULTIPLIER: f64 = 10.0;

/// Decode a flag string positionally. Short strings leave the missing
/// positions inactive.
#[must_use]
pub fn parse_flags(text: &str) -> TcpFlags {
    let mut flags = [false; 6];
    for (slot, (ch, letter)) in flags
        .iter_mut()
        .zip(text.chars().zip(TcpFlags::LETTERS))
    {
        *slot = ch == letter;
    }
    TcpFlags(flags)
}

/// Encode flags as the 6-character form, `.` for inactive positions.
#[must_use]
pub fn render_flags(flags: TcpFlags) -> String {
    flags
        .0
        .iter()
        .zip(TcpFlags::LETTERS)
        .map(|(&on, letter)| if on { letter } else { TcpFlags::PLACEHOLDER })
        .collect()
}

/// Parse a byte counter. Plain integers are taken as-is; otherwise the value
/// must look like `"<number> M"` and is scaled by one million, truncated.
pub fn parse_byte_count(text: &str) -> Result<u64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<u64>() {
        return Ok(v);
    }
    let mut parts = text.split_whitespace();
    let number = parts
        .next()
        .and_then(|n| n.parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| Error::field("bytes", text))?;
    match (parts.next(), parts.next()) {
        (None | Some("M"), None) => {}
        _ => return Err(Error::field("bytes", text)),
    }
    let scaled = (number * BYTES_MULTIPLIER).trunc();
    if scaled > u64::MAX as f64 {
        return Err(Error::field("bytes", text));
    }
    Ok(scaled as u64)
}

/// Parse a destination port. ICMP records carry the port as a float scaled
/// down by ten, so non-integer text is multiplied back and rounded.
pub fn parse_destination_port(text: &str) -> Result<u16> {
    let text = text.trim();
    if let Ok(v) = text.parse::<u16>() {
        return Ok(v);
    }
    let scaled = text
        .parse::<f64>()
        .ok()
        .map(|v| (v * PORT_MULTIPLIER).round())
        .filter(|v| (0.0..=f64::from(u16::MAX)).contains(v))
        .ok_or_else(|| Error::field("destination port", text))?;
    Ok(scaled as u16)
}

/// Parse a first-seen timestamp with optional fractional seconds.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| Error::field("timestamp", text))
}

#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Attack attributes: empty text and `---` both mean absent.
#[must_use]
pub fn parse_optional(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty() && text != ABSENT).then(|| text.to_string())
}

#[must_use]
pub fn render_optional(value: Option<&str>) -> &str {
    value.unwrap_or(ABSENT)
}
