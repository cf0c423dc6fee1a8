//! # Canonical Encoding
//!
//! Deterministic bytes for signing and verification.
//!
//! The canonical form is JSON with every object's keys sorted
//! lexicographically (recursively), over every field of the message except
//! `signature`. It is rendered byte-for-byte the way the field publishers
//! render `json.dumps(message, sort_keys=True)`:
//!
//! - `", "` between items and `": "` after keys
//! - non-ASCII text escaped as `\uXXXX` (UTF-16 units, lowercase hex)
//! - floats as their shortest round-trip repr: `50.0`, `0.0001`, `1e-05`, `1e+16`
//!
//! Readings are `f64`, so an integral reading always renders as `45.0`.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value};
use shared_types::{EncodingError, TelemetryMessage, RESERVED_FIELDS};
use std::io;

/// Canonical bytes of `message` with its signature stripped.
///
/// # Errors
///
/// - `EncodingError::NonFiniteReading` for NaN or infinite readings
/// - `EncodingError::ReservedField` if an extra field reuses a reserved name
pub fn canonical_bytes(message: &TelemetryMessage) -> Result<Vec<u8>, EncodingError> {
    let value = canonical_value(message)?;
    let mut out = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PublisherFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| EncodingError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Canonical form as a string (for diagnostics and tests).
pub fn canonical_string(message: &TelemetryMessage) -> Result<String, EncodingError> {
    let bytes = canonical_bytes(message)?;
    String::from_utf8(bytes).map_err(|e| EncodingError::Serialization(e.to_string()))
}

fn canonical_value(message: &TelemetryMessage) -> Result<Value, EncodingError> {
    let mut fields: Vec<(String, Value)> = Vec::with_capacity(4 + message.extra.len());

    fields.push(("device_id".into(), Value::from(message.device_id.as_str())));
    fields.push(("timestamp".into(), Value::from(message.timestamp.as_str())));
    fields.push(("sequence".into(), Value::from(message.sequence)));

    let mut readings = Vec::with_capacity(message.readings.len());
    for (channel, value) in &message.readings {
        let number = Number::from_f64(*value).ok_or_else(|| EncodingError::NonFiniteReading {
            channel: channel.clone(),
        })?;
        readings.push((channel.clone(), Value::Number(number)));
    }
    fields.push(("readings".into(), sorted_object(readings)));

    for (name, value) in &message.extra {
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(EncodingError::ReservedField {
                field: name.clone(),
            });
        }
        fields.push((name.clone(), sort_keys(value.clone())));
    }

    Ok(sorted_object(fields))
}

/// Rebuild nested objects in sorted key order.
///
/// Does not rely on serde_json's map type: with `preserve_order` enabled
/// anywhere in the build, `Map` keeps insertion order instead of sorting.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => sorted_object(map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn sorted_object(mut entries: Vec<(String, Value)>) -> Value {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut map = Map::new();
    for (k, v) in entries {
        map.insert(k, v);
    }
    Value::Object(map)
}

/// JSON layout of the device publishers.
struct PublisherFormatter;

impl Formatter for PublisherFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f64<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        value: f64,
    ) -> io::Result<()> {
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        // Control characters, quotes and backslashes never reach here.
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() && c != '\x7f' {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Shortest round-trip rendering of a float, positional for decimal
/// exponents in `-5..16` and scientific outside it.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. `-1.25e-7`.
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if !(-5 < exponent && exponent < 16) {
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{lead}{fraction}e{exp_sign}{:02}", exponent.unsigned_abs());
    }

    if exponent < 0 {
        let zeros = "0".repeat(exponent.unsigned_abs() as usize - 1);
        return format!("{sign}0.{zeros}{digits}");
    }
    let int_len = exponent as usize + 1;
    if digits.len() > int_len {
        let (int_part, frac_part) = digits.split_at(int_len);
        format!("{sign}{int_part}.{frac_part}")
    } else {
        let zeros = "0".repeat(int_len - digits.len());
        format!("{sign}{digits}{zeros}.0")
    }
}
