//! Canonical JSON text used for content fingerprints.
//!
//! The output matches Python's `json.dumps(value, sort_keys=True)` byte for
//! byte, so fingerprints line up with responses captured by earlier
//! deployments of the service:
//!
//! - object keys sorted recursively
//! - `", "` between items and `": "` between key and value
//! - every character outside printable ASCII escaped as `\uXXXX`
//! - floats in Python `repr` form (`1e+16`, `1.5e-05`, `2.0`)
//! - integers verbatim at any size, with `-0` written as `0`
//!
//! Numbers arrive as their original JSON tokens (`arbitrary_precision`), so
//! floats are rounded exactly once, by `str::parse::<f64>`.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Serializes `value` into its canonical byte form.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let sorted = sort_keys(&serde_json::to_value(value)?);
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, CanonicalFormatter);
    sorted.serialize(&mut ser)?;
    Ok(out)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Rebuilds every object with its keys inserted in sorted order, which holds
/// whether or not `serde_json` preserves insertion order.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
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

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    // Quotes, backslashes and control characters never reach this method;
    // serde_json escapes those itself with the same forms Python uses.
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(python_float_repr(value).as_bytes())
    }

    fn write_number_str<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        value: &str,
    ) -> io::Result<()> {
        writer.write_all(python_number_text(value).as_bytes())
    }
}

/// Renders a JSON number token the way Python prints the value it loads:
/// integer tokens stay integers, anything with a fraction or exponent is a float.
fn python_number_text(token: &str) -> String {
    let is_integer = !token.contains(|c| matches!(c, '.' | 'e' | 'E'));
    if is_integer {
        return match token {
            "-0" => "0".to_string(),
            other => other.to_string(),
        };
    }
    match token.parse::<f64>() {
        Ok(value) => python_float_repr(value),
        Err(_) => token.to_string(),
    }
}

/// Formats a finite float the way Python's `repr` does: shortest round-trip
/// digits, positional notation for exponents in `-4..16`, scientific otherwise.
fn python_float_repr(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `-1.2345e-7`.
    let sci = format!("{:e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                let zeros = "0".repeat(int_len - digits.len());
                format!("{sign}{digits}{zeros}.0")
            } else {
                format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
            }
        } else {
            let zeros = "0".repeat((-exp - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        }
    } else {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let (head, tail) = digits.split_at(1);
        let mantissa = if tail.is_empty() {
            head.to_string()
        } else {
            format!("{head}.{tail}")
        };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
    }
}
