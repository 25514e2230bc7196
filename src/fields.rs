//! Typed field codecs shared by all claim containers.
//!
//! JOSE stores every header parameter and claim as a plain JSON value, but
//! the registered parameters have additional encoding rules on top of JSON:
//! byte strings travel as unpadded base64url, timestamps as NumericDate
//! numbers, locales as BCP-47 tags and so on. The [`JoseValue`] trait
//! captures those rules once so that [`ValueStorage`](crate::ValueStorage)
//! accessors and the claim containers agree on them.

use core::{fmt, str::FromStr, time::Duration};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Number, Value};

use crate::base64_url;

/// A type that can be read from and written into a JSON claim value using
/// the JOSE-specific field encodings.
///
/// Reads never fail loudly. The coercion order is: direct JSON type match,
/// then the JOSE field decoding for the target type, then give up and
/// report absence by returning [`None`].
pub trait JoseValue: Sized {
    /// Coerces a raw JSON value into this type, or reports absence.
    fn from_json(value: &Value) -> Option<Self>;

    /// Encodes this value into its JSON wire representation.
    fn into_json(self) -> Value;
}

impl JoseValue for Value {
    fn from_json(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn into_json(self) -> Value {
        self
    }
}

impl JoseValue for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn into_json(self) -> Value {
        Value::String(self)
    }
}

impl JoseValue for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_json(self) -> Value {
        Value::Bool(self)
    }
}

/// Bare numeric types have no secondary JOSE encoding, so their coercion
/// intentionally stops at the direct JSON number match; a number stored as
/// a string is absent, unlike the base64url fallback byte strings get.
impl JoseValue for i64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn into_json(self) -> Value {
        Value::Number(self.into())
    }
}

/// Direct-match only, like [`i64`].
impl JoseValue for u64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64()
    }

    fn into_json(self) -> Value {
        Value::Number(self.into())
    }
}

/// Direct-match only, like [`i64`].
impl JoseValue for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn into_json(self) -> Value {
        Number::from_f64(self).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Byte strings travel as unpadded base64url text.
impl JoseValue for Vec<u8> {
    fn from_json(value: &Value) -> Option<Self> {
        base64_url::decode(value.as_str()?).ok()
    }

    fn into_json(self) -> Value {
        Value::String(base64_url::encode(self))
    }
}

impl JoseValue for Vec<String> {
    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    }

    fn into_json(self) -> Value {
        Value::Array(self.into_iter().map(Value::String).collect())
    }
}

/// Lists of byte strings, e.g. an `x5c` certificate chain.
impl JoseValue for Vec<Vec<u8>> {
    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|v| base64_url::decode(v.as_str()?).ok())
            .collect()
    }

    fn into_json(self) -> Value {
        Value::Array(
            self.into_iter()
                .map(|b| Value::String(base64_url::encode(b)))
                .collect(),
        )
    }
}

/// UUIDs are written lowercase and hyphenated; any case is accepted on read.
impl JoseValue for uuid::Uuid {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str()?.parse().ok()
    }

    fn into_json(self) -> Value {
        // the hyphenated form is lowercase already
        Value::String(self.hyphenated().to_string())
    }
}

/// Big integers (RSA parameters) travel as base64url of the big-endian
/// minimal byte string.
impl JoseValue for rsa::BigUint {
    fn from_json(value: &Value) -> Option<Self> {
        let bytes = base64_url::decode(value.as_str()?).ok()?;
        Some(rsa::BigUint::from_bytes_be(&bytes))
    }

    fn into_json(self) -> Value {
        Value::String(base64_url::encode(self.to_bytes_be()))
    }
}

/// A timestamp in the JWT NumericDate representation: seconds since the
/// Unix epoch as a JSON number, integral or fractional (RFC 7519 §2).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct NumericDate(f64);

impl NumericDate {
    /// Builds a date from whole seconds since the Unix epoch.
    pub fn from_secs(secs: i64) -> Self {
        NumericDate(secs as f64)
    }

    /// Builds a date from possibly fractional seconds since the Unix epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        NumericDate(secs)
    }

    /// The current time.
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => NumericDate(elapsed.as_secs_f64()),
            // pre-epoch clocks produce a negative date instead of panicking
            Err(e) => NumericDate(-e.duration().as_secs_f64()),
        }
    }

    /// Whole seconds since the Unix epoch, truncating any fraction.
    pub fn as_secs(&self) -> i64 {
        self.0 as i64
    }

    /// Seconds since the Unix epoch, including the fraction.
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }
}

impl From<SystemTime> for NumericDate {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => NumericDate(elapsed.as_secs_f64()),
            Err(e) => NumericDate(-e.duration().as_secs_f64()),
        }
    }
}

impl From<NumericDate> for SystemTime {
    fn from(date: NumericDate) -> Self {
        if date.0 >= 0.0 {
            UNIX_EPOCH + Duration::from_secs_f64(date.0)
        } else {
            UNIX_EPOCH - Duration::from_secs_f64(-date.0)
        }
    }
}

impl fmt::Display for NumericDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self).into_json().fmt(f)
    }
}

impl JoseValue for NumericDate {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(NumericDate)
    }

    fn into_json(self) -> Value {
        // integral dates stay JSON integers
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            Value::Number((self.0 as i64).into())
        } else {
            Number::from_f64(self.0).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

/// A BCP-47 language tag in its hyphenated form.
///
/// Underscore forms (`en_US`) are folded into the hyphenated wire form
/// (`en-US`) on construction. Matching against stored locale suffixes is
/// ASCII case-insensitive, as required by BCP 47.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Builds a tag, normalizing underscores to hyphens.
    pub fn new(tag: impl Into<String>) -> Self {
        LanguageTag(tag.into().replace('_', "-"))
    }

    /// The hyphenated tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`en` out of `en-US`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Case-insensitive comparison against another tag string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(&other.replace('_', "-"))
    }
}

impl FromStr for LanguageTag {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LanguageTag::new(s))
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl JoseValue for LanguageTag {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(LanguageTag::new)
    }

    fn into_json(self) -> Value {
        Value::String(self.0)
    }
}

/// An IANA time zone identifier, e.g. `Europe/Berlin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeZoneId(String);

impl TimeZoneId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        TimeZoneId(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl JoseValue for TimeZoneId {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(TimeZoneId::new)
    }

    fn into_json(self) -> Value {
        Value::String(self.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bytes_round_trip_through_base64url() {
        let raw = vec![0xde, 0xad, 0xbe, 0xef];
        let encoded = raw.clone().into_json();
        assert_eq!(encoded, json!("3q2-7w"));
        assert_eq!(Vec::<u8>::from_json(&encoded), Some(raw));
    }

    #[test]
    fn bytes_reject_non_base64url() {
        assert_eq!(Vec::<u8>::from_json(&json!("not!base64")), None);
        assert_eq!(Vec::<u8>::from_json(&json!(42)), None);
    }

    #[test]
    fn numeric_date_integral_stays_integer() {
        let date = NumericDate::from_secs(1_562_262_618);
        assert_eq!(date.into_json(), json!(1_562_262_618));
    }

    #[test]
    fn numeric_date_fraction_survives() {
        let date = NumericDate::from_json(&json!(10.5)).unwrap();
        assert_eq!(date.as_secs_f64(), 10.5);
        assert_eq!(date.as_secs(), 10);
    }

    #[test]
    fn language_tag_normalizes_underscores() {
        let tag = LanguageTag::new("en_US");
        assert_eq!(tag.as_str(), "en-US");
        assert_eq!(tag.primary(), "en");
        assert!(tag.matches("EN-us"));
    }

    #[test]
    fn uuid_written_lowercase() {
        let id: uuid::Uuid = "936DA01F-9ABD-4D9D-80C7-02AF85C822A8".parse().unwrap();
        assert_eq!(
            id.into_json(),
            json!("936da01f-9abd-4d9d-80c7-02af85c822a8")
        );
    }
}
