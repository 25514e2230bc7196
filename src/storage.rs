//! The schema-flexible claim store underneath every JOSE container.
//!
//! JOSE headers, JWT claim sets and JWKs are all open-ended JSON objects:
//! a fixed set of registered parameters with well-known encodings, plus
//! arbitrary application-defined members. [`ValueStorage`] keeps the raw
//! JSON values and layers the typed, JOSE-aware accessors from
//! [`fields`](crate::fields) on top.

use core::{fmt, str::FromStr};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{base64_url, fields::JoseValue, Error, LanguageTag};

/// Locale preference consulted by localized reads, process-wide.
static PREFERRED_LOCALES: RwLock<Vec<LanguageTag>> = RwLock::new(Vec::new());

/// Serializes tests that touch the process-wide locale preference.
#[cfg(test)]
pub(crate) static LOCALE_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Replaces the process-wide locale preference used by localized claim
/// reads, most preferred first.
pub fn set_preferred_locales(locales: Vec<LanguageTag>) {
    let mut slot = PREFERRED_LOCALES
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = locales;
}

/// The current process-wide locale preference.
pub fn preferred_locales() -> Vec<LanguageTag> {
    PREFERRED_LOCALES
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// An open mapping from claim name to raw JSON value.
///
/// Two storages are equal when their canonical JSON forms are equal; in
/// particular, numerically equal values with different encodings (`1`
/// versus `1.0`) compare equal.
///
/// Presence and JSON null are distinct: a stored null is a value,
/// [`get`](Self::get) only returns [`None`] for keys that are absent.
#[derive(Debug, Clone, Default)]
pub struct ValueStorage {
    map: Map<String, Value>,
}

impl ValueStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        ValueStorage { map: Map::new() }
    }

    /// The raw value at `key`, which may itself be JSON null.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Stores a raw value. Storing an empty list removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let key = key.into();
        if matches!(&value, Value::Array(items) if items.is_empty()) {
            self.map.remove(&key);
            return;
        }
        self.map.insert(key, value);
    }

    /// Removes `key`, returning the previous value if any.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Whether `key` holds a value (including null).
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the storage holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Reads the value at `key` coerced into `T`.
    ///
    /// Coercion never fails loudly; a value that cannot be read as `T`
    /// reports absence.
    pub fn typed_get<T: JoseValue>(&self, key: &str) -> Option<T> {
        T::from_json(self.map.get(key)?)
    }

    /// Writes `value` under `key` using the JOSE field encoding for `T`.
    ///
    /// Writing [`None`] removes the key, as does writing a value whose
    /// encoding is an empty list.
    pub fn typed_set<T: JoseValue>(&mut self, key: impl Into<String>, value: Option<T>) {
        let key = key.into();
        match value {
            Some(v) => self.set(key, v.into_json()),
            None => {
                self.map.remove(&key);
            }
        }
    }

    /// Reads the value for `key`, preferring localized variants.
    ///
    /// Storages may carry claims of the form `name#lang-TAG`. This scans
    /// the process-wide locale preference in order, first for an exact
    /// (case-insensitive) tag match, then for a primary-subtag match, and
    /// finally falls back to the bare key.
    pub fn get_localized(&self, key: &str) -> Option<&Value> {
        let prefix_len = key.len() + 1;
        let localized: Vec<(&str, &Value)> = self
            .map
            .iter()
            .filter(|(k, _)| k.len() > prefix_len && k.starts_with(key) && k.as_bytes()[key.len()] == b'#')
            .map(|(k, v)| (&k[prefix_len..], v))
            .collect();

        if !localized.is_empty() {
            for preferred in preferred_locales() {
                if let Some((_, value)) = localized.iter().copied().find(|(tag, _)| preferred.matches(tag)) {
                    return Some(value);
                }
                if let Some((_, value)) = localized.iter().copied().find(|(tag, _)| {
                    LanguageTag::new(*tag)
                        .primary()
                        .eq_ignore_ascii_case(preferred.primary())
                }) {
                    return Some(value);
                }
            }
        }

        self.map.get(key)
    }

    /// Typed variant of [`get_localized`](Self::get_localized).
    pub fn typed_get_localized<T: JoseValue>(&self, key: &str) -> Option<T> {
        T::from_json(self.get_localized(key)?)
    }

    /// Key-wise merge of `other` into `self`. Keys present on both sides
    /// are resolved by `combine`, which receives the key and both raw
    /// values (self first).
    pub fn merge(
        &mut self,
        other: ValueStorage,
        mut combine: impl FnMut(&str, Value, Value) -> Value,
    ) {
        for (key, theirs) in other.map {
            match self.map.remove(&key) {
                Some(ours) => {
                    let merged = combine(&key, ours, theirs);
                    self.map.insert(key, merged);
                }
                None => {
                    self.map.insert(key, theirs);
                }
            }
        }
    }

    /// Retains only the entries satisfying `predicate`.
    pub fn filter(&mut self, mut predicate: impl FnMut(&str, &Value) -> bool) {
        self.map.retain(|k, v| predicate(k, v));
    }

    /// Borrows the underlying JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.map
    }

    /// Consumes the storage into its underlying JSON object.
    pub fn into_object(self) -> Map<String, Value> {
        self.map
    }

    /// Decodes storage from raw bytes that hold either a JSON object or a
    /// base64url-encoded JSON object. The two wire forms are accepted
    /// indistinguishably.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if neither form parses.
    pub fn decode(input: &[u8]) -> Result<Self, Error> {
        if let Ok(map) = serde_json::from_slice::<Map<String, Value>>(input) {
            return Ok(ValueStorage { map });
        }

        let text = core::str::from_utf8(input)
            .map_err(|_| Error::malformed("input is neither JSON nor base64url"))?;
        let decoded = base64_url::decode(text.trim())?;
        let map = serde_json::from_slice::<Map<String, Value>>(&decoded)
            .map_err(Error::malformed)?;
        Ok(ValueStorage { map })
    }

    /// Encodes the storage as compact JSON object text.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if serialization fails, which requires a
    /// non-JSON-representable value to have been stored.
    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(&self.map).map_err(Error::malformed)
    }
}

impl FromStr for ValueStorage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueStorage::decode(s.as_bytes())
    }
}

impl fmt::Display for ValueStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Value::Object(self.map.clone()).fmt(f)
    }
}

impl From<Map<String, Value>> for ValueStorage {
    fn from(map: Map<String, Value>) -> Self {
        ValueStorage { map }
    }
}

impl From<ValueStorage> for Map<String, Value> {
    fn from(storage: ValueStorage) -> Self {
        storage.map
    }
}

impl FromIterator<(String, Value)> for ValueStorage {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        ValueStorage {
            map: iter.into_iter().collect(),
        }
    }
}

impl PartialEq for ValueStorage {
    fn eq(&self, other: &Self) -> bool {
        canonical_object_eq(&self.map, &other.map)
    }
}

impl Serialize for ValueStorage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValueStorage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(ValueStorage {
            map: Map::deserialize(deserializer)?,
        })
    }
}

fn canonical_object_eq(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, va)| b.get(k).is_some_and(|vb| canonical_value_eq(va, vb)))
}

/// Equality after decoding to canonical form: numbers compare numerically
/// regardless of their integer or float encoding.
fn canonical_value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(i), Some(j)) => i == j,
                _ => matches!((x.as_f64(), y.as_f64()), (Some(i), Some(j)) if i == j),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(va, vb)| canonical_value_eq(va, vb))
        }
        (Value::Object(x), Value::Object(y)) => canonical_object_eq(x, y),
        _ => a == b,
    }
}
