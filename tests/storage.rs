//! Universal invariants of the claim store and its typed accessors.

use jose_dpop::{Base64UrlString, LanguageTag, NumericDate, TimeZoneId, ValueStorage};
use serde_json::{json, Value};

fn round_trip<T>(value: T) -> Option<T>
where
    T: jose_dpop::fields::JoseValue + Clone,
{
    let mut storage = ValueStorage::new();
    storage.typed_set("claim", Some(value));
    storage.typed_get("claim")
}

/// `typed_get` after `typed_set` returns the original value for every
/// JOSE-encodable type.
#[test]
fn typed_accessors_round_trip() {
    assert_eq!(round_trip("text".to_owned()), Some("text".to_owned()));
    assert_eq!(round_trip(42i64), Some(42i64));
    assert_eq!(round_trip(true), Some(true));
    assert_eq!(round_trip(vec![1u8, 2, 3]), Some(vec![1u8, 2, 3]));
    assert_eq!(
        round_trip(vec![vec![1u8, 2], vec![3u8]]),
        Some(vec![vec![1u8, 2], vec![3u8]])
    );
    assert_eq!(
        round_trip(NumericDate::from_secs(1_562_262_618)),
        Some(NumericDate::from_secs(1_562_262_618))
    );
    assert_eq!(
        round_trip(LanguageTag::new("de-AT")),
        Some(LanguageTag::new("de-AT"))
    );
    assert_eq!(
        round_trip(TimeZoneId::new("Europe/Vienna")),
        Some(TimeZoneId::new("Europe/Vienna"))
    );

    let uuid: uuid::Uuid = "936da01f-9abd-4d9d-80c7-02af85c822a8".parse().unwrap();
    assert_eq!(round_trip(uuid), Some(uuid));
}

/// Decoding an encoded storage yields an equal storage, modulo key order.
#[test]
fn encode_decode_round_trip() {
    let mut storage = ValueStorage::new();
    storage.set("iss", json!("https://issuer.example"));
    storage.set("count", json!(3));
    storage.set("nested", json!({ "a": [1, 2], "b": null }));

    let encoded = storage.encode().unwrap();
    let decoded = ValueStorage::decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, storage);

    // the base64url wire form decodes to the same storage
    let b64 = jose_dpop::base64_url::encode(&encoded);
    assert_eq!(ValueStorage::decode(b64.as_bytes()).unwrap(), storage);
}

/// Coercion failures report absence instead of erroring.
#[test]
fn failed_coercion_is_absence() {
    let mut storage = ValueStorage::new();
    storage.set("claim", json!("not a number"));

    assert_eq!(storage.typed_get::<i64>("claim"), None);
    assert_eq!(storage.typed_get::<Vec<String>>("claim"), None);
    assert_eq!(storage.typed_get::<NumericDate>("claim"), None);
    // but the raw value is still there
    assert!(storage.contains("claim"));
}

/// Null is a present value; absence is not.
#[test]
fn null_and_absence_are_distinct() {
    let mut storage = ValueStorage::new();
    storage.set("soft-deleted", Value::Null);

    assert_eq!(storage.get("soft-deleted"), Some(&Value::Null));
    assert!(storage.contains("soft-deleted"));
    assert_eq!(storage.get("missing"), None);
    assert!(!storage.contains("missing"));
}

/// Writing an empty list or an absence removes the key.
#[test]
fn removal_semantics() {
    let mut storage = ValueStorage::new();

    storage.set("aud", json!(["a", "b"]));
    storage.set("aud", json!([]));
    assert!(!storage.contains("aud"));

    storage.typed_set("jti", Some("id".to_owned()));
    storage.typed_set::<String>("jti", None);
    assert!(!storage.contains("jti"));

    storage.typed_set("chain", Some(Vec::<Vec<u8>>::new()));
    assert!(!storage.contains("chain"));
}

/// Equality is canonical: integer and float encodings of the same number
/// compare equal, at any nesting depth.
#[test]
fn canonical_equality() {
    let a: ValueStorage = r#"{"iat": 1562262618, "nested": {"n": 1}}"#.parse().unwrap();
    let b: ValueStorage = r#"{"iat": 1562262618.0, "nested": {"n": 1.0}}"#.parse().unwrap();
    let c: ValueStorage = r#"{"iat": 1562262619, "nested": {"n": 1}}"#.parse().unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

/// Base64url text survives storage round trips unchanged.
#[test]
fn base64url_string_round_trip() {
    let segment: Base64UrlString = "eyJhbGciOiJFUzI1NiJ9".parse().unwrap();
    let decoded = segment.decode();
    assert_eq!(Base64UrlString::encode(decoded).as_str(), segment.as_str());
}
