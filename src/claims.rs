//! Claim containers: typed views over a [`ValueStorage`].
//!
//! Each container declares a static table of its registered parameters
//! mapping field names to wire keys. Reads go through the table (honoring
//! the localizable flag), writes encode per the JOSE field rules and always
//! target the bare wire key.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{fields::JoseValue, Error, NumericDate, ValueStorage};

/// One entry of a registered-parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// The field identifier on the container.
    pub name: &'static str,
    /// The wire key the field is stored under.
    pub key: &'static str,
    /// Whether reads consult `key#<locale>` variants against the
    /// process-wide locale preference.
    pub localizable: bool,
}

impl Parameter {
    /// A plain, non-localizable parameter.
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Parameter {
            name,
            key,
            localizable: false,
        }
    }

    /// A parameter whose reads honor localized key variants.
    pub const fn localizable(name: &'static str, key: &'static str) -> Self {
        Parameter {
            name,
            key,
            localizable: true,
        }
    }
}

/// Reads a parameter from storage, honoring its localizable flag.
pub(crate) fn read<T: JoseValue>(storage: &ValueStorage, parameter: &Parameter) -> Option<T> {
    if parameter.localizable {
        storage.typed_get_localized(parameter.key)
    } else {
        storage.typed_get(parameter.key)
    }
}

/// The registered JWT claim set of [RFC 7519 section 4.1].
///
/// The container is open: claims outside the registered set stay available
/// through [`get`](Self::get) and [`set`](Self::set).
///
/// [RFC 7519 section 4.1]: <https://datatracker.ietf.org/doc/html/rfc7519#section-4.1>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JwtClaims {
    storage: ValueStorage,
}

impl JwtClaims {
    /// The registered-parameter table of this container.
    pub const REGISTERED: &'static [Parameter] = &[
        Parameter::new("issuer", "iss"),
        Parameter::new("subject", "sub"),
        Parameter::new("audience", "aud"),
        Parameter::new("expiration", "exp"),
        Parameter::new("not_before", "nbf"),
        Parameter::new("issued_at", "iat"),
        Parameter::new("jwt_id", "jti"),
    ];

    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[0])
    }

    /// Sets or removes the `iss` claim.
    pub fn set_issuer(&mut self, issuer: Option<String>) {
        self.storage.typed_set("iss", issuer);
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[1])
    }

    /// Sets or removes the `sub` claim.
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.storage.typed_set("sub", subject);
    }

    /// The `aud` claim. A single audience string reads as a one-element
    /// list (RFC 7519 permits both encodings).
    pub fn audience(&self) -> Option<Vec<String>> {
        match self.storage.get("aud")? {
            Value::String(single) => Some(vec![single.clone()]),
            other => Vec::<String>::from_json(other),
        }
    }

    /// Sets the `aud` claim. One audience is written as a bare string,
    /// several as a list; an empty list removes the claim.
    pub fn set_audience(&mut self, audience: Vec<String>) {
        match <[String; 1]>::try_from(audience) {
            Ok([single]) => self.storage.typed_set("aud", Some(single)),
            Err(audience) => self.storage.typed_set("aud", Some(audience)),
        }
    }

    /// The `exp` claim.
    pub fn expiration(&self) -> Option<NumericDate> {
        read(&self.storage, &Self::REGISTERED[3])
    }

    /// Sets or removes the `exp` claim.
    pub fn set_expiration(&mut self, expiration: Option<NumericDate>) {
        self.storage.typed_set("exp", expiration);
    }

    /// The `nbf` claim.
    pub fn not_before(&self) -> Option<NumericDate> {
        read(&self.storage, &Self::REGISTERED[4])
    }

    /// Sets or removes the `nbf` claim.
    pub fn set_not_before(&mut self, not_before: Option<NumericDate>) {
        self.storage.typed_set("nbf", not_before);
    }

    /// The `iat` claim.
    pub fn issued_at(&self) -> Option<NumericDate> {
        read(&self.storage, &Self::REGISTERED[5])
    }

    /// Sets or removes the `iat` claim.
    pub fn set_issued_at(&mut self, issued_at: Option<NumericDate>) {
        self.storage.typed_set("iat", issued_at);
    }

    /// The `jti` claim.
    pub fn jwt_id(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[6])
    }

    /// Sets or removes the `jti` claim.
    pub fn set_jwt_id(&mut self, jwt_id: Option<String>) {
        self.storage.typed_set("jti", jwt_id);
    }

    /// Reads any claim, registered or private, coerced into `T`.
    pub fn get<T: JoseValue>(&self, key: &str) -> Option<T> {
        self.storage.typed_get(key)
    }

    /// Writes any claim using the JOSE field encoding of `T`.
    pub fn set<T: JoseValue>(&mut self, key: impl Into<String>, value: Option<T>) {
        self.storage.typed_set(key, value);
    }

    /// The raw claim storage.
    pub fn storage(&self) -> &ValueStorage {
        &self.storage
    }

    /// Consumes the container into its raw claim storage.
    pub fn into_storage(self) -> ValueStorage {
        self.storage
    }
}

impl From<ValueStorage> for JwtClaims {
    fn from(storage: ValueStorage) -> Self {
        JwtClaims { storage }
    }
}

impl FromStr for JwtClaims {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JwtClaims {
            storage: s.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registered_accessors_round_trip() {
        let mut claims = JwtClaims::new();
        claims.set_issuer(Some("https://issuer.example".to_owned()));
        claims.set_subject(Some("user-1".to_owned()));
        claims.set_expiration(Some(NumericDate::from_secs(2_000_000_000)));
        claims.set_jwt_id(Some("token-1".to_owned()));

        assert_eq!(claims.issuer().as_deref(), Some("https://issuer.example"));
        assert_eq!(claims.subject().as_deref(), Some("user-1"));
        assert_eq!(
            claims.expiration(),
            Some(NumericDate::from_secs(2_000_000_000))
        );
        assert_eq!(claims.jwt_id().as_deref(), Some("token-1"));

        claims.set_jwt_id(None);
        assert_eq!(claims.jwt_id(), None);
    }

    #[test]
    fn audience_accepts_string_and_list() {
        let claims: JwtClaims = r#"{"aud":"one"}"#.parse().unwrap();
        assert_eq!(claims.audience(), Some(vec!["one".to_owned()]));

        let claims: JwtClaims = r#"{"aud":["one","two"]}"#.parse().unwrap();
        assert_eq!(
            claims.audience(),
            Some(vec!["one".to_owned(), "two".to_owned()])
        );
    }

    #[test]
    fn single_audience_written_as_string() {
        let mut claims = JwtClaims::new();
        claims.set_audience(vec!["only".to_owned()]);
        assert_eq!(claims.storage().get("aud"), Some(&json!("only")));

        claims.set_audience(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(claims.storage().get("aud"), Some(&json!(["a", "b"])));

        claims.set_audience(Vec::new());
        assert!(!claims.storage().contains("aud"));
    }

    #[test]
    fn localizable_parameters_consult_locale_variants() {
        let _guard = crate::storage::LOCALE_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let table = [Parameter::localizable("greeting", "greeting")];
        let storage: ValueStorage = r#"{"greeting":"hello","greeting#de":"hallo"}"#
            .parse()
            .unwrap();

        crate::storage::set_preferred_locales(vec![crate::LanguageTag::new("de-DE")]);
        let localized: Option<String> = read(&storage, &table[0]);
        assert_eq!(localized.as_deref(), Some("hallo"));
        crate::storage::set_preferred_locales(Vec::new());

        let fallback: Option<String> = read(&storage, &table[0]);
        assert_eq!(fallback.as_deref(), Some("hello"));
    }
}
