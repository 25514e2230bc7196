//! The JOSE header of a JWS signature as defined in [RFC 7515 section 4].
//!
//! A header splits into a *protected* part, whose exact base64url encoding
//! is covered by the signature, and an *unprotected* part that travels in
//! the clear in the JSON serializations. Parameters are resolved protected
//! first.
//!
//! [RFC 7515 section 4]: <https://datatracker.ietf.org/doc/html/rfc7515#section-4>

use serde_json::Value;

use crate::{
    claims::{read, Parameter},
    fields::JoseValue,
    uri::Uri,
    JsonWebAlgorithm, JsonWebKey, ValueStorage,
};

/// The registered JWS header parameters of RFC 7515 §4.1.
pub const REGISTERED: &[Parameter] = &[
    Parameter::new("algorithm", "alg"),
    Parameter::new("jwk_set_url", "jku"),
    Parameter::new("json_web_key", "jwk"),
    Parameter::new("key_id", "kid"),
    Parameter::new("x509_url", "x5u"),
    Parameter::new("x509_certificate_chain", "x5c"),
    Parameter::new("x509_certificate_sha1_thumbprint", "x5t"),
    Parameter::new("x509_certificate_sha256_thumbprint", "x5t#S256"),
    Parameter::new("typ", "typ"),
    Parameter::new("content_type", "cty"),
    Parameter::new("critical_headers", "crit"),
];

/// A JOSE header: protected and unprotected claim storage for one
/// signature slot.
///
/// Either part may be empty, but a signature slot needs at least one
/// non-empty part. Typed setters write to the protected part; parameters
/// destined for the unprotected part go through
/// [`unprotected_mut`](Self::unprotected_mut).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoseHeader {
    protected: ValueStorage,
    unprotected: ValueStorage,
}

impl JoseHeader {
    /// Creates an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header from existing protected and unprotected storages.
    pub fn from_parts(protected: Option<ValueStorage>, unprotected: Option<ValueStorage>) -> Self {
        JoseHeader {
            protected: protected.unwrap_or_default(),
            unprotected: unprotected.unwrap_or_default(),
        }
    }

    /// Splits the header, mapping empty parts to [`None`].
    pub fn into_parts(self) -> (Option<ValueStorage>, Option<ValueStorage>) {
        let protected = (!self.protected.is_empty()).then_some(self.protected);
        let unprotected = (!self.unprotected.is_empty()).then_some(self.unprotected);
        (protected, unprotected)
    }

    /// The protected part.
    pub fn protected(&self) -> &ValueStorage {
        &self.protected
    }

    /// Mutable access to the protected part.
    pub fn protected_mut(&mut self) -> &mut ValueStorage {
        &mut self.protected
    }

    /// The unprotected part.
    pub fn unprotected(&self) -> &ValueStorage {
        &self.unprotected
    }

    /// Mutable access to the unprotected part.
    pub fn unprotected_mut(&mut self) -> &mut ValueStorage {
        &mut self.unprotected
    }

    /// Resolves a raw parameter, protected part first.
    pub fn resolve(&self, key: &str) -> Option<&Value> {
        self.protected.get(key).or_else(|| self.unprotected.get(key))
    }

    fn resolve_typed<T: JoseValue>(&self, parameter: &Parameter) -> Option<T> {
        read(&self.protected, parameter).or_else(|| read(&self.unprotected, parameter))
    }

    /// The `alg` parameter.
    pub fn algorithm(&self) -> Option<JsonWebAlgorithm> {
        self.resolve_typed(&REGISTERED[0])
    }

    /// Sets the `alg` parameter, protected.
    pub fn set_algorithm(&mut self, algorithm: JsonWebAlgorithm) {
        self.protected.typed_set("alg", Some(algorithm));
    }

    /// The `jku` parameter.
    pub fn jwk_set_url(&self) -> Option<Uri> {
        self.resolve_typed(&REGISTERED[1])
    }

    /// The `jwk` parameter parsed as a public key.
    ///
    /// Returns [`None`] for an absent parameter and for one that does not
    /// parse as a JWK.
    pub fn json_web_key(&self) -> Option<JsonWebKey> {
        let value = self.resolve("jwk")?;
        let storage: ValueStorage = serde_json::from_value(value.clone()).ok()?;
        JsonWebKey::from_storage(storage).ok()
    }

    /// Embeds a key into the protected `jwk` parameter.
    pub fn set_json_web_key(&mut self, key: &JsonWebKey) {
        self.protected
            .set("jwk", Value::Object(key.storage().as_object().clone()));
    }

    /// The `kid` parameter.
    pub fn key_id(&self) -> Option<String> {
        self.resolve_typed(&REGISTERED[3])
    }

    /// Sets or removes the `kid` parameter, protected.
    pub fn set_key_id(&mut self, key_id: Option<String>) {
        self.protected.typed_set("kid", key_id);
    }

    /// The `x5u` parameter.
    pub fn x509_url(&self) -> Option<Uri> {
        self.resolve_typed(&REGISTERED[4])
    }

    /// The `x5c` parameter: the DER certificate chain.
    pub fn x509_certificate_chain(&self) -> Option<Vec<Vec<u8>>> {
        // x5c uses standard base64 with padding, not base64url
        self.resolve("x5c")
            .and_then(|v| v.as_array())
            .map(|chain| {
                chain
                    .iter()
                    .filter_map(|cert| cert.as_str())
                    .filter_map(|cert| {
                        use base64ct::Encoding;
                        base64ct::Base64::decode_vec(cert).ok()
                    })
                    .collect()
            })
    }

    /// The `typ` parameter.
    pub fn typ(&self) -> Option<String> {
        self.resolve_typed(&REGISTERED[8])
    }

    /// Sets or removes the `typ` parameter, protected.
    pub fn set_typ(&mut self, typ: Option<String>) {
        self.protected.typed_set("typ", typ);
    }

    /// The `cty` parameter.
    pub fn content_type(&self) -> Option<String> {
        self.resolve_typed(&REGISTERED[9])
    }

    /// Sets or removes the `cty` parameter, protected.
    pub fn set_content_type(&mut self, content_type: Option<String>) {
        self.protected.typed_set("cty", content_type);
    }

    /// The `crit` parameter. Always lives in the protected part.
    pub fn critical_headers(&self) -> Option<Vec<String>> {
        read(&self.protected, &REGISTERED[10])
    }

    /// Whether both parts are empty.
    pub fn is_empty(&self) -> bool {
        self.protected.is_empty() && self.unprotected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_takes_precedence() {
        let mut header = JoseHeader::new();
        header.set_algorithm(JsonWebAlgorithm::Es256);
        header
            .unprotected_mut()
            .typed_set("alg", Some(JsonWebAlgorithm::Hs256));

        assert_eq!(header.algorithm(), Some(JsonWebAlgorithm::Es256));
    }

    #[test]
    fn unprotected_is_consulted_as_fallback() {
        let mut header = JoseHeader::new();
        header
            .unprotected_mut()
            .typed_set("kid", Some("fallback".to_owned()));

        assert_eq!(header.key_id().as_deref(), Some("fallback"));
    }

    #[test]
    fn into_parts_maps_empty_to_none() {
        let mut header = JoseHeader::new();
        header.set_algorithm(JsonWebAlgorithm::None);
        let (protected, unprotected) = header.into_parts();
        assert!(protected.is_some());
        assert!(unprotected.is_none());
    }

    #[test]
    fn embedded_jwk_round_trips() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Es256)
            .unwrap()
            .to_public()
            .unwrap();

        let mut header = JoseHeader::new();
        header.set_json_web_key(&key);
        assert_eq!(header.json_web_key(), Some(key));
    }
}
