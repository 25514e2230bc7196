//! OAuth 2.0 Demonstrating Proof of Possession (DPoP) as defined in
//! [RFC 9449].
//!
//! A DPoP proof is a JWS whose protected header carries
//! `typ: dpop+jwt`, an asymmetric `alg` and the public `jwk` of the key
//! that signed it, and whose payload is the claim set of [`DpopClaims`].
//!
//! This module provides the claim schema, the proof builder and the
//! signature-level verification entry point. Policy checks (token
//! binding, acceptance windows, nonce freshness, replay) are the
//! caller's responsibility.
//!
//! [RFC 9449]: <https://datatracker.ietf.org/doc/html/rfc9449>

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    base64_url,
    claims::{read, Parameter},
    jwa::{self, KeyKind},
    uri::normalize_target_uri,
    Error, JoseHeader, JsonWebAlgorithm, JsonWebKey, JsonWebSignature, JwtClaims, NumericDate,
    ValueStorage,
};

/// The `typ` value of a DPoP proof header.
pub const DPOP_TYP: &str = "dpop+jwt";

/// The DPoP proof claim set of RFC 9449 §4.2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DpopClaims {
    storage: ValueStorage,
}

impl DpopClaims {
    /// The registered-parameter table of this container.
    pub const REGISTERED: &'static [Parameter] = &[
        Parameter::new("jwt_id", "jti"),
        Parameter::new("http_method", "htm"),
        Parameter::new("target_uri", "htu"),
        Parameter::new("issued_at", "iat"),
        Parameter::new("access_token_hash", "ath"),
        Parameter::new("nonce", "nonce"),
    ];

    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `jti` claim: the unique proof identifier.
    pub fn jwt_id(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[0])
    }

    /// Sets or removes the `jti` claim.
    pub fn set_jwt_id(&mut self, jwt_id: Option<String>) {
        self.storage.typed_set("jti", jwt_id);
    }

    /// The `htm` claim: the HTTP method of the request the proof covers.
    pub fn http_method(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[1])
    }

    /// Sets or removes the `htm` claim. Methods are case-sensitive;
    /// uppercase is what servers expect.
    pub fn set_http_method(&mut self, method: Option<String>) {
        self.storage.typed_set("htm", method);
    }

    /// The `htu` claim: the normalized HTTP target URI.
    pub fn target_uri(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[2])
    }

    /// Normalizes `uri` per RFC 9449 and stores it as the `htu` claim.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if `uri` is not an absolute URI.
    pub fn set_target_uri(&mut self, uri: &str) -> Result<(), Error> {
        let normalized = normalize_target_uri(uri)
            .ok_or_else(|| Error::malformed(format!("`{uri}` is not an absolute HTTP URI")))?;
        self.storage.typed_set("htu", Some(normalized));
        Ok(())
    }

    /// The `iat` claim.
    pub fn issued_at(&self) -> Option<NumericDate> {
        read(&self.storage, &Self::REGISTERED[3])
    }

    /// Sets or removes the `iat` claim.
    pub fn set_issued_at(&mut self, issued_at: Option<NumericDate>) {
        self.storage.typed_set("iat", issued_at);
    }

    /// The `ath` claim: base64url of the SHA-256 of the bound access
    /// token.
    pub fn access_token_hash(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[4])
    }

    /// Sets or removes the `ath` claim from an already computed hash.
    pub fn set_access_token_hash(&mut self, hash: Option<String>) {
        self.storage.typed_set("ath", hash);
    }

    /// The `nonce` claim: the server-provided nonce.
    pub fn nonce(&self) -> Option<String> {
        read(&self.storage, &Self::REGISTERED[5])
    }

    /// Sets or removes the `nonce` claim.
    pub fn set_nonce(&mut self, nonce: Option<String>) {
        self.storage.typed_set("nonce", nonce);
    }

    /// The raw claim storage.
    pub fn storage(&self) -> &ValueStorage {
        &self.storage
    }
}

impl From<ValueStorage> for DpopClaims {
    fn from(storage: ValueStorage) -> Self {
        DpopClaims { storage }
    }
}

impl From<DpopClaims> for JwtClaims {
    fn from(claims: DpopClaims) -> Self {
        claims.storage.into()
    }
}

impl FromStr for DpopClaims {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DpopClaims {
            storage: s.parse()?,
        })
    }
}

/// Computes the `ath` claim value for an access token: base64url of the
/// SHA-256 over the token's ASCII bytes (RFC 9449 §4.2).
pub fn access_token_hash(access_token: &str) -> String {
    base64_url::encode(Sha256::digest(access_token.as_bytes()))
}

/// Builds and signs DPoP proofs.
///
/// The builder fills `jti` (a fresh UUID) and `iat` (now) unless they are
/// provided, normalizes the target URI, embeds the public half of the
/// signing key and emits the compact serialization.
#[derive(Debug, Clone)]
pub struct DpopProofBuilder {
    method: String,
    target_uri: String,
    nonce: Option<String>,
    access_token: Option<String>,
    jwt_id: Option<String>,
    issued_at: Option<NumericDate>,
}

impl DpopProofBuilder {
    /// Starts a proof for one HTTP request.
    pub fn new(method: impl Into<String>, target_uri: impl Into<String>) -> Self {
        DpopProofBuilder {
            method: method.into(),
            target_uri: target_uri.into(),
            nonce: None,
            access_token: None,
            jwt_id: None,
            issued_at: None,
        }
    }

    /// Includes a server-provided nonce.
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Binds the proof to an access token via the `ath` claim.
    pub fn access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Overrides the generated `jti`.
    pub fn jwt_id(mut self, jwt_id: impl Into<String>) -> Self {
        self.jwt_id = Some(jwt_id.into());
        self
    }

    /// Overrides the `iat` timestamp.
    pub fn issued_at(mut self, issued_at: NumericDate) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Signs the proof with `key` and returns the compact serialization.
    ///
    /// # Errors
    ///
    /// [`Error::OperationNotAllowed`] if `algorithm` is not an asymmetric
    /// signature algorithm, [`Error::MalformedInput`] for an invalid
    /// target URI, or any signing error.
    pub fn build(self, key: &JsonWebKey, algorithm: &JsonWebAlgorithm) -> Result<String, Error> {
        require_asymmetric(algorithm)?;

        let mut claims = DpopClaims::new();
        claims.set_jwt_id(Some(
            self.jwt_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        ));
        claims.set_http_method(Some(self.method));
        claims.set_target_uri(&self.target_uri)?;
        claims.set_issued_at(Some(self.issued_at.unwrap_or_else(NumericDate::now)));
        claims.set_nonce(self.nonce);
        claims.set_access_token_hash(self.access_token.as_deref().map(access_token_hash));

        let mut header = JoseHeader::new();
        header.set_typ(Some(DPOP_TYP.to_owned()));
        header.set_algorithm(algorithm.clone());
        header.set_json_web_key(&key.to_public()?);

        let mut jws = JsonWebSignature::new(claims.storage().encode()?);
        jws.add_signature(header)?;
        jws.sign(&[key])?.to_compact()
    }
}

/// A DPoP proof that passed signature verification against its embedded
/// key. Everything beyond the signature, like method and URI matching,
/// time windows and token binding, is still the caller's policy.
#[derive(Debug)]
pub struct DpopProof {
    jws: JsonWebSignature,
    claims: DpopClaims,
    key: JsonWebKey,
}

impl DpopProof {
    /// The verified claim set.
    pub fn claims(&self) -> &DpopClaims {
        &self.claims
    }

    /// The public key the proof was signed with.
    pub fn key(&self) -> &JsonWebKey {
        &self.key
    }

    /// The RFC 7638 thumbprint of the proof key, for comparison against a
    /// token's `cnf.jkt` binding.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if the embedded JWK is structurally
    /// incomplete.
    pub fn key_thumbprint(&self) -> Result<String, Error> {
        self.key.thumbprint()
    }

    /// The underlying JWS.
    pub fn jws(&self) -> &JsonWebSignature {
        &self.jws
    }
}

/// Decodes a compact DPoP proof and verifies its signature against the
/// public key embedded in its own header.
///
/// # Errors
///
/// [`Error::MalformedInput`] if the input is not a single-signature JWS
/// with `typ: dpop+jwt` and an embedded public `jwk`, or if the proof key
/// carries private material. [`Error::OperationNotAllowed`] for `none` or
/// symmetric algorithms. [`Error::AuthenticationFailure`] for a bad
/// signature.
pub fn verify_proof(proof: &str) -> Result<DpopProof, Error> {
    let decoded = JsonWebSignature::decode(proof)?;

    let [entry] = decoded.unverified().signatures() else {
        return Err(Error::malformed("a DPoP proof carries exactly one signature"));
    };
    let protected = entry
        .protected()
        .ok_or_else(|| Error::malformed("a DPoP proof needs a protected header"))?;

    let typ: Option<String> = protected.values().typed_get("typ");
    if typ.as_deref() != Some(DPOP_TYP) {
        return Err(Error::malformed("header `typ` is not dpop+jwt"));
    }

    let algorithm = entry.algorithm().ok_or(Error::AlgorithmMissing)?;
    if algorithm == JsonWebAlgorithm::None {
        // the engine's fixed refusal, surfaced before the jwk checks
        return Err(Error::OperationNotAllowed(
            "refusing to verify an unsecured JWS (alg: none)",
        ));
    }
    require_asymmetric(&algorithm)?;

    let key_storage: ValueStorage = protected
        .values()
        .typed_get("jwk")
        .and_then(|value: serde_json::Value| serde_json::from_value(value).ok())
        .ok_or_else(|| Error::malformed("a DPoP proof embeds its public key as `jwk`"))?;
    let key = JsonWebKey::from_storage(key_storage)?;
    if key.is_private() {
        return Err(Error::malformed(
            "the embedded proof key must not carry private material",
        ));
    }

    let verified = decoded.verify(&[&key])?.into_inner();
    let claims: DpopClaims = ValueStorage::decode(&verified.payload())?.into();

    Ok(DpopProof {
        jws: verified,
        claims,
        key,
    })
}

fn require_asymmetric(algorithm: &JsonWebAlgorithm) -> Result<(), Error> {
    let registration = jwa::lookup(algorithm)
        .ok_or_else(|| Error::UnknownAlgorithm(algorithm.name().to_owned()))?;
    if registration.kind == KeyKind::Symmetric {
        return Err(Error::OperationNotAllowed(
            "DPoP proofs require an asymmetric signature algorithm",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_jti_and_iat() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Es256).unwrap();
        let proof = DpopProofBuilder::new("POST", "https://server.example.com/token?client=1")
            .build(&key, &JsonWebAlgorithm::Es256)
            .unwrap();

        let verified = verify_proof(&proof).unwrap();
        let claims = verified.claims();
        assert!(claims.jwt_id().is_some());
        assert!(claims.issued_at().is_some());
        assert_eq!(claims.http_method().as_deref(), Some("POST"));
        assert_eq!(
            claims.target_uri().as_deref(),
            Some("https://server.example.com/token")
        );
        assert_eq!(claims.nonce(), None);
    }

    #[test]
    fn symmetric_algorithms_are_refused() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Hs256).unwrap();
        let err = DpopProofBuilder::new("GET", "https://api.example.com/")
            .build(&key, &JsonWebAlgorithm::Hs256)
            .unwrap_err();
        assert!(matches!(err, Error::OperationNotAllowed(_)));
    }

    #[test]
    fn access_token_binding_uses_sha256() {
        // RFC 9449 section 4.3 example token and hash
        let token = "Kz~8mXK1EalYznwH-LC-1fBAo.4Ljp~zsPE_NeO.gxU";
        assert_eq!(
            access_token_hash(token),
            "fUHyO2r2Z3DZ53EsNrWBb0xWXoaNy59IiKCAqksmQEo"
        );
    }

    #[test]
    fn proof_with_private_jwk_is_rejected() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Es256).unwrap();

        let mut claims = DpopClaims::new();
        claims.set_jwt_id(Some("x".to_owned()));
        claims.set_http_method(Some("GET".to_owned()));
        claims.set_target_uri("https://api.example.com/").unwrap();

        let mut header = JoseHeader::new();
        header.set_typ(Some(DPOP_TYP.to_owned()));
        header.set_algorithm(JsonWebAlgorithm::Es256);
        // embed the full private key instead of the public projection
        header.set_json_web_key(&key);

        let mut jws = JsonWebSignature::new(claims.storage().encode().unwrap());
        jws.add_signature(header).unwrap();
        let proof = jws.sign(&[&key]).unwrap().to_compact().unwrap();

        let err = verify_proof(&proof).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn eddsa_proofs_round_trip() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::EdDsa).unwrap();
        let proof = DpopProofBuilder::new("GET", "https://resource.example.org/item#frag")
            .nonce("server-nonce")
            .access_token("token-bytes")
            .build(&key, &JsonWebAlgorithm::EdDsa)
            .unwrap();

        let verified = verify_proof(&proof).unwrap();
        assert_eq!(
            verified.claims().target_uri().as_deref(),
            Some("https://resource.example.org/item")
        );
        assert_eq!(verified.claims().nonce().as_deref(), Some("server-nonce"));
        assert_eq!(
            verified.claims().access_token_hash(),
            Some(access_token_hash("token-bytes"))
        );
        assert_eq!(
            verified.key_thumbprint().unwrap(),
            key.thumbprint().unwrap()
        );
    }
}
