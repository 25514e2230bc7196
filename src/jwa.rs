//! Implementation of JSON Web Algorithms (JWA) as defined in [RFC 7518],
//! together with the process-wide algorithm registry that drives key
//! construction and signature dispatch.
//!
//! [RFC 7518]: <https://datatracker.ietf.org/doc/html/rfc7518>

use core::fmt;
use std::{
    collections::BTreeMap,
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::JoseValue;

/// A JSON Web Algorithm identifier for signing operations (JWS), covering
/// the `alg` header parameter values from [RFC 7518 section 3.1] plus
/// `EdDSA` from [RFC 8037].
///
/// Identifiers outside the registered set are preserved verbatim in
/// [`Other`](Self::Other) so that privately registered algorithms survive a
/// decode/encode round trip and can be dispatched through the registry.
///
/// [RFC 7518 section 3.1]: <https://datatracker.ietf.org/doc/html/rfc7518#section-3.1>
/// [RFC 8037]: <https://datatracker.ietf.org/doc/html/rfc8037#section-3.1>
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonWebAlgorithm {
    /// The `none` algorithm as defined in [section 3.6 of RFC 7518].
    ///
    /// Using this algorithm essentially means that there is no integrity
    /// protection for the JWS.
    ///
    /// [section 3.6 of RFC 7518]: <https://datatracker.ietf.org/doc/html/rfc7518#section-3.6>
    None,
    /// HMAC using SHA-256
    Hs256,
    /// HMAC using SHA-384
    Hs384,
    /// HMAC using SHA-512
    Hs512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    Rs512,
    /// RSASSA-PSS using SHA-256, MGF1 with SHA-256
    Ps256,
    /// RSASSA-PSS using SHA-384, MGF1 with SHA-384
    Ps384,
    /// RSASSA-PSS using SHA-512, MGF1 with SHA-512
    Ps512,
    /// ECDSA using P-256 and SHA-256
    Es256,
    /// ECDSA using P-384 and SHA-384
    Es384,
    /// ECDSA using P-521 and SHA-512
    Es512,
    /// Edwards-curve Digital Signature Algorithm (Ed25519)
    ///
    /// Note: `EdDSA` should not be confused with ECDSA.
    EdDsa,
    /// An algorithm identifier this implementation has no variant for.
    Other(String),
}

impl JsonWebAlgorithm {
    /// The wire identifier of this algorithm.
    pub fn name(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::EdDsa => "EdDSA",
            Self::Other(name) => name,
        }
    }

    /// Parses a wire identifier. Identifier comparison is case-sensitive;
    /// unknown names land in [`Other`](Self::Other).
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "HS256" => Self::Hs256,
            "HS384" => Self::Hs384,
            "HS512" => Self::Hs512,
            "RS256" => Self::Rs256,
            "RS384" => Self::Rs384,
            "RS512" => Self::Rs512,
            "PS256" => Self::Ps256,
            "PS384" => Self::Ps384,
            "PS512" => Self::Ps512,
            "ES256" => Self::Es256,
            "ES384" => Self::Es384,
            "ES512" => Self::Es512,
            "EdDSA" => Self::EdDsa,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for JsonWebAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for JsonWebAlgorithm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for JsonWebAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl JoseValue for JsonWebAlgorithm {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(Self::from_name)
    }

    fn into_json(self) -> Value {
        Value::String(self.name().to_owned())
    }
}

/// The kind of key material an algorithm requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Shared-secret octet sequences (`kty: oct`).
    Symmetric,
    /// RSA key pairs (`kty: RSA`).
    Rsa,
    /// Elliptic curve key pairs, Weierstrass or Edwards form
    /// (`kty: EC` or `kty: OKP`).
    EllipticCurve,
}

/// The named curve an elliptic curve algorithm is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256 (`crv: P-256`)
    P256,
    /// NIST P-384 (`crv: P-384`)
    P384,
    /// NIST P-521 (`crv: P-521`)
    P521,
    /// Ed25519 (`crv: Ed25519`)
    Ed25519,
}

impl EcCurve {
    /// The JWK `crv` parameter value.
    pub fn name(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::Ed25519 => "Ed25519",
        }
    }

    /// Parses a JWK `crv` parameter value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            "Ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

/// The hash function an algorithm applies to the signing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// The signature scheme of a registration. This tag is what selects the
/// concrete signing and verifying key implementations for an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Empty signature bytes, no integrity protection.
    None,
    /// HMAC; output is the raw MAC bytes.
    Hmac,
    /// RSASSA-PKCS1-v1_5; output is the raw signature bytes.
    RsaPkcs1V1_5,
    /// RSASSA-PSS with MGF1 over the same hash and a salt as long as the
    /// hash output; output is the raw signature bytes.
    RsaPss,
    /// ECDSA; output is the fixed-width `r || s` concatenation, never DER.
    EcDsa,
    /// Ed25519; 64 byte output, the message is consumed unhashed.
    EdDsa,
}

/// A registry entry describing how to handle one algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Kind of key material the algorithm needs.
    pub kind: KeyKind,
    /// Required curve for elliptic curve algorithms.
    pub curve: Option<EcCurve>,
    /// Hash applied to the signing input, if the scheme uses one.
    pub hash: Option<HashAlg>,
    /// Signature scheme, selecting the key classes for this algorithm.
    pub scheme: SignatureScheme,
}

fn registry() -> &'static RwLock<BTreeMap<String, Registration>> {
    static REGISTRY: OnceLock<RwLock<BTreeMap<String, Registration>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(default_registrations()))
}

fn read_registry() -> RwLockReadGuard<'static, BTreeMap<String, Registration>> {
    registry().read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_registry() -> RwLockWriteGuard<'static, BTreeMap<String, Registration>> {
    registry().write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn default_registrations() -> BTreeMap<String, Registration> {
    use {EcCurve::*, HashAlg::*, KeyKind::*, SignatureScheme as Scheme};

    let defaults = [
        ("none", Symmetric, None, None, Scheme::None),
        ("HS256", Symmetric, None, Some(Sha256), Scheme::Hmac),
        ("HS384", Symmetric, None, Some(Sha384), Scheme::Hmac),
        ("HS512", Symmetric, None, Some(Sha512), Scheme::Hmac),
        ("RS256", Rsa, None, Some(Sha256), Scheme::RsaPkcs1V1_5),
        ("RS384", Rsa, None, Some(Sha384), Scheme::RsaPkcs1V1_5),
        ("RS512", Rsa, None, Some(Sha512), Scheme::RsaPkcs1V1_5),
        ("PS256", Rsa, None, Some(Sha256), Scheme::RsaPss),
        ("PS384", Rsa, None, Some(Sha384), Scheme::RsaPss),
        ("PS512", Rsa, None, Some(Sha512), Scheme::RsaPss),
        ("ES256", EllipticCurve, Some(P256), Some(Sha256), Scheme::EcDsa),
        ("ES384", EllipticCurve, Some(P384), Some(Sha384), Scheme::EcDsa),
        ("ES512", EllipticCurve, Some(P521), Some(Sha512), Scheme::EcDsa),
        ("EdDSA", EllipticCurve, Some(Ed25519), None, Scheme::EdDsa),
    ];

    defaults
        .into_iter()
        .map(|(name, kind, curve, hash, scheme)| {
            (
                name.to_owned(),
                Registration {
                    kind,
                    curve,
                    hash,
                    scheme,
                },
            )
        })
        .collect()
}

/// Looks up the registration for an algorithm identifier.
///
/// Reads from the registry may proceed concurrently.
pub fn lookup(algorithm: &JsonWebAlgorithm) -> Option<Registration> {
    read_registry().get(algorithm.name()).copied()
}

/// Registers or overwrites an algorithm. Entries can never be removed.
///
/// Registrations are expected during program initialization, but taking
/// the exclusive lock during steady-state verification is supported.
pub fn register(algorithm: JsonWebAlgorithm, registration: Registration) {
    let previous = write_registry().insert(algorithm.name().to_owned(), registration);
    tracing::debug!(
        algorithm = algorithm.name(),
        overwrote = previous.is_some(),
        "registered JSON Web Algorithm"
    );
}

/// All currently registered algorithm identifiers.
pub fn registered_algorithms() -> Vec<JsonWebAlgorithm> {
    read_registry()
        .keys()
        .map(|name| JsonWebAlgorithm::from_name(name))
        .collect()
}
