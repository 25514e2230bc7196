//! Implementation of JSON Web Key (JWK) as defined in [RFC 7517].
//!
//! A [`JsonWebKey`] pairs the raw JWK claim storage with the parsed key
//! material behind it, and exposes the [`Signer`] and [`Verifier`]
//! capability traits the JWS engine dispatches through. Hardware-backed or
//! otherwise opaque keys can participate by implementing the same traits.
//!
//! [RFC 7517]: <https://datatracker.ietf.org/doc/html/rfc7517>

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    jwa::{self, EcCurve, HashAlg, KeyKind, Registration, SignatureScheme},
    Error, JsonWebAlgorithm, ValueStorage,
};

mod ec;
mod okp;
mod rsa;
mod symmetric;
mod thumbprint;

/// JWK members that carry private key material (RFC 7518 §6).
const PRIVATE_MEMBERS: &[&str] = &["d", "p", "q", "dp", "dq", "qi", "oth", "k"];

/// Anything that can check a JWS signature.
///
/// Implementations declare which algorithms they can handle so that the
/// engine can partition candidate keys before dispatching, and surface
/// their `kid` for header-driven selection.
pub trait Verifier {
    /// The key id (`kid`) of this key, if it has one.
    fn key_id(&self) -> Option<&str>;

    /// Whether this key can handle `algorithm`.
    fn supports(&self, algorithm: &JsonWebAlgorithm) -> bool;

    /// Checks `signature` over `message`.
    ///
    /// # Errors
    ///
    /// [`Error::AuthenticationFailure`] if the signature is invalid for the
    /// message, [`Error::Unsupported`] if the key cannot handle the
    /// algorithm.
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: &JsonWebAlgorithm,
    ) -> Result<(), Error>;
}

/// A key that can also produce signatures. Every signing key is a
/// validating key for the same algorithms.
pub trait Signer: Verifier {
    /// Produces the signature bytes over `message`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] if the key cannot sign with `algorithm`, e.g.
    /// because it holds no private material.
    fn sign(&self, message: &[u8], algorithm: &JsonWebAlgorithm) -> Result<Vec<u8>, Error>;
}

#[derive(Debug, Clone)]
pub(crate) enum KeyMaterial {
    Symmetric(symmetric::OctetSequence),
    Rsa(rsa::RsaKeys),
    Ec(ec::EcKeys),
    Okp(okp::Ed25519Keys),
}

/// A JSON Web Key: the raw JWK object plus its parsed key material.
///
/// Keys are immutable after construction. Cloning is cheap enough to treat
/// them as values; the private material is never printed by [`fmt::Debug`].
#[derive(Clone)]
pub struct JsonWebKey {
    storage: ValueStorage,
    material: KeyMaterial,
}

impl JsonWebKey {
    /// Parses a key from its JWK claim storage.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if `kty` is missing or unknown, required
    /// members are absent, or the key material is invalid.
    pub fn from_storage(storage: ValueStorage) -> Result<Self, Error> {
        let kty: String = storage
            .typed_get("kty")
            .ok_or_else(|| Error::malformed("JWK lacks the `kty` member"))?;

        let bytes = |name: &str| -> Result<Vec<u8>, Error> {
            storage
                .typed_get(name)
                .ok_or_else(|| Error::malformed(format!("JWK lacks member `{name}`")))
        };

        let material = match kty.as_str() {
            "oct" => KeyMaterial::Symmetric(symmetric::OctetSequence::new(bytes("k")?)),
            "RSA" => {
                let n = storage
                    .typed_get("n")
                    .ok_or_else(|| Error::malformed("RSA JWK lacks `n`"))?;
                let e = storage
                    .typed_get("e")
                    .ok_or_else(|| Error::malformed("RSA JWK lacks `e`"))?;
                let d = storage.typed_get("d");
                let primes = match (storage.typed_get("p"), storage.typed_get("q")) {
                    (Some(p), Some(q)) => Some((p, q)),
                    _ => None,
                };
                KeyMaterial::Rsa(rsa::RsaKeys::from_params(n, e, d, primes)?)
            }
            "EC" => {
                let crv: String = storage
                    .typed_get("crv")
                    .ok_or_else(|| Error::malformed("EC JWK lacks `crv`"))?;
                let curve = EcCurve::from_name(&crv)
                    .ok_or_else(|| Error::malformed(format!("unknown curve `{crv}`")))?;
                let d: Option<Vec<u8>> = storage.typed_get("d");
                KeyMaterial::Ec(ec::EcKeys::from_params(
                    curve,
                    &bytes("x")?,
                    &bytes("y")?,
                    d.as_deref(),
                )?)
            }
            "OKP" => {
                let crv: String = storage
                    .typed_get("crv")
                    .ok_or_else(|| Error::malformed("OKP JWK lacks `crv`"))?;
                if crv != "Ed25519" {
                    return Err(Error::malformed(format!("unsupported OKP curve `{crv}`")));
                }
                let d: Option<Vec<u8>> = storage.typed_get("d");
                KeyMaterial::Okp(okp::Ed25519Keys::from_params(&bytes("x")?, d.as_deref())?)
            }
            other => return Err(Error::malformed(format!("unknown key type `{other}`"))),
        };

        Ok(JsonWebKey { storage, material })
    }

    /// Generates a fresh key usable with `algorithm`.
    ///
    /// Supported for the HMAC, ECDSA and EdDSA families. RSA key
    /// generation is out of scope; import RSA keys from their JWK form
    /// instead.
    pub fn generate(algorithm: &JsonWebAlgorithm) -> Result<Self, Error> {
        let registration = jwa::lookup(algorithm)
            .ok_or_else(|| Error::UnknownAlgorithm(algorithm.name().to_owned()))?;

        let mut storage = ValueStorage::new();
        storage.typed_set("alg", Some(algorithm.clone()));

        let material = match registration.scheme {
            SignatureScheme::Hmac => {
                let len = match registration.hash {
                    Some(HashAlg::Sha256) => 32,
                    Some(HashAlg::Sha384) => 48,
                    Some(HashAlg::Sha512) | None => 64,
                };
                let key = symmetric::OctetSequence::generate(len);
                storage.typed_set("kty", Some("oct".to_owned()));
                storage.typed_set("k", Some(key.expose().to_vec()));
                KeyMaterial::Symmetric(key)
            }
            SignatureScheme::EcDsa => {
                let curve = registration
                    .curve
                    .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
                let keys = ec::EcKeys::generate(curve)?;
                let (x, y) = keys.public_point();
                storage.typed_set("kty", Some("EC".to_owned()));
                storage.typed_set("crv", Some(curve.name().to_owned()));
                storage.typed_set("x", Some(x));
                storage.typed_set("y", Some(y));
                storage.typed_set("d", keys.private_scalar());
                KeyMaterial::Ec(keys)
            }
            SignatureScheme::EdDsa => {
                let keys = okp::Ed25519Keys::generate();
                storage.typed_set("kty", Some("OKP".to_owned()));
                storage.typed_set("crv", Some("Ed25519".to_owned()));
                storage.typed_set("x", Some(keys.public_bytes()));
                storage.typed_set("d", keys.private_seed());
                KeyMaterial::Okp(keys)
            }
            _ => return Err(Error::Unsupported(algorithm.name().to_owned())),
        };

        Ok(JsonWebKey { storage, material })
    }

    /// Returns this key with its `kid` member set.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.storage.typed_set("kid", Some(key_id.into()));
        self
    }

    /// The JWK `kty` member.
    pub fn key_type(&self) -> &'static str {
        match self.material {
            KeyMaterial::Symmetric(_) => "oct",
            KeyMaterial::Rsa(_) => "RSA",
            KeyMaterial::Ec(_) => "EC",
            KeyMaterial::Okp(_) => "OKP",
        }
    }

    /// The kind of key material, as the algorithm registry classifies it.
    pub fn key_kind(&self) -> KeyKind {
        match self.material {
            KeyMaterial::Symmetric(_) => KeyKind::Symmetric,
            KeyMaterial::Rsa(_) => KeyKind::Rsa,
            KeyMaterial::Ec(_) | KeyMaterial::Okp(_) => KeyKind::EllipticCurve,
        }
    }

    /// The curve of an elliptic curve key.
    pub fn curve(&self) -> Option<EcCurve> {
        match &self.material {
            KeyMaterial::Ec(keys) => Some(keys.curve()),
            KeyMaterial::Okp(_) => Some(EcCurve::Ed25519),
            _ => None,
        }
    }

    /// The `alg` member, if the key is bound to one algorithm.
    pub fn algorithm(&self) -> Option<JsonWebAlgorithm> {
        self.storage.typed_get("alg")
    }

    /// Whether this key holds private material and can sign.
    pub fn is_private(&self) -> bool {
        match &self.material {
            KeyMaterial::Symmetric(_) => true,
            KeyMaterial::Rsa(keys) => keys.is_private(),
            KeyMaterial::Ec(keys) => keys.is_private(),
            KeyMaterial::Okp(keys) => keys.is_private(),
        }
    }

    /// The raw JWK claim storage.
    pub fn storage(&self) -> &ValueStorage {
        &self.storage
    }

    /// The public projection of this key: the same key with every private
    /// member removed. This is what gets embedded into a DPoP `jwk` header.
    ///
    /// # Errors
    ///
    /// [`Error::OperationNotAllowed`] for symmetric keys, which have no
    /// public form.
    pub fn to_public(&self) -> Result<JsonWebKey, Error> {
        let material = match &self.material {
            KeyMaterial::Symmetric(_) => {
                return Err(Error::OperationNotAllowed(
                    "symmetric keys have no public form",
                ))
            }
            KeyMaterial::Rsa(keys) => KeyMaterial::Rsa(keys.to_public()),
            KeyMaterial::Ec(keys) => KeyMaterial::Ec(keys.to_public()),
            KeyMaterial::Okp(keys) => KeyMaterial::Okp(keys.to_public()),
        };

        let mut storage = self.storage.clone();
        storage.filter(|name, _| !PRIVATE_MEMBERS.contains(&name));

        Ok(JsonWebKey { storage, material })
    }

    /// The RFC 7638 thumbprint of this key.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if the storage lacks a member the
    /// canonical form requires.
    pub fn thumbprint(&self) -> Result<String, Error> {
        thumbprint::thumbprint(self)
    }

    fn registration_for(&self, algorithm: &JsonWebAlgorithm) -> Result<Registration, Error> {
        let registration = jwa::lookup(algorithm)
            .ok_or_else(|| Error::UnknownAlgorithm(algorithm.name().to_owned()))?;
        if !self.matches(&registration) {
            return Err(Error::Unsupported(algorithm.name().to_owned()));
        }
        Ok(registration)
    }

    fn matches(&self, registration: &Registration) -> bool {
        match registration.scheme {
            SignatureScheme::None => false,
            SignatureScheme::Hmac => matches!(self.material, KeyMaterial::Symmetric(_)),
            SignatureScheme::RsaPkcs1V1_5 | SignatureScheme::RsaPss => {
                matches!(self.material, KeyMaterial::Rsa(_))
            }
            SignatureScheme::EcDsa => match &self.material {
                KeyMaterial::Ec(keys) => registration.curve == Some(keys.curve()),
                _ => false,
            },
            SignatureScheme::EdDsa => {
                matches!(self.material, KeyMaterial::Okp(_))
                    && registration.curve == Some(EcCurve::Ed25519)
            }
        }
    }
}

impl Verifier for JsonWebKey {
    fn key_id(&self) -> Option<&str> {
        self.storage.get("kid").and_then(serde_json::Value::as_str)
    }

    fn supports(&self, algorithm: &JsonWebAlgorithm) -> bool {
        jwa::lookup(algorithm).is_some_and(|registration| self.matches(&registration))
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        algorithm: &JsonWebAlgorithm,
    ) -> Result<(), Error> {
        let registration = self.registration_for(algorithm)?;

        match (&self.material, registration.scheme) {
            (KeyMaterial::Symmetric(keys), SignatureScheme::Hmac) => {
                let hash = registration
                    .hash
                    .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
                keys.verify(message, signature, hash, algorithm)
            }
            (KeyMaterial::Rsa(keys), scheme @ (SignatureScheme::RsaPkcs1V1_5 | SignatureScheme::RsaPss)) => {
                let hash = registration
                    .hash
                    .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
                keys.verify(message, signature, hash, scheme == SignatureScheme::RsaPss)
            }
            (KeyMaterial::Ec(keys), SignatureScheme::EcDsa) => keys.verify(message, signature),
            (KeyMaterial::Okp(keys), SignatureScheme::EdDsa) => keys.verify(message, signature),
            _ => Err(Error::Unsupported(algorithm.name().to_owned())),
        }
    }
}

impl Signer for JsonWebKey {
    fn sign(&self, message: &[u8], algorithm: &JsonWebAlgorithm) -> Result<Vec<u8>, Error> {
        let registration = self.registration_for(algorithm)?;

        match (&self.material, registration.scheme) {
            (KeyMaterial::Symmetric(keys), SignatureScheme::Hmac) => {
                let hash = registration
                    .hash
                    .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
                keys.sign(message, hash, algorithm)
            }
            (KeyMaterial::Rsa(keys), scheme @ (SignatureScheme::RsaPkcs1V1_5 | SignatureScheme::RsaPss)) => {
                let hash = registration
                    .hash
                    .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
                keys.sign(message, hash, scheme == SignatureScheme::RsaPss, algorithm)
            }
            (KeyMaterial::Ec(keys), SignatureScheme::EcDsa) => keys.sign(message, algorithm),
            (KeyMaterial::Okp(keys), SignatureScheme::EdDsa) => keys.sign(message, algorithm),
            _ => Err(Error::Unsupported(algorithm.name().to_owned())),
        }
    }
}

/// Selects a key from `keys` for the given algorithm and optional `kid`.
///
/// Candidates are first partitioned by algorithm support. With a `kid`, an
/// exact match is preferred; without one (or when no candidate carries the
/// requested id) the first compatible key is used and the fallback is
/// recorded for observability.
///
/// # Errors
///
/// [`Error::KeyNotFound`] when no candidate supports the algorithm.
pub fn select_key<'a, K>(
    keys: &[&'a K],
    algorithm: &JsonWebAlgorithm,
    key_id: Option<&str>,
) -> Result<&'a K, Error>
where
    K: Verifier + ?Sized,
{
    let mut compatible = keys.iter().filter(|key| key.supports(algorithm)).peekable();

    if compatible.peek().is_none() {
        return Err(Error::KeyNotFound {
            algorithm: algorithm.name().to_owned(),
            key_id: key_id.map(str::to_owned),
        });
    }

    let compatible: Vec<&'a K> = compatible.copied().collect();

    if let Some(kid) = key_id {
        if let Some(key) = compatible.iter().find(|key| key.key_id() == Some(kid)) {
            return Ok(key);
        }
        tracing::warn!(kid, algorithm = algorithm.name(), "no key carries the requested kid, falling back to the first compatible key");
    } else {
        tracing::debug!(
            algorithm = algorithm.name(),
            "no kid in header, using the first compatible key"
        );
    }

    Ok(compatible[0])
}

impl fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kty", &self.key_type())
            .field("crv", &self.curve().map(|c| c.name()))
            .field("kid", &self.key_id())
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

impl PartialEq for JsonWebKey {
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl FromStr for JsonWebKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonWebKey::from_storage(s.parse()?)
    }
}

impl Serialize for JsonWebKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.storage.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonWebKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let storage = ValueStorage::deserialize(deserializer)?;
        JsonWebKey::from_storage(storage).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P256_PRIVATE: &str = r#"{
        "kty": "EC",
        "kid": "UYa89vgc4u_lpcbbmDQfYJQRAUD4AED8H8FUNjk5KyQ",
        "crv": "P-256",
        "x": "hFc6OfbgRsYFOWyhGbWH0sS5DZBjJLGABJvPttVZfA4",
        "y": "tnXB8ks0-AZJKOgbMWJrE5Jm3nTFy0UiqQugmx9jku4",
        "d": "U7b2FqvDSIMFUF0FTea7Z-K8Fk0Xyb2qJlw62USEm04"
    }"#;

    #[test]
    fn parses_private_p256_jwk() {
        let key: JsonWebKey = P256_PRIVATE.parse().unwrap();
        assert_eq!(key.key_type(), "EC");
        assert_eq!(key.curve(), Some(EcCurve::P256));
        assert!(key.is_private());
        assert!(key.supports(&JsonWebAlgorithm::Es256));
        assert!(!key.supports(&JsonWebAlgorithm::Es384));
        assert!(!key.supports(&JsonWebAlgorithm::Hs256));
        assert!(!key.supports(&JsonWebAlgorithm::None));
    }

    #[test]
    fn public_projection_drops_private_members() {
        let key: JsonWebKey = P256_PRIVATE.parse().unwrap();
        let public = key.to_public().unwrap();
        assert!(!public.is_private());
        assert!(!public.storage().contains("d"));
        assert!(public.storage().contains("x"));
        assert_eq!(public.key_id(), key.key_id());
    }

    #[test]
    fn sign_verify_round_trip() {
        let key: JsonWebKey = P256_PRIVATE.parse().unwrap();
        let alg = JsonWebAlgorithm::Es256;
        let signature = key.sign(b"message", &alg).unwrap();
        key.verify(b"message", &signature, &alg).unwrap();

        let public = key.to_public().unwrap();
        public.verify(b"message", &signature, &alg).unwrap();
        assert!(matches!(
            public.sign(b"message", &alg),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn selection_prefers_kid_match() {
        let a = JsonWebKey::generate(&JsonWebAlgorithm::Es256)
            .unwrap()
            .with_key_id("a");
        let b = JsonWebKey::generate(&JsonWebAlgorithm::Es256)
            .unwrap()
            .with_key_id("b");
        let keys: Vec<&JsonWebKey> = vec![&a, &b];

        let picked = select_key(&keys, &JsonWebAlgorithm::Es256, Some("b")).unwrap();
        assert_eq!(picked.key_id(), Some("b"));

        let fallback = select_key(&keys, &JsonWebAlgorithm::Es256, None).unwrap();
        assert_eq!(fallback.key_id(), Some("a"));

        let err = select_key(&keys, &JsonWebAlgorithm::Hs256, None).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound { .. }));
    }

    #[test]
    fn generated_symmetric_key_round_trips_through_jwk() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Hs384).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let restored: JsonWebKey = serde_json::from_str(&json).unwrap();

        let mac = key.sign(b"m", &JsonWebAlgorithm::Hs384).unwrap();
        restored.verify(b"m", &mac, &JsonWebAlgorithm::Hs384).unwrap();
    }
}
