//! Weierstrass curve keys (`kty: EC`) for the ECDSA family.
//!
//! Signatures are the fixed-width `r || s` concatenation from RFC 7518
//! §3.4, never DER: 64 bytes on P-256, 96 on P-384, 132 on P-521.

use elliptic_curve::{
    sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint},
    Curve, CurveArithmetic, FieldBytes,
};
use signature::{Signer as _, Verifier as _};

use crate::{jwa::EcCurve, Error, JsonWebAlgorithm};

#[derive(Clone)]
pub(crate) enum EcKeys {
    P256 {
        verifying: p256::ecdsa::VerifyingKey,
        signing: Option<p256::ecdsa::SigningKey>,
    },
    P384 {
        verifying: p384::ecdsa::VerifyingKey,
        signing: Option<p384::ecdsa::SigningKey>,
    },
    P521 {
        verifying: p521::ecdsa::VerifyingKey,
        signing: Option<p521::ecdsa::SigningKey>,
    },
}

impl std::fmt::Debug for EcKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcKeys")
            .field("curve", &self.curve())
            .field("is_private", &self.is_private())
            .finish()
    }
}

fn field_bytes<C: Curve>(bytes: &[u8]) -> Result<FieldBytes<C>, Error> {
    FieldBytes::<C>::from_exact_iter(bytes.iter().copied()).ok_or_else(|| {
        Error::malformed("EC coordinate must be the full field width of its curve")
    })
}

fn encoded_point<C>(x: &[u8], y: &[u8]) -> Result<elliptic_curve::sec1::EncodedPoint<C>, Error>
where
    C: Curve + CurveArithmetic,
    C::FieldBytesSize: ModulusSize,
    C::AffinePoint: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    Ok(elliptic_curve::sec1::EncodedPoint::<C>::from_affine_coordinates(
        &field_bytes::<C>(x)?,
        &field_bytes::<C>(y)?,
        false,
    ))
}

impl EcKeys {
    /// Builds a key from the `x`/`y` point and, for private keys, the `d`
    /// scalar of an EC JWK.
    pub(crate) fn from_params(
        curve: EcCurve,
        x: &[u8],
        y: &[u8],
        d: Option<&[u8]>,
    ) -> Result<Self, Error> {
        match curve {
            EcCurve::P256 => {
                let point = encoded_point::<p256::NistP256>(x, y)?;
                let verifying = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map_err(|_| Error::malformed("point is not on P-256"))?;
                let signing = d
                    .map(|d| {
                        p256::ecdsa::SigningKey::from_bytes(&field_bytes::<p256::NistP256>(d)?)
                            .map_err(|_| Error::malformed("invalid P-256 private scalar"))
                    })
                    .transpose()?;
                Ok(EcKeys::P256 { verifying, signing })
            }
            EcCurve::P384 => {
                let point = encoded_point::<p384::NistP384>(x, y)?;
                let verifying = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map_err(|_| Error::malformed("point is not on P-384"))?;
                let signing = d
                    .map(|d| {
                        p384::ecdsa::SigningKey::from_bytes(&field_bytes::<p384::NistP384>(d)?)
                            .map_err(|_| Error::malformed("invalid P-384 private scalar"))
                    })
                    .transpose()?;
                Ok(EcKeys::P384 { verifying, signing })
            }
            EcCurve::P521 => {
                let point = encoded_point::<p521::NistP521>(x, y)?;
                let verifying = p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map_err(|_| Error::malformed("point is not on P-521"))?;
                let signing = d
                    .map(|d| {
                        p521::ecdsa::SigningKey::from_bytes(&field_bytes::<p521::NistP521>(d)?)
                            .map_err(|_| Error::malformed("invalid P-521 private scalar"))
                    })
                    .transpose()?;
                Ok(EcKeys::P521 { verifying, signing })
            }
            EcCurve::Ed25519 => Err(Error::malformed("Ed25519 keys use kty OKP, not EC")),
        }
    }

    /// Generates a fresh key pair on the given curve.
    pub(crate) fn generate(curve: EcCurve) -> Result<Self, Error> {
        let mut rng = rand_core::OsRng;
        match curve {
            EcCurve::P256 => {
                let signing = p256::ecdsa::SigningKey::random(&mut rng);
                Ok(EcKeys::P256 {
                    verifying: *signing.verifying_key(),
                    signing: Some(signing),
                })
            }
            EcCurve::P384 => {
                let signing = p384::ecdsa::SigningKey::random(&mut rng);
                Ok(EcKeys::P384 {
                    verifying: *signing.verifying_key(),
                    signing: Some(signing),
                })
            }
            EcCurve::P521 => {
                let signing = p521::ecdsa::SigningKey::random(&mut rng);
                Ok(EcKeys::P521 {
                    verifying: p521::ecdsa::VerifyingKey::from(&signing),
                    signing: Some(signing),
                })
            }
            EcCurve::Ed25519 => Err(Error::malformed("Ed25519 keys use kty OKP, not EC")),
        }
    }

    pub(crate) fn curve(&self) -> EcCurve {
        match self {
            EcKeys::P256 { .. } => EcCurve::P256,
            EcKeys::P384 { .. } => EcCurve::P384,
            EcKeys::P521 { .. } => EcCurve::P521,
        }
    }

    pub(crate) fn is_private(&self) -> bool {
        match self {
            EcKeys::P256 { signing, .. } => signing.is_some(),
            EcKeys::P384 { signing, .. } => signing.is_some(),
            EcKeys::P521 { signing, .. } => signing.is_some(),
        }
    }

    /// The affine `(x, y)` point, each coordinate at full field width.
    pub(crate) fn public_point(&self) -> (Vec<u8>, Vec<u8>) {
        match self {
            EcKeys::P256 { verifying, .. } => {
                let point = verifying.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                )
            }
            EcKeys::P384 { verifying, .. } => {
                let point = verifying.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                )
            }
            EcKeys::P521 { verifying, .. } => {
                let point = verifying.to_encoded_point(false);
                (
                    point.x().map(|c| c.to_vec()).unwrap_or_default(),
                    point.y().map(|c| c.to_vec()).unwrap_or_default(),
                )
            }
        }
    }

    /// The private scalar, if this is a private key.
    pub(crate) fn private_scalar(&self) -> Option<Vec<u8>> {
        match self {
            EcKeys::P256 { signing, .. } => signing.as_ref().map(|k| k.to_bytes().to_vec()),
            EcKeys::P384 { signing, .. } => signing.as_ref().map(|k| k.to_bytes().to_vec()),
            EcKeys::P521 { signing, .. } => signing.as_ref().map(|k| k.to_bytes().to_vec()),
        }
    }

    pub(crate) fn to_public(&self) -> Self {
        match self {
            EcKeys::P256 { verifying, .. } => EcKeys::P256 {
                verifying: *verifying,
                signing: None,
            },
            EcKeys::P384 { verifying, .. } => EcKeys::P384 {
                verifying: *verifying,
                signing: None,
            },
            EcKeys::P521 { verifying, .. } => EcKeys::P521 {
                verifying: verifying.clone(),
                signing: None,
            },
        }
    }

    pub(crate) fn sign(
        &self,
        message: &[u8],
        algorithm: &JsonWebAlgorithm,
    ) -> Result<Vec<u8>, Error> {
        let unsupported = || Error::Unsupported(algorithm.name().to_owned());

        match self {
            EcKeys::P256 { signing, .. } => {
                let key = signing.as_ref().ok_or_else(unsupported)?;
                let signature: p256::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::AuthenticationFailure)?;
                Ok(signature.to_bytes().to_vec())
            }
            EcKeys::P384 { signing, .. } => {
                let key = signing.as_ref().ok_or_else(unsupported)?;
                let signature: p384::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::AuthenticationFailure)?;
                Ok(signature.to_bytes().to_vec())
            }
            EcKeys::P521 { signing, .. } => {
                let key = signing.as_ref().ok_or_else(unsupported)?;
                let signature: p521::ecdsa::Signature =
                    key.try_sign(message).map_err(|_| Error::AuthenticationFailure)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    pub(crate) fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), Error> {
        match self {
            EcKeys::P256 { verifying, .. } => {
                let signature = p256::ecdsa::Signature::try_from(signature)
                    .map_err(|_| Error::AuthenticationFailure)?;
                verifying
                    .verify(message, &signature)
                    .map_err(|_| Error::AuthenticationFailure)
            }
            EcKeys::P384 { verifying, .. } => {
                let signature = p384::ecdsa::Signature::try_from(signature)
                    .map_err(|_| Error::AuthenticationFailure)?;
                verifying
                    .verify(message, &signature)
                    .map_err(|_| Error::AuthenticationFailure)
            }
            EcKeys::P521 { verifying, .. } => {
                let signature = p521::ecdsa::Signature::try_from(signature)
                    .map_err(|_| Error::AuthenticationFailure)?;
                verifying
                    .verify(message, &signature)
                    .map_err(|_| Error::AuthenticationFailure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_round_trips() {
        let keys = EcKeys::generate(EcCurve::P256).unwrap();
        let signature = keys.sign(b"payload", &JsonWebAlgorithm::Es256).unwrap();
        assert_eq!(signature.len(), 64);
        keys.verify(b"payload", &signature).unwrap();
    }

    #[test]
    fn signature_widths_are_fixed_per_curve() {
        for (curve, algorithm, width) in [
            (EcCurve::P256, JsonWebAlgorithm::Es256, 64),
            (EcCurve::P384, JsonWebAlgorithm::Es384, 96),
            (EcCurve::P521, JsonWebAlgorithm::Es512, 132),
        ] {
            let keys = EcKeys::generate(curve).unwrap();
            let signature = keys.sign(b"x", &algorithm).unwrap();
            assert_eq!(signature.len(), width);
        }
    }

    #[test]
    fn public_projection_cannot_sign() {
        let keys = EcKeys::generate(EcCurve::P256).unwrap().to_public();
        assert!(!keys.is_private());
        assert!(keys.sign(b"x", &JsonWebAlgorithm::Es256).is_err());
    }

    #[test]
    fn tampered_signature_fails() {
        let keys = EcKeys::generate(EcCurve::P384).unwrap();
        let mut signature = keys.sign(b"payload", &JsonWebAlgorithm::Es384).unwrap();
        signature[0] ^= 0x01;
        assert!(matches!(
            keys.verify(b"payload", &signature),
            Err(Error::AuthenticationFailure)
        ));
    }
}
