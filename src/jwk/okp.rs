//! Edwards curve keys (`kty: OKP`, `crv: Ed25519`) for EdDSA.
//!
//! Ed25519 consumes the message directly; there is no external pre-hash.
//! Signatures are always 64 bytes.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use signature::{Signer as _, Verifier as _};

use crate::{Error, JsonWebAlgorithm};

#[derive(Debug, Clone)]
pub(crate) struct Ed25519Keys {
    verifying: VerifyingKey,
    signing: Option<SigningKey>,
}

impl Ed25519Keys {
    /// Builds a key from the `x` coordinate and, for private keys, the `d`
    /// seed of an OKP JWK.
    pub(crate) fn from_params(x: &[u8], d: Option<&[u8]>) -> Result<Self, Error> {
        let x: [u8; 32] = x
            .try_into()
            .map_err(|_| Error::malformed("Ed25519 public key must be 32 bytes"))?;

        match d {
            Some(d) => {
                let seed: [u8; 32] = d
                    .try_into()
                    .map_err(|_| Error::malformed("Ed25519 private key must be 32 bytes"))?;
                let signing = SigningKey::from_bytes(&seed);
                let verifying = signing.verifying_key();
                if verifying.as_bytes() != &x {
                    return Err(Error::malformed("Ed25519 `x` does not match `d`"));
                }
                Ok(Ed25519Keys {
                    verifying,
                    signing: Some(signing),
                })
            }
            None => {
                let verifying = VerifyingKey::from_bytes(&x)
                    .map_err(|_| Error::malformed("invalid Ed25519 public key"))?;
                Ok(Ed25519Keys {
                    verifying,
                    signing: None,
                })
            }
        }
    }

    pub(crate) fn generate() -> Self {
        let signing = SigningKey::generate(&mut rand_core::OsRng);
        Ed25519Keys {
            verifying: signing.verifying_key(),
            signing: Some(signing),
        }
    }

    pub(crate) fn is_private(&self) -> bool {
        self.signing.is_some()
    }

    pub(crate) fn public_bytes(&self) -> Vec<u8> {
        self.verifying.as_bytes().to_vec()
    }

    pub(crate) fn private_seed(&self) -> Option<Vec<u8>> {
        self.signing.as_ref().map(|k| k.to_bytes().to_vec())
    }

    pub(crate) fn to_public(&self) -> Self {
        Ed25519Keys {
            verifying: self.verifying,
            signing: None,
        }
    }

    pub(crate) fn sign(
        &self,
        message: &[u8],
        algorithm: &JsonWebAlgorithm,
    ) -> Result<Vec<u8>, Error> {
        let signing = self
            .signing
            .as_ref()
            .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;
        let signature = signing
            .try_sign(message)
            .map_err(|_| Error::AuthenticationFailure)?;
        Ok(signature.to_bytes().to_vec())
    }

    pub(crate) fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), Error> {
        let signature =
            Signature::from_slice(signature).map_err(|_| Error::AuthenticationFailure)?;
        self.verifying
            .verify(message, &signature)
            .map_err(|_| Error::AuthenticationFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let keys = Ed25519Keys::generate();
        let signature = keys.sign(b"message", &JsonWebAlgorithm::EdDsa).unwrap();
        assert_eq!(signature.len(), 64);
        keys.verify(b"message", &signature).unwrap();
        assert!(keys.verify(b"other", &signature).is_err());
    }

    #[test]
    fn mismatched_point_and_seed_rejected() {
        let a = Ed25519Keys::generate();
        let b = Ed25519Keys::generate();
        let err = Ed25519Keys::from_params(
            &a.public_bytes(),
            b.private_seed().as_deref(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }
}
