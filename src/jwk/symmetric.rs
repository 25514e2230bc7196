//! Symmetric octet sequence keys (`kty: oct`) and their HMAC signatures.

use core::fmt;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::{jwa::HashAlg, Error, JsonWebAlgorithm};

/// Shared-secret key material.
///
/// The secret bytes are kept behind [`secrecy::Secret`] so they are zeroized
/// on drop and stay out of debug output.
pub(crate) struct OctetSequence {
    secret: Secret<Vec<u8>>,
}

impl OctetSequence {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        OctetSequence {
            secret: Secret::new(bytes),
        }
    }

    /// Generates a fresh secret of `len` bytes from the system RNG.
    pub(crate) fn generate(len: usize) -> Self {
        use rand_core::RngCore;

        let mut bytes = vec![0u8; len];
        rand_core::OsRng.fill_bytes(&mut bytes);
        OctetSequence::new(bytes)
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.secret.expose_secret()
    }

    /// Computes the raw MAC bytes over `message`.
    ///
    /// RFC 7518 §3.2 requires the key to be at least as long as the hash
    /// output; shorter keys cannot be used with the requested algorithm.
    pub(crate) fn sign(
        &self,
        message: &[u8],
        hash: HashAlg,
        algorithm: &JsonWebAlgorithm,
    ) -> Result<Vec<u8>, Error> {
        let key = self.secret.expose_secret();

        macro_rules! mac {
            ($digest:ty) => {{
                let mut mac = Hmac::<$digest>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(message);
                mac.finalize().into_bytes().to_vec()
            }};
        }

        let (min_len, out) = match hash {
            HashAlg::Sha256 => (32, mac!(Sha256)),
            HashAlg::Sha384 => (48, mac!(Sha384)),
            HashAlg::Sha512 => (64, mac!(Sha512)),
        };

        if key.len() < min_len {
            return Err(Error::Unsupported(algorithm.name().to_owned()));
        }

        Ok(out)
    }

    /// Verifies by recomputing the MAC and comparing in constant time.
    pub(crate) fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        hash: HashAlg,
        algorithm: &JsonWebAlgorithm,
    ) -> Result<(), Error> {
        let expected = self.sign(message, hash, algorithm)?;

        // this u8 is 1 for equal, 0 for different
        match expected.ct_eq(signature).unwrap_u8() {
            1 => Ok(()),
            _ => Err(Error::AuthenticationFailure),
        }
    }
}

impl Clone for OctetSequence {
    fn clone(&self) -> Self {
        OctetSequence::new(self.secret.expose_secret().clone())
    }
}

impl fmt::Debug for OctetSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctetSequence").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_round_trip() {
        let key = OctetSequence::generate(32);
        let alg = JsonWebAlgorithm::Hs256;
        let mac = key.sign(b"input", HashAlg::Sha256, &alg).unwrap();
        assert_eq!(mac.len(), 32);
        key.verify(b"input", &mac, HashAlg::Sha256, &alg).unwrap();

        assert!(matches!(
            key.verify(b"other", &mac, HashAlg::Sha256, &alg),
            Err(Error::AuthenticationFailure)
        ));
    }

    #[test]
    fn short_keys_are_rejected() {
        let key = OctetSequence::new(vec![0u8; 16]);
        assert!(matches!(
            key.sign(b"input", HashAlg::Sha256, &JsonWebAlgorithm::Hs256),
            Err(Error::Unsupported(_))
        ));
    }
}
