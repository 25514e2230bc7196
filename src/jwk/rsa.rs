//! RSA keys and the RSASSA-PKCS1-v1_5 / RSASSA-PSS signature schemes.

use rsa::{
    sha2::{Digest, Sha256, Sha384, Sha512},
    BigUint, Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey,
};

use crate::{jwa::HashAlg, Error, JsonWebAlgorithm};

/// An RSA public key with optional private half.
#[derive(Debug, Clone)]
pub(crate) struct RsaKeys {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl RsaKeys {
    /// Builds the key pair from JWK parameters.
    ///
    /// A private JWK must carry the `p`/`q` primes next to `d`; recovering
    /// them from the modulus is not attempted.
    pub(crate) fn from_params(
        n: BigUint,
        e: BigUint,
        d: Option<BigUint>,
        primes: Option<(BigUint, BigUint)>,
    ) -> Result<Self, Error> {
        let public = RsaPublicKey::new(n.clone(), e.clone()).map_err(Error::malformed)?;

        let private = match d {
            None => None,
            Some(d) => {
                let (p, q) = primes
                    .ok_or_else(|| Error::malformed("private RSA JWK requires `p` and `q`"))?;
                Some(
                    RsaPrivateKey::from_components(n, e, d, vec![p, q])
                        .map_err(Error::malformed)?,
                )
            }
        };

        Ok(RsaKeys { public, private })
    }

    pub(crate) fn is_private(&self) -> bool {
        self.private.is_some()
    }

    pub(crate) fn to_public(&self) -> Self {
        RsaKeys {
            public: self.public.clone(),
            private: None,
        }
    }

    /// Creates the raw signature bytes over `message`.
    pub(crate) fn sign(
        &self,
        message: &[u8],
        hash: HashAlg,
        pss: bool,
        algorithm: &JsonWebAlgorithm,
    ) -> Result<Vec<u8>, Error> {
        let private = self
            .private
            .as_ref()
            .ok_or_else(|| Error::Unsupported(algorithm.name().to_owned()))?;

        let digest = digest_message(message, hash);

        let signature = if pss {
            // salt length equals the hash length, MGF1 uses the same hash
            let padding = match hash {
                HashAlg::Sha256 => Pss::new::<Sha256>(),
                HashAlg::Sha384 => Pss::new::<Sha384>(),
                HashAlg::Sha512 => Pss::new::<Sha512>(),
            };
            private
                .sign_with_rng(&mut rand_core::OsRng, padding, &digest)
                .map_err(|_| Error::AuthenticationFailure)?
        } else {
            let padding = match hash {
                HashAlg::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                HashAlg::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                HashAlg::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
            };
            private
                .sign(padding, &digest)
                .map_err(|_| Error::AuthenticationFailure)?
        };

        Ok(signature)
    }

    pub(crate) fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        hash: HashAlg,
        pss: bool,
    ) -> Result<(), Error> {
        let digest = digest_message(message, hash);

        let result = if pss {
            let padding = match hash {
                HashAlg::Sha256 => Pss::new::<Sha256>(),
                HashAlg::Sha384 => Pss::new::<Sha384>(),
                HashAlg::Sha512 => Pss::new::<Sha512>(),
            };
            self.public.verify(padding, &digest, signature)
        } else {
            let padding = match hash {
                HashAlg::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                HashAlg::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                HashAlg::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
            };
            self.public.verify(padding, &digest, signature)
        };

        result.map_err(|_| Error::AuthenticationFailure)
    }
}

fn digest_message(message: &[u8], hash: HashAlg) -> Vec<u8> {
    match hash {
        HashAlg::Sha256 => Sha256::digest(message).to_vec(),
        HashAlg::Sha384 => Sha384::digest(message).to_vec(),
        HashAlg::Sha512 => Sha512::digest(message).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2048-bit key from RFC 7515 appendix A.2.1
    const N: &str = "ofgWCuLjybRlzo0tZWJjNiuSfb4p4fAkd_wWJcyQoTbji9k0l8W26mPddxHmfHQp-Vaw-4qPCJrcS2mJPMEzP1Pt0Bm4d4QlL-yRT-SFd2lZS-pCgNMsD1W_YpRPEwOWvG6b32690r2jZ47soMZo9wGzjb_7OMg0LOL-bSf63kpaSHSXndS5z5rexMdbBYUsLA9e-KXBdQOS-UTo7WTBEMa2R2CapHg665xsmtdVMTBQY4uDZlxvb3qCo5ZwKh9kG4LT6_I5IhlJH7aGhyxXFvUK-DWNmoudF8NAco9_h9iaGNj8q2ethFkMLs91kzk2PAcDTW9gb54h4FRWyuXpoQ";
    const E: &str = "AQAB";

    fn b64_uint(s: &str) -> BigUint {
        BigUint::from_bytes_be(&crate::base64_url::decode(s).unwrap())
    }

    #[test]
    fn public_only_key_cannot_sign() {
        let keys = RsaKeys::from_params(b64_uint(N), b64_uint(E), None, None).unwrap();
        assert!(!keys.is_private());
        assert!(matches!(
            keys.sign(b"m", HashAlg::Sha256, false, &JsonWebAlgorithm::Rs256),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn private_jwk_without_primes_is_rejected() {
        let err = RsaKeys::from_params(b64_uint(N), b64_uint(E), Some(b64_uint(E)), None)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }
}
