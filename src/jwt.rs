//! JSON Web Token (JWT) as defined in [RFC 7519]: a JWS whose payload is
//! a JSON claim set.
//!
//! [RFC 7519]: <https://datatracker.ietf.org/doc/html/rfc7519>

use crate::{
    jwk::{Signer, Verifier},
    jws::{Unverified, Verified},
    Error, JoseHeader, JsonWebSignature, JwtClaims, ValueStorage,
};

/// A JWS paired with the claim set decoded from its payload.
///
/// The claim set is the typed view; the payload bytes stay authoritative.
/// Replacing the claims re-serializes the payload, which discards any
/// signatures that covered the previous bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonWebToken {
    jws: JsonWebSignature,
    claims: JwtClaims,
}

impl JsonWebToken {
    /// Creates an unsigned token over the given claim set.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if the claims fail to serialize.
    pub fn new(claims: JwtClaims) -> Result<Self, Error> {
        let payload = claims.storage().encode()?;
        Ok(JsonWebToken {
            jws: JsonWebSignature::new(payload),
            claims,
        })
    }

    /// The claim set carried in the payload.
    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    /// Replaces the claim set, re-serializing the payload. Existing
    /// signatures no longer cover the payload and are discarded.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if the claims fail to serialize.
    pub fn set_claims(&mut self, claims: JwtClaims) -> Result<(), Error> {
        self.jws.set_payload(claims.storage().encode()?);
        self.claims = claims;
        Ok(())
    }

    /// The underlying JWS.
    pub fn jws(&self) -> &JsonWebSignature {
        &self.jws
    }

    /// Consumes the token into its underlying JWS.
    pub fn into_jws(self) -> JsonWebSignature {
        self.jws
    }

    /// Signs the token with one signature slot carrying `header`,
    /// returning the signed JWS ready for serialization.
    ///
    /// # Errors
    ///
    /// Any error of [`JsonWebSignature::sign`] or of slot creation.
    pub fn sign<K: Signer + ?Sized>(
        mut self,
        header: JoseHeader,
        keys: &[&K],
    ) -> Result<JsonWebSignature, Error> {
        self.jws.add_signature(header)?;
        self.jws.sign(keys)
    }

    /// Parses a JWT from any JWS serialization and decodes its payload as
    /// a claim set.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] if the input is not a JWS or the payload
    /// is not a JSON claim set.
    pub fn decode(input: &str) -> Result<Unverified<JsonWebToken>, Error> {
        let jws = JsonWebSignature::decode(input)?.value;
        let claims: JwtClaims = ValueStorage::decode(&jws.payload())?.into();
        Ok(Unverified {
            value: JsonWebToken { jws, claims },
        })
    }
}

impl Unverified<JsonWebToken> {
    /// Verifies the underlying JWS, in the same strict all-slots mode as a
    /// plain JWS [`verify`](Unverified::verify).
    ///
    /// # Errors
    ///
    /// See the JWS [`verify`](Unverified::verify).
    pub fn verify<K: Verifier + ?Sized>(
        self,
        keys: &[&K],
    ) -> Result<Verified<JsonWebToken>, Error> {
        self.value.jws.verify_slots(keys)?;
        Ok(Verified(self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonWebAlgorithm, JsonWebKey, NumericDate};

    #[test]
    fn claim_set_survives_sign_and_decode() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Hs256).unwrap();

        let mut claims = JwtClaims::new();
        claims.set_issuer(Some("https://issuer.example".to_owned()));
        claims.set_issued_at(Some(NumericDate::from_secs(1_700_000_000)));

        let mut header = JoseHeader::new();
        header.set_algorithm(JsonWebAlgorithm::Hs256);
        header.set_typ(Some("JWT".to_owned()));

        let compact = JsonWebToken::new(claims)
            .unwrap()
            .sign(header, &[&key])
            .unwrap()
            .to_compact()
            .unwrap();

        let token = JsonWebToken::decode(&compact)
            .unwrap()
            .verify(&[&key])
            .unwrap();
        assert_eq!(
            token.claims().issuer().as_deref(),
            Some("https://issuer.example")
        );
        assert_eq!(
            token.claims().issued_at(),
            Some(NumericDate::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn replacing_claims_discards_signatures() {
        let key = JsonWebKey::generate(&JsonWebAlgorithm::Hs256).unwrap();

        let mut header = JoseHeader::new();
        header.set_algorithm(JsonWebAlgorithm::Hs256);

        let mut claims = JwtClaims::new();
        claims.set_subject(Some("a".to_owned()));
        let signed = JsonWebToken::new(claims).unwrap().sign(header, &[&key]).unwrap();
        let compact = signed.to_compact().unwrap();

        let mut token = JsonWebToken::decode(&compact).unwrap().value;
        let mut replacement = JwtClaims::new();
        replacement.set_subject(Some("b".to_owned()));
        token.set_claims(replacement).unwrap();

        assert!(token.jws().signatures()[0].signature().is_empty());
    }
}
