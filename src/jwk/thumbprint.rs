//! JWK thumbprints as defined in [RFC 7638].
//!
//! [RFC 7638]: <https://datatracker.ietf.org/doc/html/rfc7638>

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::{base64_url, Error, JsonWebKey};

/// Computes the RFC 7638 thumbprint of a key: SHA-256 over the canonical
/// JSON object that holds only the required members of the key type, with
/// lexicographically sorted keys and no whitespace, base64url encoded.
///
/// The result is what a DPoP-bound access token carries in its `cnf.jkt`
/// claim.
pub(crate) fn thumbprint(key: &JsonWebKey) -> Result<String, Error> {
    let storage = key.storage();
    let member = |name: &str| -> Result<Value, Error> {
        storage
            .get(name)
            .cloned()
            .ok_or_else(|| Error::malformed(format!("JWK lacks required member `{name}`")))
    };

    // serde_json maps are sorted, so serializing these objects yields the
    // canonical lexicographic member order required by RFC 7638
    let canonical = match key.key_type() {
        "EC" => json!({
            "crv": member("crv")?,
            "kty": "EC",
            "x": member("x")?,
            "y": member("y")?,
        }),
        "OKP" => json!({
            "crv": member("crv")?,
            "kty": "OKP",
            "x": member("x")?,
        }),
        "RSA" => json!({
            "e": member("e")?,
            "kty": "RSA",
            "n": member("n")?,
        }),
        "oct" => json!({
            "k": member("k")?,
            "kty": "oct",
        }),
        other => return Err(Error::malformed(format!("unknown key type `{other}`"))),
    };

    let serialized = serde_json::to_string(&canonical).map_err(Error::malformed)?;
    Ok(base64_url::encode(Sha256::digest(serialized.as_bytes())))
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use crate::JsonWebKey;

    // RFC 7638 section 3.1 example key and thumbprint
    const RFC_KEY: &str = r#"{
        "kty": "RSA",
        "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
        "e": "AQAB",
        "alg": "RS256",
        "kid": "2011-04-29"
    }"#;

    #[test]
    fn matches_rfc_7638_example() {
        let key = JsonWebKey::from_str(RFC_KEY).unwrap();
        assert_eq!(
            key.thumbprint().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }
}
