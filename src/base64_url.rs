//! Helpers for base64 urlsafe encoded stuff

use core::{fmt, str::FromStr};

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::Error;

/// An owned string that is guaranteed to be valid unpadded base64url
/// (RFC 4648 §5, alphabet `A-Za-z0-9-_`).
///
/// JWS cares about the exact textual form of its base64url segments: the
/// signing input is rebuilt from the *original* characters, never from
/// re-encoded JSON. This type preserves that wire text while still giving
/// access to the decoded bytes.
///
/// The empty string is valid and decodes to no bytes. It shows up as the
/// signature segment of unsecured (`alg: none`) JWSs and as an absent
/// protected header in the JSON serializations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64UrlString(String);

impl Base64UrlString {
    /// Encodes the given bytes, without padding.
    pub fn encode(data: impl AsRef<[u8]>) -> Self {
        Base64UrlString(Base64UrlUnpadded::encode_string(data.as_ref()))
    }

    /// Decodes this string back into raw bytes.
    pub fn decode(&self) -> Vec<u8> {
        Base64UrlUnpadded::decode_vec(&self.0).expect("validated at construction")
    }

    /// The base64url text itself.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64url text as ASCII bytes, as used in JWS signing input.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Whether this is the empty segment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Base64UrlString {
    type Err = Error;

    /// Accepts input whose padding was stripped; rejects `=` padding itself,
    /// characters outside the urlsafe alphabet and impossible lengths.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Base64UrlUnpadded::decode_vec(s)
            .map_err(|_| Error::malformed("invalid base64url string"))?;
        Ok(Base64UrlString(s.to_owned()))
    }
}

impl fmt::Display for Base64UrlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Base64UrlString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Base64UrlString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Base64UrlString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| D::Error::custom("encountered invalid base64url string"))
    }
}

/// Decodes a base64url string into bytes, rejecting invalid characters and
/// tolerating stripped padding.
///
/// # Errors
///
/// [`Error::MalformedInput`] for anything outside the unpadded urlsafe
/// alphabet.
pub fn decode(s: &str) -> Result<Vec<u8>, Error> {
    Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::malformed("invalid base64url string"))
}

/// Encodes bytes as unpadded base64url text.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    Base64UrlUnpadded::encode_string(data.as_ref())
}
