//! The three serialization forms of a JWS (RFC 7515 sections 3.1, 7.1
//! and 7.2): compact, flattened JSON and general JSON.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Base64UrlString, Error};

/// The three base64url segments of the compact serialization,
/// `protected.payload.signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompactParts {
    pub(crate) protected: Base64UrlString,
    pub(crate) payload: Base64UrlString,
    pub(crate) signature: Base64UrlString,
}

impl FromStr for CompactParts {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split('.');
        let (Some(protected), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(Error::malformed(
                "compact serialization must have exactly three segments",
            ));
        };

        Ok(CompactParts {
            protected: protected.parse()?,
            payload: payload.parse()?,
            signature: signature.parse()?,
        })
    }
}

impl fmt::Display for CompactParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.protected, self.payload, self.signature)
    }
}

/// The flattened JSON serialization: a single signature inlined into the
/// top-level object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JsonFlattened {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) protected: Option<Base64UrlString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) header: Option<Map<String, Value>>,
    pub(crate) payload: Base64UrlString,
    pub(crate) signature: Base64UrlString,
}

/// The general JSON serialization: any number of signatures over one
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JsonGeneral {
    pub(crate) payload: Base64UrlString,
    pub(crate) signatures: Vec<JsonSignature>,
}

/// One element of the `signatures` array of the general form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JsonSignature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) protected: Option<Base64UrlString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) header: Option<Map<String, Value>>,
    pub(crate) signature: Base64UrlString,
}

/// The serialization form detected from the leading bytes of an input:
/// `ey` opens a compact form (a base64url-encoded `{"` ...), `{` a JSON
/// form. Anything else is not a JWS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DetectedForm {
    Compact,
    Json,
}

pub(crate) fn detect(input: &str) -> Result<DetectedForm, Error> {
    if input.starts_with("ey") {
        Ok(DetectedForm::Compact)
    } else if input.starts_with('{') {
        Ok(DetectedForm::Json)
    } else {
        Err(Error::malformed(
            "input starts with neither a base64url JOSE header nor a JSON object",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_split_requires_three_segments() {
        assert!("a.b".parse::<CompactParts>().is_err());
        assert!("a.b.c.d".parse::<CompactParts>().is_err());

        let parts: CompactParts = "eyJhbGciOiJub25lIn0.YWJj.".parse().unwrap();
        assert!(parts.signature.is_empty());
        assert_eq!(parts.to_string(), "eyJhbGciOiJub25lIn0.YWJj.");
    }

    #[test]
    fn form_detection() {
        assert_eq!(detect("eyJhbGc...").unwrap(), DetectedForm::Compact);
        assert_eq!(detect(r#"{"payload":""}"#).unwrap(), DetectedForm::Json);
        assert!(detect("!!").is_err());
    }
}
