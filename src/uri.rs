//! URI handling for header parameters and the DPoP `htu` claim.
//!
//! The interesting part here is [`normalize_target_uri`], the RFC 9449
//! rule that turns an HTTP request target into the `htu` claim value.
//! [`Uri`] is the small validated wrapper used by URI-valued header
//! parameters such as `jku` and `x5u`.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{fields::JoseValue, Error};

/// A URI validated through [`fluent_uri`], serializing as its string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri(fluent_uri::Uri<String>);

impl Uri {
    /// The URI text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Turns this URI into the underlying [`fluent_uri::Uri<String>`] for
    /// component-level access.
    pub fn into_inner(self) -> fluent_uri::Uri<String> {
        self.0
    }
}

impl TryFrom<String> for Uri {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        fluent_uri::Uri::parse_from(value)
            .map(Uri)
            .map_err(|(_, e)| Error::malformed(e))
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::try_from(s.to_owned())
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.0.as_str().to_owned()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for Uri {}

impl JoseValue for Uri {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str()?.parse().ok()
    }

    fn into_json(self) -> Value {
        Value::String(self.into())
    }
}

/// Normalizes an HTTP target URI for the DPoP `htu` claim.
///
/// Per RFC 9449 (building on RFC 3986 §6.2.3) the query and fragment are
/// removed and an empty path becomes `/`. Scheme, userinfo, host and port
/// are preserved as given. Invalid or non-absolute URIs yield [`None`].
///
/// The operation is idempotent: normalizing an already normalized URI
/// returns it unchanged.
pub fn normalize_target_uri(uri: &str) -> Option<String> {
    let parsed = fluent_uri::Uri::parse(uri).ok()?;
    if parsed.scheme().is_none() || parsed.authority().is_none() {
        return None;
    }

    // `?` and `#` may only introduce the query and fragment components in
    // a valid URI, so cutting at the first occurrence drops exactly those.
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let mut normalized = uri[..end].to_owned();

    if parsed.path().as_str().is_empty() {
        normalized.push('/');
    }

    Some(normalized)
}
