//! JSON Web Signatures ([RFC 7515]), JSON Web Tokens ([RFC 7519]) and
//! OAuth 2.0 Demonstrating Proof of Possession ([RFC 9449]).
//!
//! The crate is built around three layers:
//!
//! * [`ValueStorage`]: the schema-flexible claim store every JOSE object
//!   is made of, with typed accessors for the registered parameters and
//!   their JOSE-specific encodings.
//! * [`JsonWebSignature`]: the signing and verification engine over the
//!   compact, flattened JSON and general JSON serializations, dispatching
//!   through the process-wide [algorithm registry](jwa) to
//!   [`JsonWebKey`]s (or any custom [`jwk::Signer`] / [`jwk::Verifier`]).
//! * [`dpop`]: the DPoP proof profile: claim schema, target URI
//!   normalization and proof construction/verification.
//!
//! # Example
//!
//! ```
//! use jose_dpop::{dpop::DpopProofBuilder, JsonWebAlgorithm, JsonWebKey};
//!
//! # fn main() -> Result<(), jose_dpop::Error> {
//! let key = JsonWebKey::generate(&JsonWebAlgorithm::Es256)?;
//!
//! let proof = DpopProofBuilder::new("GET", "https://resource.example.org/protected")
//!     .build(&key, &JsonWebAlgorithm::Es256)?;
//!
//! let verified = jose_dpop::dpop::verify_proof(&proof)?;
//! assert_eq!(verified.claims().http_method().as_deref(), Some("GET"));
//! # Ok(())
//! # }
//! ```
//!
//! [RFC 7515]: <https://datatracker.ietf.org/doc/html/rfc7515>
//! [RFC 7519]: <https://datatracker.ietf.org/doc/html/rfc7519>
//! [RFC 9449]: <https://datatracker.ietf.org/doc/html/rfc9449>
#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    explicit_outlives_requirements,
    clippy::missing_errors_doc
)]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    macro_use_extern_crate,
    non_ascii_idents,
    elided_lifetimes_in_paths
)]
#![forbid(unsafe_code)]

pub mod base64_url;
mod claims;
pub mod dpop;
mod error;
pub mod fields;
mod format;
pub mod header;
pub mod jwa;
pub mod jwk;
pub mod jws;
mod jwt;
pub mod storage;
mod uri;

pub use base64_url::Base64UrlString;
pub use claims::{JwtClaims, Parameter};
pub use error::Error;
pub use fields::{LanguageTag, NumericDate, TimeZoneId};
pub use header::JoseHeader;
pub use jwa::JsonWebAlgorithm;
pub use jwk::JsonWebKey;
pub use jws::{JsonWebSignature, Unverified, Verified};
pub use jwt::JsonWebToken;
pub use storage::{preferred_locales, set_preferred_locales, ValueStorage};
pub use uri::{normalize_target_uri, Uri};

/// Type alias to make [`JsonWebSignature`] easier to access.
pub type Jws = JsonWebSignature;

/// Type alias to make [`JsonWebToken`] easier to access.
pub type Jwt = JsonWebToken;

/// Type alias to make [`JsonWebKey`] easier to access.
pub type Jwk = JsonWebKey;
