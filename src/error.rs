//! The error type shared by every fallible operation of this crate.

use thiserror::Error;

/// Errors produced while decoding, signing or verifying JOSE structures.
///
/// Coercion failures inside [`ValueStorage`](crate::ValueStorage) accessors
/// are deliberately *not* represented here. A typed read that cannot coerce
/// its raw value simply returns [`None`], because an unreadable claim is
/// not an error condition for the storage layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input bytes could not be parsed as any recognized JWS
    /// serialization, JOSE object or JSON Web Key.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Neither the protected nor the unprotected header carries an `alg`
    /// parameter.
    #[error("no algorithm in protected or unprotected header")]
    AlgorithmMissing,

    /// The `alg` value has no entry in the algorithm registry.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// None of the supplied keys matches the required algorithm and key id.
    #[error("no key matches algorithm `{algorithm}` (kid: {key_id:?})")]
    KeyNotFound {
        /// The algorithm the signature slot requires.
        algorithm: String,
        /// The `kid` from the header, if any.
        key_id: Option<String>,
    },

    /// The requested operation is refused, independently of the supplied
    /// keys. Verifying a JWS whose `alg` is `none` always ends up here.
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(&'static str),

    /// A signature did not verify, or the JWS carries no signature at all.
    #[error("signature verification failed")]
    AuthenticationFailure,

    /// The key cannot handle the requested algorithm.
    #[error("key does not support algorithm `{0}`")]
    Unsupported(String),
}

impl Error {
    /// Builds a [`Error::MalformedInput`] from any displayable reason.
    pub(crate) fn malformed(reason: impl core::fmt::Display) -> Self {
        Error::MalformedInput(reason.to_string())
    }
}
