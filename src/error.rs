//! Error types for mailusage

use crate::gss::GssFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GSSAPI context initialisation failed: {0}")]
    SecurityInit(#[source] GssFailure),

    #[error("GSSAPI context step failed: {0}")]
    SecurityStep(#[source] GssFailure),

    #[error("GSSAPI unwrap failed: {0}")]
    SecurityUnwrap(#[source] GssFailure),

    #[error("GSSAPI wrap failed: {0}")]
    SecurityWrap(#[source] GssFailure),

    #[error("SASL negotiation invoked in unexpected state: {0}")]
    UnexpectedState(String),

    #[error("Malformed LIST/LSUB response: {0:?}")]
    MalformedListResponse(String),

    #[error("Malformed FETCH response: {0:?}")]
    MalformedFetchResponse(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Base64 decoding error: {0}")]
    Encoding(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
