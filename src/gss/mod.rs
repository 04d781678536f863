//! GSSAPI security-context contract
//!
//! The SASL negotiator never talks to a Kerberos library directly. It
//! drives a [`SecurityContext`] obtained from a [`SecurityProvider`];
//! every token crossing this boundary is base64 text, the same shape
//! the tokens have on the IMAP wire.
//!
//! With the `gssapi` feature, [`krb5::Krb5Provider`] supplies contexts
//! backed by the system GSSAPI library.

#[cfg(feature = "gssapi")]
pub mod krb5;

use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::warn;

/// Result of a context operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GssStatus {
    /// More tokens must be exchanged.
    Continue,
    /// The operation is finished.
    Complete,
}

/// A context operation returned something other than continue/complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct GssFailure {
    pub message: String,
}

impl GssFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One in-progress or established GSSAPI security context.
///
/// Each operation stores its output token, retrievable with
/// [`SecurityContext::response`] until the next operation.
pub trait SecurityContext {
    /// Feed a server token (base64, empty for the first call) into
    /// context establishment.
    fn step(&mut self, challenge: &str) -> Result<GssStatus, GssFailure>;

    /// Unwrap a protected server message (base64).
    fn unwrap(&mut self, challenge: &str) -> Result<GssStatus, GssFailure>;

    /// Wrap `payload` (base64) for the server. When `user` is given it
    /// is appended to the four-byte security-layer header as the
    /// authorization identity.
    fn wrap(&mut self, payload: &str, user: Option<&str>) -> Result<GssStatus, GssFailure>;

    /// Output token of the last operation, base64-encoded.
    fn response(&self) -> Option<&str>;

    /// Release the context.
    fn clean(&mut self) -> Result<GssStatus, GssFailure>;
}

/// Source of fresh security contexts.
pub trait SecurityProvider {
    type Context: SecurityContext;

    /// Create a client context for a host-based service name such as
    /// `imap@mail.example.com`.
    fn init(&self, service: &str) -> Result<Self::Context, GssFailure>;
}

/// Owns a context and cleans it up when dropped.
pub struct ContextGuard<C: SecurityContext> {
    context: C,
}

impl<C: SecurityContext> ContextGuard<C> {
    pub const fn new(context: C) -> Self {
        Self { context }
    }
}

impl<C: SecurityContext> Deref for ContextGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.context
    }
}

impl<C: SecurityContext> DerefMut for ContextGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<C: SecurityContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.context.clean() {
            warn!("Failed to clean up GSSAPI context: {}", e);
        }
    }
}
