//! SASL GSSAPI negotiation (RFC 4752)
//!
//! [`SaslNegotiator`] turns one base64 server challenge into one base64
//! client response per call. The exchange has two phases: first the
//! security context is established with repeated `step` calls, then a
//! single round agrees on the security layer. The layer is always
//! "no protection": the server's offer is read for diagnostics only.
//!
//! [`GssapiAuthenticator`] plugs the negotiator into async-imap's
//! `AUTHENTICATE` loop.

use crate::error::{Error, Result};
use crate::gss::{ContextGuard, GssStatus, SecurityContext, SecurityProvider};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Security-layer bit: no protection.
pub const LAYER_NONE: u8 = 1;
/// Security-layer bit: integrity protection.
pub const LAYER_INTEGRITY: u8 = 2;
/// Security-layer bit: confidentiality protection.
pub const LAYER_PRIVACY: u8 = 4;

/// Phase of a negotiation. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    ContextNegotiation,
    LayerNegotiation,
    Complete,
}

/// Security-layer offer decoded from the server's unwrapped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerOffer {
    pub mask: u8,
    pub max_buffer: u32,
}

impl LayerOffer {
    /// Decode the four-byte header; `None` if the message is shorter.
    #[must_use]
    pub fn parse(message: &[u8]) -> Option<Self> {
        match *message {
            [mask, b1, b2, b3, ..] => Some(Self {
                mask,
                max_buffer: u32::from_be_bytes([0, b1, b2, b3]),
            }),
            _ => None,
        }
    }
}

/// Build the client's layer message from the server's: the mask byte is
/// forced to [`LAYER_NONE`], everything after it is copied unchanged.
#[must_use]
pub fn select_no_protection(unwrapped: &[u8]) -> Vec<u8> {
    let mut selection = Vec::with_capacity(unwrapped.len().max(1));
    selection.push(LAYER_NONE);
    selection.extend_from_slice(unwrapped.get(1..).unwrap_or_default());
    selection
}

/// Drives one GSSAPI authentication attempt.
///
/// The context is owned for the negotiator's whole lifetime and cleaned
/// up when the negotiator is dropped, whatever the outcome.
pub struct SaslNegotiator<C: SecurityContext> {
    context: ContextGuard<C>,
    username: String,
    state: NegotiationState,
}

impl<C: SecurityContext> SaslNegotiator<C> {
    /// Acquire a context for `service` (e.g. `imap@mail.example.com`).
    pub fn start<P>(provider: &P, service: &str, username: impl Into<String>) -> Result<Self>
    where
        P: SecurityProvider<Context = C>,
    {
        let context = provider.init(service).map_err(Error::SecurityInit)?;
        Ok(Self {
            context: ContextGuard::new(context),
            username: username.into(),
            state: NegotiationState::ContextNegotiation,
        })
    }

    #[must_use]
    pub const fn state(&self) -> NegotiationState {
        self.state
    }

    /// Answer one server challenge.
    pub fn respond(&mut self, challenge: &str) -> Result<String> {
        let (payload, next) = match self.state {
            NegotiationState::ContextNegotiation => self.negotiate_context(challenge)?,
            NegotiationState::LayerNegotiation => self.negotiate_layer(challenge)?,
            NegotiationState::Complete => {
                return Err(Error::UnexpectedState(
                    "negotiation already complete".to_string(),
                ));
            }
        };
        if next != self.state {
            debug!("SASL negotiation {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        Ok(payload)
    }

    fn negotiate_context(&mut self, challenge: &str) -> Result<(String, NegotiationState)> {
        let status = self.context.step(challenge).map_err(Error::SecurityStep)?;
        let next = match status {
            GssStatus::Complete => NegotiationState::LayerNegotiation,
            GssStatus::Continue => NegotiationState::ContextNegotiation,
        };
        Ok((self.take_response(), next))
    }

    fn negotiate_layer(&mut self, challenge: &str) -> Result<(String, NegotiationState)> {
        self.context.unwrap(challenge).map_err(Error::SecurityUnwrap)?;
        let unwrapped = STANDARD.decode(self.take_response())?;

        match LayerOffer::parse(&unwrapped) {
            Some(offer) => debug!(
                "Server offers security layers {:#04x}, max buffer {}; selecting none",
                offer.mask, offer.max_buffer
            ),
            None => warn!(
                "Security layer message is {} bytes, expected at least 4",
                unwrapped.len()
            ),
        }

        let selection = STANDARD.encode(select_no_protection(&unwrapped));
        self.context
            .wrap(&selection, Some(self.username.as_str()))
            .map_err(Error::SecurityWrap)?;
        Ok((self.take_response(), NegotiationState::Complete))
    }

    fn take_response(&self) -> String {
        self.context.response().unwrap_or_default().to_string()
    }
}

/// Shared slot for a failure raised inside the authenticator, which
/// async-imap gives no way to return.
#[derive(Debug, Clone, Default)]
pub struct NegotiationOutcome(Arc<Mutex<Option<Error>>>);

impl NegotiationOutcome {
    fn record(&self, error: Error) {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert(error);
        }
    }

    /// The first failure recorded during the exchange, if any.
    #[must_use]
    pub fn take(&self) -> Option<Error> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// `AUTHENTICATE GSSAPI` callback for async-imap.
///
/// async-imap hands over decoded challenge bytes and encodes whatever is
/// returned; the negotiator speaks base64, so tokens are re-encoded on
/// the way in and decoded on the way out. On failure an empty response
/// is sent and the error is left in the [`NegotiationOutcome`].
pub struct GssapiAuthenticator<C: SecurityContext> {
    negotiator: SaslNegotiator<C>,
    outcome: NegotiationOutcome,
}

impl<C: SecurityContext> GssapiAuthenticator<C> {
    #[must_use]
    pub fn new(negotiator: SaslNegotiator<C>) -> (Self, NegotiationOutcome) {
        let outcome = NegotiationOutcome::default();
        (
            Self {
                negotiator,
                outcome: outcome.clone(),
            },
            outcome,
        )
    }

    fn answer(&mut self, challenge: &[u8]) -> Result<Vec<u8>> {
        let response = self.negotiator.respond(&STANDARD.encode(challenge))?;
        Ok(STANDARD.decode(response)?)
    }
}

impl<C: SecurityContext> async_imap::Authenticator for GssapiAuthenticator<C> {
    type Response = Vec<u8>;

    fn process(&mut self, challenge: &[u8]) -> Self::Response {
        self.answer(challenge).unwrap_or_else(|e| {
            warn!("GSSAPI negotiation failed: {}", e);
            self.outcome.record(e);
            Vec::new()
        })
    }
}
