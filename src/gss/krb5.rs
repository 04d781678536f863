//! Kerberos contexts backed by the system GSSAPI library.

use super::{GssFailure, GssStatus, SecurityContext, SecurityProvider};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use libgssapi::context::{ClientCtx, CtxFlags, SecurityContext as _};
use libgssapi::name::Name;
use libgssapi::oid::{GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE};
use tracing::debug;

/// Length of the SASL GSSAPI security-layer header (mask + buffer size).
const LAYER_HEADER_LEN: usize = 4;

/// Creates contexts using the default credential cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct Krb5Provider;

impl SecurityProvider for Krb5Provider {
    type Context = Krb5Context;

    fn init(&self, service: &str) -> Result<Krb5Context, GssFailure> {
        let name = Name::new(service.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .and_then(|name| name.canonicalize(Some(&GSS_MECH_KRB5)))
            .map_err(gss_failure)?;
        debug!("Initialised GSSAPI context for {}", service);

        let ctx = ClientCtx::new(
            None,
            name,
            CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_SEQUENCE_FLAG,
            Some(&GSS_MECH_KRB5),
        );
        Ok(Krb5Context {
            ctx: Some(ctx),
            response: None,
        })
    }
}

/// A client context plus the output token of its last operation.
pub struct Krb5Context {
    ctx: Option<ClientCtx>,
    response: Option<String>,
}

impl Krb5Context {
    fn ctx(&mut self) -> Result<&mut ClientCtx, GssFailure> {
        self.ctx
            .as_mut()
            .ok_or_else(|| GssFailure::new("context already cleaned up"))
    }
}

impl SecurityContext for Krb5Context {
    fn step(&mut self, challenge: &str) -> Result<GssStatus, GssFailure> {
        let token = decode(challenge)?;
        let ctx = self.ctx()?;
        let input = (!token.is_empty()).then_some(token.as_slice());
        let output = ctx.step(input, None).map_err(gss_failure)?;
        let status = if ctx.is_complete() {
            GssStatus::Complete
        } else {
            GssStatus::Continue
        };
        self.response = output.map(|buf| STANDARD.encode(&*buf));
        Ok(status)
    }

    fn unwrap(&mut self, challenge: &str) -> Result<GssStatus, GssFailure> {
        let token = decode(challenge)?;
        let plain = self.ctx()?.unwrap(&token).map_err(gss_failure)?;
        self.response = Some(STANDARD.encode(&*plain));
        Ok(GssStatus::Complete)
    }

    fn wrap(&mut self, payload: &str, user: Option<&str>) -> Result<GssStatus, GssFailure> {
        let mut message = decode(payload)?;
        if let Some(user) = user {
            message.resize(LAYER_HEADER_LEN, 0);
            message.extend_from_slice(user.as_bytes());
        }
        let wrapped = self.ctx()?.wrap(false, &message).map_err(gss_failure)?;
        self.response = Some(STANDARD.encode(&*wrapped));
        Ok(GssStatus::Complete)
    }

    fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    fn clean(&mut self) -> Result<GssStatus, GssFailure> {
        self.ctx = None;
        self.response = None;
        Ok(GssStatus::Complete)
    }
}

fn decode(token: &str) -> Result<Vec<u8>, GssFailure> {
    STANDARD
        .decode(token)
        .map_err(|e| GssFailure::new(format!("invalid base64 token: {e}")))
}

#[allow(clippy::needless_pass_by_value)]
fn gss_failure(e: libgssapi::error::Error) -> GssFailure {
    GssFailure::new(e.to_string())
}
