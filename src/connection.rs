//! IMAP session setup and the async-imap backed [`Transport`]
//!
//! [`ImapTransport::connect`] opens the TLS connection (implicit TLS, or
//! plain TCP upgraded with STARTTLS), authenticates with `GSSAPI`, and
//! then serves the line-oriented command contract on top of
//! async-imap's typed responses.

use crate::attribute::MailboxAttribute;
use crate::batch::FetchBatch;
use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::gss::SecurityProvider;
use crate::parser::{MailboxEntry, escape_quoted};
use crate::sasl::{GssapiAuthenticator, SaslNegotiator};
use crate::transport::{Reply, Status, Transport};
use async_imap::Session;
use async_imap::error::Error as ImapError;
use async_imap::types::{Fetch, Name, NameAttribute};
use futures::{Stream, StreamExt};
use rustls::pki_types::ServerName;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

/// Build a TLS connector.
///
/// Verifies against the webpki root store unless `accept_invalid_certs`
/// is set, in which case any certificate is accepted.
fn tls_connector(accept_invalid_certs: bool) -> TlsConnector {
    let config = if accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };
    TlsConnector::from(Arc::new(config))
}

async fn tls_handshake(
    config: &ImapConfig,
    tcp_stream: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;
    tls_connector(config.accept_invalid_certs)
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))
}

/// Connected, authenticated IMAP session.
pub struct ImapTransport {
    session: ImapSession,
}

impl ImapTransport {
    /// Open a TLS-wrapped IMAP session and authenticate with GSSAPI.
    ///
    /// With `config.starttls` the server greeting is read in plain
    /// text and the connection is upgraded with STARTTLS; otherwise TLS
    /// starts with the first byte and the greeting is read over it.
    pub async fn connect<P: SecurityProvider>(config: &ImapConfig, provider: &P) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        debug!("Connecting to IMAP server at {}", addr);

        let tcp_stream = TcpStream::connect(&addr).await?;

        let client = if config.starttls {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
            let inner = client.into_inner().into_inner();
            async_imap::Client::new(tls_handshake(config, inner).await?.compat())
        } else {
            let mut client =
                async_imap::Client::new(tls_handshake(config, tcp_stream).await?.compat());
            client
                .read_response()
                .await?
                .ok_or_else(|| Error::Imap("Connection closed before greeting".into()))?;
            client
        };
        debug!("TLS established with {}", config.host);

        let service = config.service_principal();
        let negotiator = SaslNegotiator::start(provider, &service, config.username.clone())?;
        let (authenticator, outcome) = GssapiAuthenticator::new(negotiator);

        let session = client
            .authenticate("GSSAPI", authenticator)
            .await
            .map_err(|(e, _)| {
                outcome
                    .take()
                    .unwrap_or_else(|| Error::Imap(format!("GSSAPI authentication failed: {e}")))
            })?;
        if let Some(e) = outcome.take() {
            return Err(e);
        }

        info!("Authenticated to {} as {}", config.host, config.username);
        Ok(Self { session })
    }

    /// Send LOGOUT, ignoring a server that has already gone away.
    pub async fn logout(mut self) {
        if let Err(e) = self.session.logout().await {
            debug!("LOGOUT failed: {}", e);
        }
    }
}

impl Transport for ImapTransport {
    async fn list(&mut self, reference: &str, pattern: &str) -> Result<Reply> {
        let pattern = list_pattern(pattern);
        match self.session.list(Some(reference), Some(pattern.as_ref())).await {
            Ok(names) => collect_names("LIST", names).await,
            Err(e) => failed_reply("LIST", e),
        }
    }

    // async-imap quotes the LSUB pattern itself.
    async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Reply> {
        match self.session.lsub(Some(reference), Some(pattern)).await {
            Ok(names) => collect_names("LSUB", names).await,
            Err(e) => failed_reply("LSUB", e),
        }
    }

    async fn select(&mut self, mailbox: &str, read_only: bool) -> Result<Reply> {
        let selected = if read_only {
            self.session.examine(mailbox).await
        } else {
            self.session.select(mailbox).await
        };
        match selected {
            Ok(mailbox) => Ok(Reply::ok(vec![mailbox.exists.to_string()])),
            Err(e) => failed_reply(if read_only { "EXAMINE" } else { "SELECT" }, e),
        }
    }

    async fn fetch(&mut self, batch: FetchBatch, query: &str) -> Result<Reply> {
        let mut messages = match self.session.fetch(batch.to_string(), query).await {
            Ok(messages) => messages,
            Err(e) => return failed_reply("FETCH", e),
        };

        let mut lines = Vec::with_capacity(batch.len() as usize);
        while let Some(item) = messages.next().await {
            match item {
                Ok(fetch) => lines.push(render_fetch(&fetch)),
                Err(e) => return Ok(Reply::new(failed_status("FETCH", e)?, lines)),
            }
        }
        Ok(Reply::ok(lines))
    }
}

async fn collect_names<S>(command: &str, mut names: S) -> Result<Reply>
where
    S: Stream<Item = async_imap::error::Result<Name>> + Unpin,
{
    let mut lines = Vec::new();
    while let Some(item) = names.next().await {
        match item {
            Ok(name) => lines.push(render_name(&name)),
            Err(e) => return Ok(Reply::new(failed_status(command, e)?, lines)),
        }
    }
    Ok(Reply::ok(lines))
}

/// Map a tagged NO/BAD onto a reply status; anything else is a transport
/// failure.
fn failed_status(command: &str, error: ImapError) -> Result<Status> {
    match error {
        ImapError::No(reason) => {
            debug!("{} rejected: NO {}", command, reason);
            Ok(Status::No)
        }
        ImapError::Bad(reason) => {
            debug!("{} rejected: BAD {}", command, reason);
            Ok(Status::Bad)
        }
        other => Err(Error::Imap(format!("{command} failed: {other}"))),
    }
}

fn failed_reply(command: &str, error: ImapError) -> Result<Reply> {
    failed_status(command, error).map(Reply::failed)
}

/// LIST pattern as sent on the wire, quoted when it is not an atom.
///
/// async-imap passes the LIST pattern through untouched (unlike LSUB).
fn list_pattern(pattern: &str) -> Cow<'_, str> {
    let needs_quotes = pattern.is_empty()
        || pattern.chars().any(|c| {
            !c.is_ascii()
                || c.is_ascii_control()
                || matches!(c, ' ' | '(' | ')' | '{' | '"' | '\\')
        });
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", escape_quoted(pattern)))
    } else {
        Cow::Borrowed(pattern)
    }
}

fn attribute(attr: &NameAttribute<'_>) -> MailboxAttribute {
    match attr {
        NameAttribute::NoSelect => MailboxAttribute::NoSelect,
        NameAttribute::NoInferiors => MailboxAttribute::NoInferiors,
        NameAttribute::Marked => MailboxAttribute::Marked,
        NameAttribute::Unmarked => MailboxAttribute::Unmarked,
        NameAttribute::Extension(label) => MailboxAttribute::from(label.as_ref()),
        // RFC 6154 special-use flags
        other => MailboxAttribute::Other(format!("\\{other:?}")),
    }
}

fn render_name(name: &Name) -> String {
    MailboxEntry {
        attributes: name.attributes().iter().map(attribute).collect(),
        delimiter: name.delimiter().and_then(|d| d.chars().next()),
        name: name.name().to_string(),
    }
    .to_string()
}

fn render_fetch(fetch: &Fetch) -> String {
    let mut items = Vec::with_capacity(2);
    if let Some(uid) = fetch.uid {
        items.push(format!("UID {uid}"));
    }
    if let Some(size) = fetch.size {
        items.push(format!("RFC822.SIZE {size}"));
    }
    format!("{} ({})", fetch.message, items.join(" "))
}

/// Certificate verifier that accepts all certificates
/// (for self-signed test servers).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
