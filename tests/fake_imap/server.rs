//! In-process fake IMAP server for integration testing
//!
//! ## Connection lifecycle
//!
//! ```text
//!   Client connects via TCP
//!       |
//!   STARTTLS mode:  greeting, STARTTLS, TLS handshake
//!   implicit mode:  TLS handshake, greeting over TLS
//!       |
//!   AUTHENTICATE GSSAPI (see `kerberos`)
//!       |
//!   LIST / LSUB / EXAMINE / FETCH
//!       |
//!   LOGOUT
//! ```
//!
//! Every command line the client sends is recorded (without its tag)
//! so tests can assert on exactly what went over the wire, e.g. the
//! FETCH ranges used for a large folder.

use super::handlers::{
    handle_authenticate, handle_examine, handle_fetch, handle_list, handle_logout,
};
use super::io::{read_line, write_line};
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::{ListMailbox, Mailbox as ImapMailbox};
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const GREETING: &str = "* OK IMAP4rev1 Fake server ready\r\n";

/// How the connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain greeting, then STARTTLS.
    StartTls,
    /// TLS from the first byte (port 993 style).
    Implicit,
}

/// Server behaviour knobs.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub tls: TlsMode,
    /// Security layers offered during AUTHENTICATE.
    pub offered_layers: u8,
    /// Answer AUTHENTICATE with NO even when the exchange is valid.
    pub reject_auth: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            tls: TlsMode::StartTls,
            offered_layers: 0x07,
            reject_auth: false,
        }
    }
}

/// What the server observed across all connections.
#[derive(Debug, Default)]
pub struct Journal {
    /// Command lines without their tag, e.g. `FETCH 1:50 (UID RFC822.SIZE)`.
    pub commands: Vec<String>,
    /// `(service principal, authorization identity)` per successful
    /// AUTHENTICATE.
    pub authorized: Vec<(String, String)>,
}

/// A fake IMAP server that runs on localhost with an OS-assigned port.
///
/// The server generates a self-signed TLS certificate at startup using
/// `rcgen`, so no cert files are needed.
pub struct FakeImapServer {
    port: u16,
    journal: Arc<Mutex<Journal>>,
    /// Handle to the background task so it lives as long as the server.
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a STARTTLS server with default options.
    pub async fn start(mailbox: Mailbox) -> Self {
        Self::start_with(mailbox, ServerOptions::default()).await
    }

    /// Start a server on `127.0.0.1:0`. It runs until the
    /// `FakeImapServer` is dropped.
    pub async fn start_with(mailbox: Mailbox, options: ServerOptions) -> Self {
        // Multiple tests may race to install the provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));
        let mailbox = Arc::new(mailbox);
        let journal = Arc::new(Mutex::new(Journal::default()));

        let server_journal = journal.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let acceptor = acceptor.clone();
                let mailbox = mailbox.clone();
                let journal = server_journal.clone();
                tokio::spawn(async move {
                    handle_connection(stream, acceptor, options, &mailbox, &journal).await;
                });
            }
        });

        Self {
            port,
            journal,
            _handle: handle,
        }
    }

    /// The port the server is listening on.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.journal.lock().unwrap().commands.clone()
    }

    /// Commands starting with `verb`, e.g. `"FETCH"`.
    pub fn commands_named(&self, verb: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(verb))
            .collect()
    }

    pub fn authorized(&self) -> Vec<(String, String)> {
        self.journal.lock().unwrap().authorized.clone()
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    acceptor: TlsAcceptor,
    options: ServerOptions,
    mailbox: &Mailbox,
    journal: &Mutex<Journal>,
) {
    match options.tls {
        TlsMode::Implicit => {
            let Ok(tls_stream) = acceptor.accept(stream).await else {
                return;
            };
            let mut reader = BufReader::new(tls_stream);
            if write_line(&mut reader, GREETING).await.is_err() {
                return;
            }
            handle_imap_session(reader, options, mailbox, journal).await;
        }
        TlsMode::StartTls => {
            let mut reader = BufReader::new(stream);
            if write_line(&mut reader, GREETING).await.is_err() {
                return;
            }

            let Some(line) = read_line(&mut reader).await else {
                return;
            };
            let Some((tag, command)) = line.split_once(' ') else {
                return;
            };
            if !command.eq_ignore_ascii_case("STARTTLS") {
                let _ = write_line(&mut reader, &format!("{tag} BAD Expected STARTTLS\r\n")).await;
                return;
            }
            let resp = format!("{tag} OK Begin TLS negotiation now\r\n");
            if write_line(&mut reader, &resp).await.is_err() {
                return;
            }

            let tcp = reader.into_inner();
            let Ok(tls_stream) = acceptor.accept(tcp).await else {
                return;
            };
            handle_imap_session(BufReader::new(tls_stream), options, mailbox, journal).await;
        }
    }
}

/// Extract the folder name from a parsed `imap_types::Mailbox`.
fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn list_pattern(pattern: &ListMailbox<'_>) -> String {
    let bytes: &[u8] = match pattern {
        ListMailbox::Token(token) => token.as_ref(),
        ListMailbox::String(string) => string.as_ref(),
    };
    String::from_utf8_lossy(bytes).into_owned()
}

/// Run the IMAP command loop over an established stream.
///
/// Uses `imap-codec`'s `CommandCodec` to parse each client command
/// into a strongly-typed `Command`, then dispatches on its body.
async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    mut reader: BufReader<S>,
    options: ServerOptions,
    mailbox: &Mailbox,
    journal: &Mutex<Journal>,
) {
    let mut authenticated = false;
    let mut selected_folder: Option<String> = None;
    let codec = CommandCodec::default();

    loop {
        let Some(line) = read_line(&mut reader).await else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let with_crlf = format!("{line}\r\n");
        let Ok((_, command)) = codec.decode(with_crlf.as_bytes()) else {
            let tag = line.split_whitespace().next().unwrap_or("*");
            if write_line(&mut reader, &format!("{tag} BAD Parse error\r\n"))
                .await
                .is_err()
            {
                break;
            }
            continue;
        };

        if let Some((_, untagged)) = line.split_once(' ') {
            journal.lock().unwrap().commands.push(untagged.to_string());
        }
        let tag = command.tag.inner();

        match command.body {
            CommandBody::Authenticate { .. } => {
                let authorization = handle_authenticate(tag, options, &mut reader).await;
                if let Some(authorization) = authorization {
                    journal.lock().unwrap().authorized.push(authorization);
                    authenticated = true;
                }
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ if !authenticated => {
                let resp = format!("{tag} NO Not authenticated\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
            CommandBody::List {
                mailbox_wildcard, ..
            } => {
                let pattern = list_pattern(&mailbox_wildcard);
                handle_list(tag, "LIST", &pattern, false, mailbox, &mut reader).await;
            }
            CommandBody::Lsub {
                mailbox_wildcard, ..
            } => {
                let pattern = list_pattern(&mailbox_wildcard);
                handle_list(tag, "LSUB", &pattern, true, mailbox, &mut reader).await;
            }
            CommandBody::Examine { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selected_folder = handle_examine(tag, &name, mailbox, &mut reader).await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: false,
                ..
            } => {
                handle_fetch(
                    tag,
                    &sequence_set,
                    mailbox,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}
