//! IMAP mailbox storage usage
//!
//! Reports how much space each mailbox on an IMAP server occupies: the
//! sum of the `RFC822.SIZE` of its messages and the message count. The
//! session is authenticated with SASL `GSSAPI` (Kerberos), and every
//! mailbox is opened read-only.
//!
//! The pieces can be used on their own:
//!
//! - [`SaslNegotiator`] runs the RFC 4752 exchange over any
//!   [`SecurityProvider`]; `gss::krb5::Krb5Provider` (feature `gssapi`)
//!   backs it with the system GSSAPI library.
//! - [`parse_mailbox_line`] / [`parse_fetch_line`] decode LIST and FETCH
//!   response lines.
//! - [`UsageAggregator`] drives any [`Transport`]; [`ImapTransport`] is
//!   the TLS implementation.
//! - [`UsageClient`] ties it together: connect, authenticate, list,
//!   measure, log out.

mod attribute;
mod batch;
mod client;
mod config;
mod connection;
mod error;
pub mod gss;
mod listing;
mod parser;
pub mod report;
mod sasl;
mod transport;
mod usage;

pub use attribute::MailboxAttribute;
pub use batch::{FETCH_BATCH_SIZE, FetchBatch, FetchBatches};
pub use client::{UsageClient, UsageQuery};
pub use config::{DEFAULT_PORT, DEFAULT_SERVICE, ImapConfig};
pub use connection::{ImapSession, ImapTransport};
pub use error::{Error, Result};
pub use gss::{GssFailure, GssStatus, SecurityContext, SecurityProvider};
pub use listing::{MailboxInfo, MailboxListing};
pub use parser::{FetchRecord, MailboxEntry, parse_fetch_line, parse_mailbox_line};
pub use sasl::{
    GssapiAuthenticator, LAYER_INTEGRITY, LAYER_NONE, LAYER_PRIVACY, LayerOffer,
    NegotiationOutcome, NegotiationState, SaslNegotiator, select_no_protection,
};
pub use transport::{FETCH_SIZE_QUERY, Reply, Status, Transport};
pub use usage::{MailboxUsage, UsageAggregator, UsageRow};
