#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Show mail storage used by messages in IMAP mailboxes

use clap::{ArgAction, Parser};
use mailusage::gss::krb5::Krb5Provider;
use mailusage::{ImapConfig, UsageClient, UsageQuery, report};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailusage")]
#[command(about = "Show mail storage used by messages in IMAP mailboxes")]
#[command(disable_help_flag = true)]
struct Args {
    /// Query HOST instead of IMAP_HOST
    #[arg(short = 'h', value_name = "HOST")]
    host: Option<String>,

    /// Connect to PORT instead of IMAP_PORT
    #[arg(short = 'p', value_name = "PORT")]
    port: Option<u16>,

    /// Query MAILBOX only (default is all)
    #[arg(short = 'm', value_name = "MAILBOX", default_value = "*")]
    mailbox: String,

    /// Suppress the header line
    #[arg(short = 'n')]
    no_header: bool,

    /// Query recursively for all mailbox descendants
    #[arg(short = 'r')]
    recurse: bool,

    /// Display only subscribed mailboxes
    #[arg(short = 's')]
    only_subscribed: bool,

    /// Turn on debugging
    #[arg(short = 'd')]
    debug: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let filter = if args.debug {
        EnvFilter::new("mailusage=trace")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ImapConfig::from_env(args.host.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let query = UsageQuery::new(args.mailbox)
        .recurse(args.recurse)
        .only_subscribed(args.only_subscribed);
    let client = UsageClient::new(config, Krb5Provider);
    let rows = client.report(&query).await?;

    let mut stdout = std::io::stdout().lock();
    report::write_table(&mut stdout, &rows, !args.no_header)?;
    stdout.flush()?;

    Ok(())
}
