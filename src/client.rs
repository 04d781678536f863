//! Mailbox usage client

use crate::config::ImapConfig;
use crate::connection::ImapTransport;
use crate::error::Result;
use crate::gss::SecurityProvider;
use crate::usage::{UsageAggregator, UsageRow};
use tracing::info;

/// Which mailboxes a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageQuery {
    /// LIST pattern; `*` and `%` wildcards are expanded by the server.
    pub pattern: String,
    /// Also report every descendant of `pattern`.
    pub recurse: bool,
    /// Use LSUB instead of LIST.
    pub only_subscribed: bool,
}

impl Default for UsageQuery {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            recurse: false,
            only_subscribed: false,
        }
    }
}

impl UsageQuery {
    /// Query for mailboxes matching `pattern`.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    #[must_use]
    pub const fn only_subscribed(mut self, only_subscribed: bool) -> Self {
        self.only_subscribed = only_subscribed;
        self
    }
}

/// Read-only IMAP client reporting per-mailbox storage usage
pub struct UsageClient<P> {
    config: ImapConfig,
    provider: P,
}

impl<P: SecurityProvider> UsageClient<P> {
    /// `provider` supplies the GSSAPI contexts used to authenticate.
    #[must_use]
    pub const fn new(config: ImapConfig, provider: P) -> Self {
        Self { config, provider }
    }

    /// Size and message count of every selectable mailbox the query
    /// matches, in name order.
    ///
    /// Opens a fresh session, and logs out afterwards whether or not
    /// the report succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or authentication fails, or
    /// if a LIST/LSUB or FETCH response cannot be parsed.
    pub async fn report(&self, query: &UsageQuery) -> Result<Vec<UsageRow>> {
        let mut transport = ImapTransport::connect(&self.config, &self.provider).await?;

        let rows = collect(&mut transport, query).await;

        transport.logout().await;
        let rows = rows?;
        info!("Reported usage of {} mailboxes", rows.len());
        Ok(rows)
    }
}

async fn collect(transport: &mut ImapTransport, query: &UsageQuery) -> Result<Vec<UsageRow>> {
    let mut aggregator = UsageAggregator::new(transport);
    let listing = aggregator
        .list_with_optional_recursion(&query.pattern, query.recurse, query.only_subscribed)
        .await?;
    aggregator.report(&listing).await
}
