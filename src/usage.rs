//! Mailbox listing and size aggregation over a [`Transport`]

use crate::batch::{FETCH_BATCH_SIZE, FetchBatches};
use crate::error::{Error, Result};
use crate::listing::MailboxListing;
use crate::parser::{parse_fetch_line, parse_mailbox_line};
use crate::transport::{FETCH_SIZE_QUERY, Reply, Transport};
use tracing::{debug, trace, warn};

/// Storage used by one mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxUsage {
    /// Sum of RFC822 sizes in bytes.
    pub total_size: u64,
    /// Messages reported at SELECT time.
    pub message_count: u32,
}

impl MailboxUsage {
    /// Size rounded up to whole kilobytes.
    #[must_use]
    pub const fn size_kb(&self) -> u64 {
        self.total_size.div_ceil(1024)
    }
}

/// One line of a usage report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub mailbox: String,
    pub usage: MailboxUsage,
}

/// Issues listing and fetch commands and folds the parsed results.
pub struct UsageAggregator<'a, T> {
    transport: &'a mut T,
    batch_size: u32,
}

impl<'a, T: Transport> UsageAggregator<'a, T> {
    pub const fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            batch_size: FETCH_BATCH_SIZE,
        }
    }

    /// Override the number of messages per FETCH.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size;
        self
    }

    /// LIST (or LSUB when `only_subscribed`) and parse every line.
    pub async fn list_mailboxes(
        &mut self,
        reference: &str,
        pattern: &str,
        only_subscribed: bool,
    ) -> Result<MailboxListing> {
        let (command, reply) = if only_subscribed {
            ("LSUB", self.transport.lsub(reference, pattern).await?)
        } else {
            ("LIST", self.transport.list(reference, pattern).await?)
        };
        if !reply.status.is_ok() {
            warn!("{} {:?} {:?} returned {}", command, reference, pattern, reply.status);
        }

        let mut listing = MailboxListing::new();
        for line in reply.lines() {
            trace!("{}: {:?}", command, line);
            match parse_mailbox_line(line)? {
                Some(entry) => listing.insert(entry),
                None => break,
            }
        }
        debug!("{} {:?} matched {} mailboxes", command, pattern, listing.len());
        Ok(listing)
    }

    /// Total size and message count of `mailbox`.
    ///
    /// A mailbox that cannot be selected counts as empty.
    pub async fn compute_usage(&mut self, mailbox: &str) -> Result<MailboxUsage> {
        let reply = self.transport.select(mailbox, true).await?;
        if !reply.status.is_ok() {
            debug!("Cannot select {:?} ({}); reporting it empty", mailbox, reply.status);
            return Ok(MailboxUsage::default());
        }
        let message_count = message_count(&reply)?;

        let mut total_size = 0;
        for batch in FetchBatches::new(message_count, self.batch_size) {
            let reply = self.transport.fetch(batch, FETCH_SIZE_QUERY).await?;
            for line in reply.lines() {
                trace!("FETCH {}: {:?}", batch, line);
                match parse_fetch_line(line)? {
                    Some(record) => total_size += record.size.unwrap_or(0),
                    None => break,
                }
            }
        }

        debug!(
            "{:?}: {} messages, {} bytes",
            mailbox, message_count, total_size
        );
        Ok(MailboxUsage {
            total_size,
            message_count,
        })
    }

    /// List `pattern`, plus all its descendants when `recurse` is set.
    ///
    /// Descendants are listed with `pattern + delimiter + "*"` only when
    /// the pattern has no trailing wildcard and the first listing gave
    /// it a delimiter.
    pub async fn list_with_optional_recursion(
        &mut self,
        pattern: &str,
        recurse: bool,
        only_subscribed: bool,
    ) -> Result<MailboxListing> {
        let mut listing = self.list_mailboxes("", pattern, only_subscribed).await?;
        if !recurse || pattern.ends_with('*') {
            return Ok(listing);
        }

        match listing.get(pattern).and_then(|info| info.delimiter) {
            Some(delimiter) => {
                let descendants = format!("{pattern}{delimiter}*");
                let children = self
                    .list_mailboxes("", &descendants, only_subscribed)
                    .await?;
                listing.merge(children);
            }
            None => debug!("No delimiter known for {:?}; not recursing", pattern),
        }
        Ok(listing)
    }

    /// Usage of every selectable mailbox in `listing`, in name order.
    pub async fn report(&mut self, listing: &MailboxListing) -> Result<Vec<UsageRow>> {
        let mut rows = Vec::new();
        for mailbox in listing.selectable() {
            let usage = self.compute_usage(mailbox).await?;
            rows.push(UsageRow {
                mailbox: mailbox.to_string(),
                usage,
            });
        }
        Ok(rows)
    }
}

fn message_count(reply: &Reply) -> Result<u32> {
    let line = reply
        .lines
        .first()
        .ok_or_else(|| Error::Imap("SELECT returned no message count".into()))?;
    line.trim()
        .parse()
        .map_err(|e| Error::Imap(format!("Invalid message count {line:?}: {e}")))
}
