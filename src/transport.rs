//! Line-oriented IMAP command contract
//!
//! The aggregation layer talks to the server only through [`Transport`].
//! Each command returns a [`Reply`]: the completion status plus the
//! untagged response data as raw lines, without the `* LIST ` /
//! `* FETCH ` prefix.

use crate::batch::FetchBatch;
use crate::error::Result;
use std::fmt;

/// Data items requested for every message.
pub const FETCH_SIZE_QUERY: &str = "(UID RFC822.SIZE)";

/// Tagged completion status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
}

impl Status {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        })
    }
}

/// Status and data lines of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub lines: Vec<String>,
}

impl Reply {
    #[must_use]
    pub const fn new(status: Status, lines: Vec<String>) -> Self {
        Self { status, lines }
    }

    #[must_use]
    pub const fn ok(lines: Vec<String>) -> Self {
        Self::new(Status::Ok, lines)
    }

    /// A failed command carrying no data.
    #[must_use]
    pub const fn failed(status: Status) -> Self {
        Self::new(status, Vec::new())
    }

    /// Each data line as `Some`, followed by a single `None` terminator.
    pub fn lines(&self) -> impl Iterator<Item = Option<&str>> {
        self.lines
            .iter()
            .map(|line| Some(line.as_str()))
            .chain(std::iter::once(None))
    }
}

/// The IMAP commands a usage report needs, issued one at a time.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// `LIST reference pattern`
    async fn list(&mut self, reference: &str, pattern: &str) -> Result<Reply>;

    /// `LSUB reference pattern`
    async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Reply>;

    /// `SELECT` (or `EXAMINE` when `read_only`). On success the first
    /// line holds the mailbox's message count.
    async fn select(&mut self, mailbox: &str, read_only: bool) -> Result<Reply>;

    /// `FETCH low:high query`
    async fn fetch(&mut self, batch: FetchBatch, query: &str) -> Result<Reply>;
}
