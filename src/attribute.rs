//! Mailbox name attributes
//!
//! Provides a strongly-typed enum for the attributes a LIST or LSUB
//! response attaches to a mailbox name. Well-known attributes are
//! matched case-insensitively; anything else is kept verbatim.

use std::fmt;

/// A mailbox name attribute.
///
/// # Examples
///
/// ```
/// use mailusage::MailboxAttribute;
///
/// let attr = MailboxAttribute::from("\\NOSELECT");
/// assert_eq!(attr, MailboxAttribute::NoSelect);
/// assert_eq!(attr.as_imap_str(), "\\Noselect");
///
/// let other = MailboxAttribute::from("\\Sent");
/// assert_eq!(other.as_imap_str(), "\\Sent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MailboxAttribute {
    /// The name cannot be selected (`\Noselect`).
    NoSelect,
    /// The name can never have children (`\Noinferiors`).
    NoInferiors,
    /// Marked as interesting by the server (`\Marked`).
    Marked,
    /// No new messages since last selected (`\Unmarked`).
    Unmarked,
    /// Has child mailboxes (`\HasChildren`).
    HasChildren,
    /// Has no child mailboxes (`\HasNoChildren`).
    HasNoChildren,
    /// Any other attribute, as sent by the server.
    Other(String),
}

impl MailboxAttribute {
    /// The IMAP wire representation of this attribute.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::NoSelect => "\\Noselect",
            Self::NoInferiors => "\\Noinferiors",
            Self::Marked => "\\Marked",
            Self::Unmarked => "\\Unmarked",
            Self::HasChildren => "\\HasChildren",
            Self::HasNoChildren => "\\HasNoChildren",
            Self::Other(attr) => attr,
        }
    }
}

impl fmt::Display for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl From<&str> for MailboxAttribute {
    fn from(s: &str) -> Self {
        const KNOWN: [MailboxAttribute; 6] = [
            MailboxAttribute::NoSelect,
            MailboxAttribute::NoInferiors,
            MailboxAttribute::Marked,
            MailboxAttribute::Unmarked,
            MailboxAttribute::HasChildren,
            MailboxAttribute::HasNoChildren,
        ];
        KNOWN
            .into_iter()
            .find(|known| known.as_imap_str().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| Self::Other(s.to_string()))
    }
}
