//! The set of mailboxes a usage report covers

use crate::attribute::MailboxAttribute;
use crate::parser::MailboxEntry;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

/// Attributes and hierarchy delimiter of one listed mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailboxInfo {
    pub attributes: BTreeSet<MailboxAttribute>,
    pub delimiter: Option<char>,
}

impl MailboxInfo {
    /// Whether the server marked the name `\Noselect`.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&MailboxAttribute::NoSelect)
    }
}

/// Mailbox name to [`MailboxInfo`], iterated in name order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailboxListing {
    entries: BTreeMap<String, MailboxInfo>,
}

impl MailboxListing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any earlier one with the same name.
    pub fn insert(&mut self, entry: MailboxEntry) {
        self.entries.insert(
            entry.name,
            MailboxInfo {
                attributes: entry.attributes,
                delimiter: entry.delimiter,
            },
        );
    }

    /// Fold `other` into this listing; its entries win on collision.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MailboxInfo> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MailboxInfo> {
        self.entries.iter()
    }

    /// Names that can be selected, in lexicographic order.
    pub fn selectable(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, info)| info.is_selectable())
            .map(|(name, _)| name.as_str())
    }
}

impl FromIterator<MailboxEntry> for MailboxListing {
    fn from_iter<I: IntoIterator<Item = MailboxEntry>>(iter: I) -> Self {
        let mut listing = Self::new();
        for entry in iter {
            listing.insert(entry);
        }
        listing
    }
}

impl<'a> IntoIterator for &'a MailboxListing {
    type Item = (&'a String, &'a MailboxInfo);
    type IntoIter = btree_map::Iter<'a, String, MailboxInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
