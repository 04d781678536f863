//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing mailbox state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .message(1, 2048)
//!         .messages(120, 1000)
//!     .folder("Archive")
//!         .noselect()
//!     .folder("Lists")
//!         .subscribed()
//!     .build();
//! ```
//!
//! Folder names are full hierarchical names using [`DELIMITER`];
//! `\HasChildren` / `\HasNoChildren` are derived from them.

/// Hierarchy delimiter reported in every LIST response.
pub const DELIMITER: char = '.';

/// A complete mail store: a collection of named folders.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Whether any other folder sits below `name` in the hierarchy.
    pub fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{name}{DELIMITER}");
        self.folders.iter().any(|f| f.name.starts_with(&prefix))
    }
}

/// A single IMAP folder.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    /// Listed with `\Noselect`; EXAMINE is refused.
    pub noselect: bool,
    /// Listed normally, but EXAMINE is refused.
    pub unreadable: bool,
    /// Included in LSUB responses.
    pub subscribed: bool,
    pub messages: Vec<TestMessage>,
}

/// A message as seen by FETCH: only its UID and RFC822 size matter.
#[derive(Debug, Clone, Copy)]
pub struct TestMessage {
    pub uid: u32,
    pub size: u64,
}

/// Builder for constructing a `Mailbox` step by step.
///
/// Call `.folder(name)` to start a new folder; the other methods apply
/// to the most recently added folder.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
        }
    }

    /// Add a new folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            noselect: false,
            unreadable: false,
            subscribed: false,
            messages: Vec::new(),
        });
        self
    }

    pub fn noselect(mut self) -> Self {
        self.current().noselect = true;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.current().unreadable = true;
        self
    }

    pub fn subscribed(mut self) -> Self {
        self.current().subscribed = true;
        self
    }

    /// Add a message to the current folder.
    pub fn message(mut self, uid: u32, size: u64) -> Self {
        self.current().messages.push(TestMessage { uid, size });
        self
    }

    /// Add `count` messages of `size` bytes, with UIDs following the
    /// highest one already in the folder.
    pub fn messages(mut self, count: u32, size: u64) -> Self {
        let folder = self.current();
        let next_uid = folder.messages.iter().map(|m| m.uid).max().unwrap_or(0) + 1;
        folder.messages.extend(
            (next_uid..next_uid + count).map(|uid| TestMessage { uid, size }),
        );
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
        }
    }

    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    fn current(&mut self) -> &mut Folder {
        self.folders
            .last_mut()
            .expect("call .folder() before configuring it")
    }
}
