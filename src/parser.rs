//! Decoding of LIST/LSUB and FETCH response lines
//!
//! Only the two response shapes the usage report relies on are
//! understood; this is not a general IMAP grammar. Lines arrive with
//! the untagged `* LIST` / `* FETCH` prefix already removed, exactly as
//! the [`Transport`](crate::transport::Transport) hands them over:
//!
//! ```text
//! (\HasChildren) "." "INBOX"
//! 1 (UID 100 RFC822.SIZE 2048)
//! ```
//!
//! Both entry points take `None` as the end-of-response terminator and
//! return `Ok(None)` for it.

use crate::attribute::MailboxAttribute;
use crate::error::{Error, Result};
use nom::{
    Finish, IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_till1, take_while},
    character::complete::{anychar, char, digit1, multispace0, multispace1, none_of},
    combinator::{all_consuming, map, map_res, opt, rest, value, verify},
    multi::many1,
    sequence::{delimited, pair, preceded, terminated},
};
use std::collections::BTreeSet;
use std::fmt;

/// One mailbox from a LIST or LSUB response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    pub attributes: BTreeSet<MailboxAttribute>,
    /// Hierarchy delimiter; `None` when the server sent `NIL`.
    pub delimiter: Option<char>,
    pub name: String,
}

impl fmt::Display for MailboxEntry {
    /// Renders the entry in LIST response shape.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{attr}")?;
        }
        f.write_str(") ")?;
        match self.delimiter {
            Some(d @ ('"' | '\\')) => write!(f, "\"\\{d}\"")?,
            Some(d) => write!(f, "\"{d}\"")?,
            None => f.write_str("NIL")?,
        }
        write!(f, " \"{}\"", escape_quoted(&self.name))
    }
}

/// Per-message data from a FETCH response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchRecord {
    pub uid: Option<u32>,
    pub size: Option<u64>,
}

/// Parse one LIST/LSUB line: attributes, delimiter, name.
pub fn parse_mailbox_line(line: Option<&str>) -> Result<Option<MailboxEntry>> {
    let Some(line) = line else {
        return Ok(None);
    };
    mailbox_line(line.trim_end_matches(['\r', '\n']))
        .finish()
        .map(|(_, entry)| Some(entry))
        .map_err(|_| Error::MalformedListResponse(line.to_string()))
}

/// Parse one FETCH line carrying `UID` and/or `RFC822.SIZE`.
pub fn parse_fetch_line(line: Option<&str>) -> Result<Option<FetchRecord>> {
    let Some(line) = line else {
        return Ok(None);
    };
    fetch_line(line)
        .finish()
        .map(|(_, record)| Some(record))
        .map_err(|_| Error::MalformedFetchResponse(line.to_string()))
}

pub(crate) fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn attributes(input: &str) -> IResult<&str, BTreeSet<MailboxAttribute>> {
    map(
        delimited(char('('), take_while(|c| c != ')'), char(')')),
        |raw: &str| raw.split_whitespace().map(MailboxAttribute::from).collect(),
    )(input)
}

fn delimiter(input: &str) -> IResult<&str, Option<char>> {
    alt((
        map(
            delimited(
                char('"'),
                alt((preceded(char('\\'), anychar), none_of("\"\\"))),
                char('"'),
            ),
            Some,
        ),
        value(None, tag_no_case("NIL")),
    ))(input)
}

/// A quoted string; `""` is valid and yields an empty name.
fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\"\\"),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn mailbox_name(input: &str) -> IResult<&str, String> {
    if input.starts_with('"') {
        all_consuming(terminated(quoted, multispace0))(input)
    } else {
        map(verify(rest, |raw: &str| !raw.trim_end().is_empty()), |raw: &str| {
            raw.trim_end().to_string()
        })(input)
    }
}

fn mailbox_line(input: &str) -> IResult<&str, MailboxEntry> {
    let (input, attributes) = terminated(attributes, multispace1)(input)?;
    let (input, delimiter) = terminated(delimiter, multispace1)(input)?;
    let (input, name) = mailbox_name(input)?;
    Ok((
        input,
        MailboxEntry {
            attributes,
            delimiter,
            name,
        },
    ))
}

#[derive(Debug, Clone, Copy)]
enum FetchItem {
    Uid(u32),
    Size(u64),
}

fn fetch_item(input: &str) -> IResult<&str, FetchItem> {
    terminated(
        alt((
            map(
                preceded(
                    pair(tag_no_case("UID"), multispace1),
                    map_res(digit1, str::parse::<u32>),
                ),
                FetchItem::Uid,
            ),
            map(
                preceded(
                    pair(tag_no_case("RFC822.SIZE"), multispace1),
                    map_res(digit1, str::parse::<u64>),
                ),
                FetchItem::Size,
            ),
        )),
        multispace0,
    )(input)
}

fn fetch_line(input: &str) -> IResult<&str, FetchRecord> {
    let (input, _seq) = terminated(take_till1(char::is_whitespace), multispace1)(input)?;
    let (input, items) = delimited(char('('), many1(fetch_item), char(')'))(input)?;
    let record = items
        .into_iter()
        .fold(FetchRecord::default(), |record, item| match item {
            FetchItem::Uid(uid) => FetchRecord {
                uid: Some(uid),
                ..record
            },
            FetchItem::Size(size) => FetchRecord {
                size: Some(size),
                ..record
            },
        });
    Ok((input, record))
}
