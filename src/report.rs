//! Fixed-width usage table

use crate::usage::UsageRow;
use std::io::{self, Write};

/// Column titles, aligned with [`format_row`].
pub const HEADER: &str = "Size in KB   #Messages  Mailbox";

/// One table row: size in kilobytes, message count, mailbox name.
#[must_use]
pub fn format_row(row: &UsageRow) -> String {
    format!(
        "{:>10}  {:>10}  {}",
        row.usage.size_kb(),
        row.usage.message_count,
        row.mailbox
    )
}

/// Write `rows` to `out`, preceded by [`HEADER`] when `show_header` is set
/// and there is at least one row.
pub fn write_table<W: Write>(out: &mut W, rows: &[UsageRow], show_header: bool) -> io::Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if i == 0 && show_header {
            writeln!(out, "{HEADER}")?;
        }
        writeln!(out, "{}", format_row(row))?;
    }
    Ok(())
}
