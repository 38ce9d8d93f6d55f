//! Legacy timestamp ledger.
//!
//! Older exports left a sidecar file in each directory recording when every
//! file was last written, one `relative/path.md:unix_seconds` pair per line.
//! The disk scanner consults it when the file store reports no modification
//! time of its own.

/// Marker identifying a ledger file in a directory listing.
pub const LEDGER_MARKER: &str = "jsTimestamps.txt";

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub file: String,
    /// `None` when the value after the colon is not an integer.
    pub timestamp: Option<i64>,
}

/// Parsed ledger contents, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Parse ledger text.
    ///
    /// Lines without exactly one colon are skipped. A line whose timestamp
    /// is not an integer is kept without one, so it still shadows later
    /// duplicates. Lookups return the first entry for a file.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter_map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                let (file, stamp) = line.split_once(':')?;
                if stamp.contains(':') {
                    return None;
                }
                Some(LedgerEntry {
                    file: file.to_string(),
                    timestamp: parse_leading_int(stamp),
                })
            })
            .collect();
        Self { entries }
    }

    /// Timestamp of the first entry for `file`; `None` if there is no entry
    /// or the first one has no usable timestamp.
    #[must_use]
    pub fn lookup(&self, file: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|e| e.file == file)
            .and_then(|e| e.timestamp)
    }

    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an optionally signed run of leading digits, ignoring surrounding whitespace
/// and anything after the digits (`"1000 "` and `"1000s"` both give 1000).
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first()? {
        b'-' => (-1, &s[1..]),
        b'+' => (1, &s[1..]),
        _ => (1, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse::<i64>().ok().map(|n| sign * n)
}
