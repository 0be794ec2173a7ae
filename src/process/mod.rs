// src/process/mod.rs
pub mod columns;
pub mod utils;

use tracing::debug;

/// Decoded but unindexed dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Column names from the first retained line.
    pub headers: Vec<String>,
    /// Every following non-blank line, split into fields. Rows are not
    /// padded or truncated to the header width.
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Field `col` of row `row`, or `""` when either is out of range.
    pub fn field(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Decode comma-delimited text into a header row plus data rows.
///
/// - CRLF and lone CR are normalised to LF.
/// - Lines that are empty or whitespace-only are skipped.
/// - `"` opens a quoted section in which commas are literal and `""`
///   yields a single quote; a closing `"` returns to unquoted mode.
/// - An unterminated quote runs to the end of its line.
///
/// Never fails: malformed input decodes best-effort.
pub fn decode(text: &str) -> Dataset {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = normalized
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(decode_line);

    let headers = lines.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = lines.collect();
    debug!(columns = headers.len(), rows = rows.len(), "decoded csv");

    Dataset { headers, rows }
}

fn decode_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if quoted {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    cur.push('"');
                    chars.next();
                } else {
                    quoted = false;
                }
            } else {
                cur.push(ch);
            }
        } else {
            match ch {
                ',' => fields.push(std::mem::take(&mut cur)),
                '"' => quoted = true,
                _ => cur.push(ch),
            }
        }
    }
    fields.push(cur);
    fields
}
