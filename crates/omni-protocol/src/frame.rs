//! Sentence framing and field splitting.
//!
//! Device sentences wrap a comma-separated payload between `*` and `#`:
//!
//! ```text
//! ÿ*CMDR,OM,123456789123456,200318123020,Q0,412,80#<LF>
//!   |<-------------------- payload ------------------>|
//! ```
//!
//! Anything before the first `*` or after the first `#` is ignored. A line
//! without both markers in that order is treated as a bare payload.

use crate::constants::{FIELD_SEPARATOR, FRAME_END, FRAME_START};

/// Return the payload between the first `*` and the first `#`.
///
/// Falls back to the whole line when either marker is missing or the markers
/// are out of order.
pub fn extract_payload(raw: &str) -> &str {
    match (raw.find(FRAME_START), raw.find(FRAME_END)) {
        (Some(start), Some(end)) if start < end => &raw[start + 1..end],
        _ => raw,
    }
}

/// Split a raw line into its ordered fields.
///
/// Empty fields between consecutive separators are kept, including trailing
/// ones, and no whitespace is trimmed.
pub fn split_fields(raw: &str) -> Vec<&str> {
    extract_payload(raw).split(FIELD_SEPARATOR).collect()
}

/// Join fields back into a payload with `,`.
pub fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(field.as_ref());
    }
    out
}

/// A received sentence split into fields, borrowing from the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence<'a> {
    raw: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> Sentence<'a> {
    /// Frame and split a raw line.
    pub fn parse(raw: &'a str) -> Self {
        Sentence {
            raw,
            fields: split_fields(raw),
        }
    }

    /// The line as received, markers and terminator included.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// All fields of the payload.
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    /// Field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }
}
