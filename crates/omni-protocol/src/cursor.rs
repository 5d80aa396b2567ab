//! Forward-only cursor over a sentence's fields.
//!
//! Every type-specific field is consumed exactly once, in order. Reading past
//! the end is a [`ProtocolError::MissingField`]; numeric fields that do not
//! parse are a [`ProtocolError::InvalidNumber`]. Both abandon the sentence.

use crate::error::{ProtocolError, ProtocolResult};

/// Reads fields in order starting at a type-specific index.
#[derive(Debug)]
pub struct FieldCursor<'a> {
    fields: &'a [&'a str],
    pos: usize,
    type_code: &'a str,
}

impl<'a> FieldCursor<'a> {
    /// Create a cursor positioned at `start`.
    pub fn new(fields: &'a [&'a str], start: usize, type_code: &'a str) -> Self {
        FieldCursor {
            fields,
            pos: start,
            type_code,
        }
    }

    /// Index of the next field to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of fields not yet consumed.
    pub fn remaining(&self) -> usize {
        self.fields.len().saturating_sub(self.pos)
    }

    fn missing(&self) -> ProtocolError {
        ProtocolError::MissingField {
            type_code: self.type_code.to_string(),
            index: self.pos,
            len: self.fields.len(),
        }
    }

    /// Consume the next field as text.
    pub fn next_str(&mut self) -> ProtocolResult<&'a str> {
        let value = self.fields.get(self.pos).copied().ok_or_else(|| self.missing())?;
        self.pos += 1;
        Ok(value)
    }

    /// Consume and ignore the next field.
    pub fn skip(&mut self) -> ProtocolResult<()> {
        self.next_str().map(|_| ())
    }

    /// Consume the next field as an integer.
    pub fn next_int(&mut self) -> ProtocolResult<i64> {
        let index = self.pos;
        let text = self.next_str()?;
        text.parse()
            .map_err(|_| ProtocolError::invalid_number(index, text))
    }

    /// Consume the next field as a float.
    pub fn next_f64(&mut self) -> ProtocolResult<f64> {
        let index = self.pos;
        let text = self.next_str()?;
        parse_f64(index, text)
    }

    /// Consume the next field as an integer, `None` when it is empty.
    pub fn next_opt_int(&mut self) -> ProtocolResult<Option<i64>> {
        let index = self.pos;
        match self.next_str()? {
            "" => Ok(None),
            text => text
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::invalid_number(index, text)),
        }
    }

    /// Consume the next field as a float, `None` when it is empty.
    pub fn next_opt_f64(&mut self) -> ProtocolResult<Option<f64>> {
        let index = self.pos;
        match self.next_str()? {
            "" => Ok(None),
            text => parse_f64(index, text).map(Some),
        }
    }
}

/// Parse a float field, reporting `index` on failure.
pub(crate) fn parse_f64(index: usize, text: &str) -> ProtocolResult<f64> {
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::invalid_number(index, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["CMDR", "OM", "1", "0", "H0", "1", "412", "", "x"];

    #[test]
    fn test_reads_in_order() {
        let mut cursor = FieldCursor::new(FIELDS, 5, "H0");
        assert_eq!(cursor.next_int().unwrap(), 1);
        assert_eq!(cursor.next_str().unwrap(), "412");
        assert_eq!(cursor.next_opt_int().unwrap(), None);
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_invalid_number_reports_index() {
        let mut cursor = FieldCursor::new(FIELDS, 8, "H0");
        let err = cursor.next_int().unwrap_err();
        assert_eq!(err, ProtocolError::invalid_number(8, "x"));
    }

    #[test]
    fn test_read_past_end() {
        let mut cursor = FieldCursor::new(FIELDS, 8, "H0");
        cursor.skip().unwrap();
        let err = cursor.next_str().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingField {
                type_code: "H0".to_string(),
                index: 9,
                len: 9,
            }
        );
    }

    #[test]
    fn test_optional_float() {
        let fields = ["0.83", "", "3.0"];
        let mut cursor = FieldCursor::new(&fields, 0, "D0");
        assert_eq!(cursor.next_opt_f64().unwrap(), Some(0.83));
        assert_eq!(cursor.next_opt_f64().unwrap(), None);
        assert_eq!(cursor.next_f64().unwrap(), 3.0);
    }
}
