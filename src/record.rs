use std::io::Read;

use csv::{ReaderBuilder, StringRecord};

use crate::{error::Error, Result, Row};

/// Delimiter, quoting and escaping rules of a delimited file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    /// Two quotes in a row inside a quoted field are read as one literal quote
    pub double_quote: bool,
    pub escape: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            double_quote: true,
            escape: None,
        }
    }
}

impl Dialect {
    /// Returns a `csv::ReaderBuilder` configured for this dialect. Headers are never consumed by
    /// the reader itself since the preamble is handled separately.
    pub(crate) fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .double_quote(self.double_quote)
            .escape(self.escape);
        builder
    }
}

/// Decodes a single raw line into its fields. Only the first record found in `line` is returned.
pub fn decode_record(line: &[u8], dialect: &Dialect) -> Result<Row> {
    // An unclosed quote swallows the terminator, so make sure there is one
    let terminator: &[u8] = if line.ends_with(b"\n") { b"" } else { b"\n" };
    let mut reader = dialect.reader_builder().from_reader(line.chain(terminator));

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(Error::EmptyRecord);
    }

    if spans_lines(&record) {
        return Err(Error::UnterminatedQuote);
    }

    Ok(record_to_row(&record))
}

/// Returns `true` if a field of `record` contains a line break, which means the record didn't end
/// on the line it started.
#[inline]
pub(crate) fn spans_lines(record: &StringRecord) -> bool {
    record.iter().any(|field| field.contains('\n'))
}

#[inline]
pub(crate) fn record_to_row(record: &StringRecord) -> Row {
    record.iter().map(str::to_owned).collect()
}

/// Checks `found` fields against the header-defined count. An `expected` of 0 means the file has
/// no header and every field count is accepted.
#[inline]
pub fn check_fields(expected: usize, found: usize) -> Result<()> {
    if expected == 0 || expected == found {
        Ok(())
    } else {
        Err(Error::FieldCount { expected, found })
    }
}
