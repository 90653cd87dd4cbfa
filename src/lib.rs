//!A library to index large delimited (CSV-like) files once and read any row or range of rows
//!directly, without reading the file from the start.

pub mod error;
/// An opened, indexed delimited file
pub mod file;
/// The row index of files
pub mod index;
/// Configuration for opening files
pub mod options;
/// Skipping leading lines and parsing the header
pub mod preamble;
/// Decoding of single records
pub mod record;
/// Lazy streams of rows
pub mod stream;

pub use file::DelimitedFile;
pub use options::OpenOptions;
pub use stream::RowStream;

use async_trait::async_trait;
use index::RowIndex;

pub type Result<T> = std::result::Result<T, error::Error>;

/// The fields of a single row
pub type Row = Vec<String>;

/// A type holding a row index of a file.
pub trait Indexable {
    /// Returns a reference to the files index.
    fn get_index(&self) -> &RowIndex;

    /// Returns the total amount of data rows, not counting skipped lines and the header.
    #[inline]
    fn total_rows(&self) -> u64 {
        self.get_index().len() as u64
    }
}

/// A trait defining behavior for reading certain rows directly from indexed files.
#[async_trait]
pub trait ReadByRow: Indexable + Sync {
    /// Should read the raw bytes of `row`, including its line terminator, into `buf`. Returns
    /// `None` if the row doesn't exist.
    async fn read_row_raw(&self, row: u64, buf: &mut Vec<u8>) -> Result<Option<usize>>;

    /// Should decode the raw bytes of a row into its fields, or return `None` if they don't
    /// form a valid row.
    fn decode_row(&self, raw: &[u8]) -> Option<Row>;

    /// Reads and decodes the given row. Returns `None` if the row doesn't exist or is malformed.
    async fn row(&self, row: u64) -> Result<Option<Row>> {
        let mut buf = Vec::new();
        if self.read_row_raw(row, &mut buf).await?.is_none() {
            return Ok(None);
        }

        Ok(self.decode_row(&buf))
    }

    /// Reads the given row as text, without decoding it and without its line terminator.
    async fn read_line(&self, row: u64) -> Result<Option<String>> {
        let mut buf = Vec::new();
        if self.read_row_raw(row, &mut buf).await?.is_none() {
            return Ok(None);
        }

        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }

        Ok(Some(String::from_utf8(buf)?))
    }
}
