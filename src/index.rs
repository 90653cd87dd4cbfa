use std::{fmt, sync::Arc};

use async_std::io::{prelude::*, Read, Seek, SeekFrom};
use itertools::Itertools;
use tracing::trace;

use crate::Result;

/// Default size of the buffer used while scanning for line breaks
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Default amount of rows between two progress notifications
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Callback receiving the amount of rows indexed so far
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Settings for building a `RowIndex`
#[derive(Clone)]
pub struct BuildOptions {
    /// Amount of bytes read per I/O call
    pub buffer_size: usize,
    pub progress_interval: u64,
    pub on_progress: Option<ProgressFn>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            on_progress: None,
        }
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("buffer_size", &self.buffer_size)
            .field("progress_interval", &self.progress_interval)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl BuildOptions {
    #[inline]
    fn report(&self, rows: u64) {
        if rows != 1 && (self.progress_interval == 0 || rows % self.progress_interval != 0) {
            return;
        }

        trace!(rows, "indexing");
        if let Some(ref on_progress) = self.on_progress {
            on_progress(rows);
        }
    }
}

/// Contains an in-memory row-index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowIndex {
    /// Maps row to seek position in order to seek efficiently. The index within the Vec represents
    /// the row-index in the file
    inner: Vec<u64>,
    /// Byte position of the first data row
    data_offset: u64,
}

impl RowIndex {
    /// Build a new index for the rows of `reader`, starting at `data_offset`.
    ///
    /// The file is read once front to back in chunks of `opts.buffer_size` bytes. Every line break
    /// ends a row. Content after the last line break only counts as a row if it holds something
    /// other than whitespace.
    pub async fn build<R: Read + Seek + Unpin>(
        reader: &mut R,
        data_offset: u64,
        opts: &BuildOptions,
    ) -> Result<Self> {
        reader.seek(SeekFrom::Start(data_offset)).await?;

        let mut line_index: Vec<u64> = Vec::new();
        let mut buff = vec![0u8; opts.buffer_size.max(1)];

        // Start of the row currently being scanned
        let mut row_start = data_offset;
        // Absolute position of `buff[0]`
        let mut pos = data_offset;
        // Whether the bytes since `row_start` contain non-whitespace
        let mut pending = false;

        loop {
            let n = reader.read(&mut buff).await?;
            if n == 0 {
                break;
            }

            let chunk = &buff[..n];
            let mut tail_start = None;

            for i in chunk.iter().positions(|b| *b == b'\n') {
                line_index.push(row_start);
                row_start = pos + i as u64 + 1;
                tail_start = Some(i + 1);
                opts.report(line_index.len() as u64);
            }

            let has_content = |s: &[u8]| s.iter().any(|b| !b.is_ascii_whitespace());
            match tail_start {
                Some(start) => pending = has_content(&chunk[start..]),
                None => pending |= has_content(chunk),
            }

            pos += n as u64;
        }

        // Unterminated last line
        if pending {
            line_index.push(row_start);
            opts.report(line_index.len() as u64);
        }

        line_index.shrink_to_fit();

        Ok(Self {
            inner: line_index,
            data_offset,
        })
    }

    /// Get the offset of `row`, or `None` if the row does not exist
    #[inline]
    pub fn get(&self, row: u64) -> Option<u64> {
        usize::try_from(row)
            .ok()
            .and_then(|row| self.inner.get(row))
            .copied()
    }

    /// Returns the amount of rows in the index
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the index holds no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Byte position at which row data begins
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Bytes of memory held by the offsets. Grows by 8 bytes per row, so roughly 800 MB for a
    /// hundred million rows.
    pub fn heap_size(&self) -> usize {
        self.inner.capacity() * std::mem::size_of::<u64>()
    }

    /// All offsets in row order
    #[inline]
    pub fn offsets(&self) -> &[u64] {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_std::io::Cursor;

    use super::*;

    async fn build(text: &str, data_offset: u64, buffer_size: usize) -> RowIndex {
        let mut reader = Cursor::new(text.as_bytes().to_vec());
        let opts = BuildOptions {
            buffer_size,
            ..BuildOptions::default()
        };
        RowIndex::build(&mut reader, data_offset, &opts).await.unwrap()
    }

    #[async_std::test]
    async fn test_terminated() {
        let index = build("a,b\nc,d\ne,f\n", 0, 1024).await;
        assert_eq!(index.offsets(), &[0, 4, 8]);
    }

    #[async_std::test]
    async fn test_unterminated_tail() {
        let index = build("a,b\nc,d\ne,f", 0, 1024).await;
        assert_eq!(index.offsets(), &[0, 4, 8]);

        let index = build("x", 0, 1024).await;
        assert_eq!(index.offsets(), &[0]);
    }

    #[async_std::test]
    async fn test_whitespace_tail() {
        let index = build("a,b\nc,d\n  \r", 0, 1024).await;
        assert_eq!(index.len(), 2);
    }

    #[async_std::test]
    async fn test_empty() {
        let index = build("", 0, 1024).await;
        assert!(index.is_empty());
        assert_eq!(index.get(0), None);

        let index = build("ID,Name\n", 8, 1024).await;
        assert!(index.is_empty());
        assert_eq!(index.data_offset(), 8);
    }

    #[async_std::test]
    async fn test_data_offset() {
        let text = "skip me\nID,Name\n1,a\n2,b\n";
        let index = build(text, 16, 1024).await;
        assert_eq!(index.offsets(), &[16, 20]);
        assert_eq!(&text[index.get(1).unwrap() as usize..], "2,b\n");
    }

    #[async_std::test]
    async fn test_small_buffers() {
        let text = "row one\nrow two\n\nlast row";
        let expected = build(text, 0, 1024).await;
        assert_eq!(expected.offsets(), &[0, 8, 16, 17]);

        for buffer_size in 1..=text.len() {
            assert_eq!(build(text, 0, buffer_size).await, expected);
        }
    }

    #[async_std::test]
    async fn test_strictly_increasing() {
        let text: String = (0..500).map(|i| format!("{},{}\n", i, "x".repeat(i % 7))).collect();
        let index = build(&text, 0, 64).await;
        assert_eq!(index.len(), 500);
        assert!(index.offsets().windows(2).all(|w| w[0] < w[1]));
    }

    #[async_std::test]
    async fn test_progress() {
        let seen = Arc::new(AtomicU64::new(0));
        let calls = Arc::new(AtomicU64::new(0));

        let opts = BuildOptions {
            buffer_size: 16,
            progress_interval: 10,
            on_progress: Some({
                let seen = Arc::clone(&seen);
                let calls = Arc::clone(&calls);
                Arc::new(move |rows| {
                    seen.store(rows, Ordering::SeqCst);
                    calls.fetch_add(1, Ordering::SeqCst);
                })
            }),
        };

        let text = "r\n".repeat(35);
        let mut reader = Cursor::new(text.into_bytes());
        let index = RowIndex::build(&mut reader, 0, &opts).await.unwrap();

        assert_eq!(index.len(), 35);
        // rows 1, 10, 20, 30
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(seen.load(Ordering::SeqCst), 30);
    }
}
