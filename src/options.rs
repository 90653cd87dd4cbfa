use std::{path::Path, sync::Arc};

use crate::{
    file::DelimitedFile,
    index::{BuildOptions, ProgressFn},
    record::Dialect,
    Result,
};

/// Options and flags which can be used to configure how a delimited file is opened.
///
/// ```no_run
/// # async_std::task::block_on(async {
/// let file = csv_seek::OpenOptions::new()
///     .skip_lines(1)
///     .has_header(true)
///     .delimiter(b';')
///     .open("data.csv")
///     .await?;
/// # Ok::<(), csv_seek::error::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub(crate) lines_to_skip: usize,
    pub(crate) has_header: bool,
    pub(crate) dialect: Dialect,
    pub(crate) build: BuildOptions,
    pub(crate) stream_capacity: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            lines_to_skip: 0,
            has_header: true,
            dialect: Dialect::default(),
            build: BuildOptions::default(),
            stream_capacity: 1,
        }
    }
}

impl OpenOptions {
    /// Comma separated file with a header line and nothing to skip
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount of lines in front of the header (or first data row) which aren't part of the data
    pub fn skip_lines(&mut self, lines: usize) -> &mut Self {
        self.lines_to_skip = lines;
        self
    }

    pub fn has_header(&mut self, has_header: bool) -> &mut Self {
        self.has_header = has_header;
        self
    }

    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.dialect.delimiter = delimiter;
        self
    }

    pub fn quote(&mut self, quote: u8) -> &mut Self {
        self.dialect.quote = quote;
        self
    }

    pub fn double_quote(&mut self, yes: bool) -> &mut Self {
        self.dialect.double_quote = yes;
        self
    }

    pub fn escape(&mut self, escape: Option<u8>) -> &mut Self {
        self.dialect.escape = escape;
        self
    }

    /// Size of the read buffer used while building the index
    pub fn buffer_size(&mut self, size: usize) -> &mut Self {
        self.build.buffer_size = size;
        self
    }

    /// Amount of decoded rows a stream may hold before its producer has to wait for the consumer.
    /// Values below 1 are raised to 1.
    pub fn stream_capacity(&mut self, capacity: usize) -> &mut Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    /// Amount of rows between two progress notifications
    pub fn progress_interval(&mut self, rows: u64) -> &mut Self {
        self.build.progress_interval = rows;
        self
    }

    /// Gets called with the amount of rows indexed so far while the file gets opened
    pub fn on_progress<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.build.on_progress = Some(Arc::new(f) as ProgressFn);
        self
    }

    /// Opens and indexes the file at `path` with the options set on `self`.
    #[inline]
    pub async fn open<P: AsRef<Path>>(&self, path: P) -> Result<DelimitedFile> {
        DelimitedFile::open_with(path, self).await
    }
}
