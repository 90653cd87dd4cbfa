use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use async_std::{
    fs,
    io::{prelude::*, BufReader, SeekFrom},
    sync::Mutex,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    error::Error,
    index::RowIndex,
    options::OpenOptions,
    preamble::scan_preamble,
    record::{check_fields, decode_record, Dialect},
    stream::{CancelToken, RowStream, StreamJob},
    Indexable, ReadByRow, Result, Row,
};

/// An opened delimited file (eg. CSV) together with an index of its rows.
///
/// The index is built once while opening and never changes afterwards. Rows can then be read in
/// O(1) using `ReadByRow::row` or streamed using `rows`.
#[derive(Debug)]
pub struct DelimitedFile {
    path: PathBuf,
    /// `None` once closed
    inner_file: Option<Mutex<BufReader<fs::File>>>,
    index: Arc<RowIndex>,
    headers: Vec<String>,
    size: u64,
    dialect: Dialect,
    stream_capacity: usize,
    closed: CancelToken,
}

impl DelimitedFile {
    /// Open and index the comma separated file at `path`.
    ///
    /// `lines_to_skip` lines at the top of the file are ignored. If `has_header` is set, the line
    /// following them is parsed as column names.
    pub async fn open<P: AsRef<Path>>(
        path: P,
        lines_to_skip: usize,
        has_header: bool,
    ) -> Result<DelimitedFile> {
        OpenOptions::new()
            .skip_lines(lines_to_skip)
            .has_header(has_header)
            .open(path)
            .await
    }

    pub(crate) async fn open_with<P: AsRef<Path>>(
        path: P,
        opts: &OpenOptions,
    ) -> Result<DelimitedFile> {
        let path = path.as_ref();
        let start = Instant::now();

        let async_path = async_std::path::Path::new(path.as_os_str());
        let size = fs::metadata(async_path).await?.len();
        let mut reader = BufReader::new(fs::File::open(async_path).await?);

        let preamble = scan_preamble(
            &mut reader,
            opts.lines_to_skip,
            opts.has_header,
            &opts.dialect,
        )
        .await?;
        debug!(
            headers = preamble.headers.len(),
            data_offset = preamble.data_offset,
            "preamble scanned"
        );

        // Large sequential reads don't benefit from the BufReader
        let mut file = reader.into_inner();
        let index = RowIndex::build(&mut file, preamble.data_offset, &opts.build).await?;

        info!(
            path = %path.display(),
            rows = index.len(),
            size,
            index_bytes = index.heap_size(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "file indexed"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner_file: Some(Mutex::new(BufReader::new(file))),
            index: Arc::new(index),
            headers: preamble.headers,
            size,
            dialect: opts.dialect,
            stream_capacity: opts.stream_capacity,
            closed: CancelToken::new(),
        })
    }

    /// Amount of data rows in the file
    #[inline]
    pub fn row_count(&self) -> u64 {
        self.total_rows()
    }

    /// Column names. Empty if the file has no header
    #[inline]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Size of the file in bytes
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner_file.is_none()
    }

    /// Turns a row position into an absolute row number. Negative positions count from the end,
    /// so `-1` is the last row. Returns `None` if the row doesn't exist.
    pub fn resolve(&self, pos: i64) -> Option<u64> {
        let count = self.row_count();
        let row = if pos < 0 {
            count.checked_sub(pos.unsigned_abs())?
        } else {
            pos as u64
        };

        (row < count).then(|| row)
    }

    /// Returns a lazy stream of rows beginning at row `start`.
    ///
    /// With `limit` set, at most that many rows are yielded, otherwise the stream runs until the
    /// end of the file. The stream ends early at the first row which can't be decoded. If `start`
    /// is out of bounds, the stream is empty.
    ///
    /// Every stream reads through its own file handle, so multiple streams and `row` calls can be
    /// used concurrently.
    pub fn rows(&self, start: u64, limit: Option<u64>) -> Result<RowStream> {
        self.ensure_open()?;

        let offset = match self.index.get(start) {
            Some(offset) => offset,
            None => return Ok(RowStream::empty()),
        };

        let available = self.row_count() - start;
        let max_rows = limit.map_or(available, |limit| limit.min(available));

        Ok(RowStream::spawn(StreamJob {
            path: self.path.clone(),
            offset,
            max_rows,
            expected_fields: self.headers.len(),
            dialect: self.dialect,
            capacity: self.stream_capacity,
            file_closed: self.closed.clone(),
        }))
    }

    /// Returns a stream of the last `count` rows
    #[inline]
    pub fn tail(&self, count: u64) -> Result<RowStream> {
        self.rows(self.row_count().saturating_sub(count), None)
    }

    /// Closes the file and drops the index. Running streams are stopped. Calling this more than
    /// once has no effect.
    pub fn close(&mut self) {
        if self.inner_file.take().is_none() {
            return;
        }

        self.closed.cancel();
        self.index = Arc::new(RowIndex::default());
        self.headers = Vec::new();
        self.size = 0;
        debug!(path = %self.path.display(), "file closed");
    }

    #[inline]
    fn ensure_open(&self) -> Result<&Mutex<BufReader<fs::File>>> {
        self.inner_file.as_ref().ok_or(Error::Closed)
    }
}

impl Indexable for DelimitedFile {
    #[inline]
    fn get_index(&self) -> &RowIndex {
        &self.index
    }
}

#[async_trait]
impl ReadByRow for DelimitedFile {
    async fn read_row_raw(&self, row: u64, buf: &mut Vec<u8>) -> Result<Option<usize>> {
        let file = self.ensure_open()?;

        let offset = match self.index.get(row) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        // Seeking and reading has to happen without anyone moving the cursor in between
        let mut reader = file.lock().await;
        reader.seek(SeekFrom::Start(offset)).await?;
        let n = reader.read_until(b'\n', buf).await?;

        Ok(Some(n))
    }

    fn decode_row(&self, raw: &[u8]) -> Option<Row> {
        let row = decode_record(raw, &self.dialect)
            .and_then(|row| check_fields(self.headers.len(), row.len()).map(|_| row));

        match row {
            Ok(row) => Some(row),
            Err(err) => {
                debug!(?err, "undecodable row");
                None
            }
        }
    }
}
