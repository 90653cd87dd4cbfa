use std::{
    fs,
    io::{Read, Seek, SeekFrom},
    path::PathBuf,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use async_std::{
    channel::{self, Receiver, Sender},
    stream::Stream,
    task::{self, JoinHandle},
};
use csv::StringRecord;
use tracing::debug;

use crate::{
    record::{check_fields, record_to_row, spans_lines, Dialect},
    Row,
};

/// A flag shared between a consumer and a producer to request the producer to stop
#[derive(Debug, Clone, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a producer needs to read rows on its own
#[derive(Debug, Clone)]
pub(crate) struct StreamJob {
    pub path: PathBuf,
    /// Byte offset of the first row to read
    pub offset: u64,
    /// Upper bound of rows to emit
    pub max_rows: u64,
    /// Header-defined field count, 0 if unconstrained
    pub expected_fields: usize,
    pub dialect: Dialect,
    pub capacity: usize,
    /// Cancelled when the originating file gets closed
    pub file_closed: CancelToken,
}

/// A lazy sequence of decoded rows.
///
/// Rows are read by a background task which parks as soon as `capacity` rows wait to be consumed.
/// Dropping the stream or calling `cancel` makes the task stop before reading the next row.
#[derive(Debug)]
pub struct RowStream {
    receiver: Receiver<Row>,
    cancel: CancelToken,
    producer: Option<JoinHandle<()>>,
}

impl RowStream {
    /// A stream which doesn't yield anything
    pub(crate) fn empty() -> Self {
        let (_, receiver) = channel::bounded(1);
        Self {
            receiver,
            cancel: CancelToken::new(),
            producer: None,
        }
    }

    /// Spawns the producer for `job`
    pub(crate) fn spawn(job: StreamJob) -> Self {
        if job.max_rows == 0 {
            return Self::empty();
        }

        let (sender, receiver) = channel::bounded(job.capacity.max(1));
        let cancel = CancelToken::new();

        let producer = {
            let cancel = cancel.clone();
            task::spawn_blocking(move || produce(job, sender, cancel))
        };

        Self {
            receiver,
            cancel,
            producer: Some(producer),
        }
    }

    /// Stops the producer. Rows already handed over can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until the producer has terminated. Cancels it first, so this doesn't wait for
    /// unconsumed rows to be read.
    pub async fn finish(mut self) {
        self.cancel();
        self.receiver.close();
        if let Some(producer) = self.producer.take() {
            producer.await;
        }
    }
}

impl Stream for RowStream {
    type Item = Row;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        // Wakes a producer waiting on a full channel
        self.receiver.close();
    }
}

/// Reads rows for `job` and hands them to `sender` until a stop condition occurs.
fn produce(job: StreamJob, sender: Sender<Row>, cancel: CancelToken) {
    let mut file = match fs::File::open(&job.path) {
        Ok(file) => file,
        Err(err) => {
            debug!(path = %job.path.display(), %err, "stream failed to open file");
            return;
        }
    };

    if let Err(err) = file.seek(SeekFrom::Start(job.offset)) {
        debug!(offset = job.offset, %err, "stream failed to seek");
        return;
    }

    // A trailing line break makes an unclosed quote on an unterminated last line detectable.
    // Files which already end with one only get an empty line, which is skipped.
    let mut reader = job
        .dialect
        .reader_builder()
        .from_reader(file.chain(&b"\n"[..]));
    let mut record = StringRecord::new();
    let mut emitted: u64 = 0;

    while emitted < job.max_rows {
        if cancel.is_cancelled() || job.file_closed.is_cancelled() {
            debug!(emitted, "stream cancelled");
            return;
        }

        match reader.read_record(&mut record) {
            Ok(true) => (),
            Ok(false) => break,
            Err(err) => {
                debug!(emitted, %err, "stream stopped at undecodable row");
                return;
            }
        }

        if spans_lines(&record) {
            debug!(emitted, "stream stopped at row with unterminated quote");
            return;
        }

        if let Err(err) = check_fields(job.expected_fields, record.len()) {
            debug!(emitted, ?err, "stream stopped at row with wrong field count");
            return;
        }

        // Fails once the consumer is gone
        if task::block_on(sender.send(record_to_row(&record))).is_err() {
            debug!(emitted, "stream abandoned by consumer");
            return;
        }

        emitted += 1;
    }

    debug!(emitted, "stream exhausted");
}
