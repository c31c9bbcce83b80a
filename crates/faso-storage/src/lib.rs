//! File-system collaborators for FASO: the two-column dataset loader and the
//! CSV result writer, synchronous or on a background worker.

use faso_core::{DataPoint, Dataset, InstanceResult, ResultSink};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("dataset {0} contains no valid rows")]
    EmptyDataset(String),
    #[error("result worker error: {0}")]
    Worker(String),
}

/// Parse `x,y` rows. Lines without exactly two numeric fields are skipped.
pub fn parse_dataset<R: BufRead>(reader: R) -> Result<Vec<DataPoint>, StorageError> {
    let mut points = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed = match fields.as_slice() {
            [x, y] => x.parse::<f64>().ok().zip(y.parse::<f64>().ok()),
            _ => None,
        };
        match parsed {
            Some((x, y)) if x.is_finite() && y.is_finite() => points.push(DataPoint::new(x, y)),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, kept = points.len(), "skipped malformed dataset lines");
    }
    Ok(points)
}

/// Load a dataset file, rejecting files with no usable rows.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, StorageError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let points = parse_dataset(BufReader::new(file))?;
    if points.is_empty() {
        return Err(StorageError::EmptyDataset(path.display().to_string()));
    }
    info!(path = %path.display(), points = points.len(), "dataset loaded");
    Ok(Dataset::new(points))
}

/// Where result rows end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultDestination {
    File(PathBuf),
    Stdout,
    /// Caller-supplied writer (buffers, sockets, test doubles).
    Writer,
}

/// Writes one `x,y` line per agent per instance.
pub struct CsvResultWriter {
    out: Box<dyn Write + Send>,
    destination: ResultDestination,
    rows: usize,
}

impl std::fmt::Debug for CsvResultWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvResultWriter")
            .field("destination", &self.destination)
            .field("rows", &self.rows)
            .finish()
    }
}

impl CsvResultWriter {
    /// Create (truncating) `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self {
            out: Box::new(BufWriter::new(file)),
            destination: ResultDestination::File(path.to_path_buf()),
            rows: 0,
        })
    }

    /// Write to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
            destination: ResultDestination::Stdout,
            rows: 0,
        }
    }

    /// Write to `path`, or to standard output when it cannot be opened.
    #[must_use]
    pub fn open_or_stdout(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::create(path) {
            Ok(writer) => writer,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open results file; writing to stdout");
                Self::stdout()
            }
        }
    }

    /// Wrap an arbitrary writer.
    pub fn from_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            destination: ResultDestination::Writer,
            rows: 0,
        }
    }

    #[must_use]
    pub fn destination(&self) -> &ResultDestination {
        &self.destination
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_instance(&mut self, result: &InstanceResult) -> Result<(), StorageError> {
        for row in result.rows() {
            writeln!(self.out, "{},{}", row.x, row.y)?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.out.flush()?;
        Ok(())
    }
}

impl ResultSink for CsvResultWriter {
    fn on_instance(&mut self, result: &InstanceResult) {
        if let Err(err) = self.write_instance(result) {
            warn!(instance = result.instance, error = %err, "failed to write instance results");
        }
    }

    fn on_complete(&mut self) {
        if let Err(err) = self.flush() {
            warn!(error = %err, "failed to flush results");
        }
    }
}

enum ResultCommand {
    Write(InstanceResult),
    Flush,
    Shutdown,
}

/// Result sink that hands rows to a dedicated writer thread.
pub struct ResultPipeline {
    tx: mpsc::Sender<ResultCommand>,
    written: Arc<AtomicUsize>,
    destination: ResultDestination,
    handle: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for ResultPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPipeline")
            .field("destination", &self.destination)
            .field("written", &self.written.load(Ordering::Relaxed))
            .finish()
    }
}

impl ResultPipeline {
    /// Spawn a worker writing to `path`, falling back to stdout.
    pub fn open_or_stdout(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_writer(CsvResultWriter::open_or_stdout(path))
    }

    /// Spawn a worker that owns `writer`.
    pub fn from_writer(mut writer: CsvResultWriter) -> Result<Self, StorageError> {
        let (tx, rx) = mpsc::channel::<ResultCommand>();
        let written = Arc::new(AtomicUsize::new(0));
        let worker_written = Arc::clone(&written);
        let destination = writer.destination().clone();
        let handle = thread::Builder::new()
            .name("faso-results-worker".into())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        ResultCommand::Write(result) => {
                            if let Err(err) = writer.write_instance(&result) {
                                warn!(instance = result.instance, error = %err, "failed to write instance results");
                            }
                            worker_written.store(writer.rows(), Ordering::Release);
                        }
                        ResultCommand::Flush => {
                            if let Err(err) = writer.flush() {
                                warn!(error = %err, "failed to flush results");
                            }
                        }
                        ResultCommand::Shutdown => break,
                    }
                }
                if let Err(err) = writer.flush() {
                    warn!(error = %err, "failed to flush results on shutdown");
                }
            })
            .map_err(|err| {
                StorageError::Worker(format!("failed to spawn result worker thread: {err}"))
            })?;

        Ok(Self {
            tx,
            written,
            destination,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn destination(&self) -> &ResultDestination {
        &self.destination
    }

    /// Rows the worker has written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Request a flush of buffered rows.
    pub fn flush(&self) {
        let _ = self.tx.send(ResultCommand::Flush);
    }
}

impl ResultSink for ResultPipeline {
    fn on_instance(&mut self, result: &InstanceResult) {
        if self.tx.send(ResultCommand::Write(result.clone())).is_err() {
            warn!(instance = result.instance, "result worker channel closed; instance dropped");
        }
    }

    fn on_complete(&mut self) {
        self.flush();
    }
}

impl Drop for ResultPipeline {
    fn drop(&mut self) {
        let _ = self.tx.send(ResultCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.join()
        {
            warn!("result worker thread panicked: {err:?}");
        }
    }
}
