//! Sequential plan execution
//!
//! Operations run strictly in list order, one at a time. A failing
//! operation is logged and reported but never stops the run.

use crate::plan::Operation;
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{Level, debug, info, span, warn};

/// Copy buffer size
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Outcome counts for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl ExecutionReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Runs operations and reports each outcome through callbacks
///
/// ```no_run
/// # use media_organizer::executor::Executor;
/// # let operations = Vec::new();
/// let mut lines = Vec::new();
/// let report = Executor::new(|line| lines.push(line.to_string()))
///     .on_progress(|done, total| println!("{done}/{total}"))
///     .run(&operations);
/// ```
pub struct Executor<'a> {
    on_log_line: Box<dyn FnMut(&str) + 'a>,
    on_progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
    on_operation_result: Option<Box<dyn FnMut(&Operation, bool) + 'a>>,
}

impl<'a> Executor<'a> {
    /// `on_log_line` receives one run-log line per operation
    pub fn new(on_log_line: impl FnMut(&str) + 'a) -> Self {
        Self {
            on_log_line: Box::new(on_log_line),
            on_progress: None,
            on_operation_result: None,
        }
    }

    /// Called with (completed, total) after every operation
    pub fn on_progress(mut self, callback: impl FnMut(usize, usize) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Called with each operation and whether it succeeded
    pub fn on_operation_result(mut self, callback: impl FnMut(&Operation, bool) + 'a) -> Self {
        self.on_operation_result = Some(Box::new(callback));
        self
    }

    pub fn run(mut self, operations: &[Operation]) -> ExecutionReport {
        let _span = span!(Level::INFO, "execute", operations = operations.len()).entered();

        let total = operations.len();
        let mut report = ExecutionReport::default();

        for (index, op) in operations.iter().enumerate() {
            let outcome = apply(op);
            match &outcome {
                Ok(()) => {
                    debug!(verb = op.verb(), destination = ?op.destination(), "Operation succeeded");
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(verb = op.verb(), destination = ?op.destination(), error = %e, "Operation failed");
                    report.failed += 1;
                }
            }

            (self.on_log_line)(&format_log_line(op, &outcome));
            if let Some(callback) = self.on_operation_result.as_mut() {
                callback(op, outcome.is_ok());
            }
            if let Some(callback) = self.on_progress.as_mut() {
                callback(index + 1, total);
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Execution finished"
        );
        report
    }
}

/// Render the run-log line for an operation outcome
///
/// `<verb> <src> -> <dest> [SUCCESS]`, or `[FAIL] reason=<message>`;
/// directory creation and deletion show only the target path.
pub fn format_log_line(op: &Operation, outcome: &io::Result<()>) -> String {
    let detail = match op.source() {
        Some(source) => format!(
            "{} {} -> {}",
            op.verb(),
            source.display(),
            op.destination().display()
        ),
        None => format!("{} {}", op.verb(), op.destination().display()),
    };

    match outcome {
        Ok(()) => format!("{} [SUCCESS]", detail),
        Err(e) => format!(
            "{} [FAIL] reason={}",
            detail,
            e.to_string().replace(['\r', '\n'], " ")
        ),
    }
}

/// Apply one operation to the file system
pub fn apply(op: &Operation) -> io::Result<()> {
    match op {
        Operation::MakeDir { dir } => fs::create_dir_all(dir),
        Operation::Copy {
            source,
            destination,
            ..
        } => {
            create_parent(destination)?;
            copy_with_metadata(source, destination)
        }
        Operation::Move {
            source,
            destination,
            ..
        } => {
            create_parent(destination)?;
            // Try rename first (faster for same filesystem)
            if fs::rename(source, destination).is_err() {
                // Fall back to copy + delete for cross-filesystem moves
                copy_with_metadata(source, destination)?;
                fs::remove_file(source)?;
            }
            Ok(())
        }
        Operation::Delete { path } => match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Copy content, then carry over permissions and access/modification times
fn copy_with_metadata(source: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    copy_file(source, dest)?;
    fs::set_permissions(dest, metadata.permissions())?;
    filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

/// Copy file with buffered I/O for efficiency
fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()
}
