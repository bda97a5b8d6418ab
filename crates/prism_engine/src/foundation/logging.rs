//! Engine logging backend
//!
//! Implements the [`log`] facade with a level-filtered, thread-safe sink that
//! supports colored console output, a rotating file sink, an optional user
//! callback, and an asynchronous drain mode where record formatting and I/O
//! happen on a dedicated worker thread.
//!
//! The enqueue path in asynchronous mode never blocks on I/O; [`EngineLogger::flush`]
//! blocks the caller until the queue is empty and any pending write completed.

use chrono::{DateTime, Local};
use colored::Colorize;
use crossbeam_channel::{bounded, unbounded, Sender};
use log::{Level, LevelFilter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::SystemTime;

/// UTF-8 byte-order mark written at the start of every log file
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A fully materialized log record, independent of the `log` crate's
/// borrowed [`log::Record`]
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Severity level
    pub level: Level,

    /// Formatted message text
    pub message: String,

    /// Module path or target the record originated from
    pub target: String,

    /// Source file, when the call site provides it
    pub file: Option<String>,

    /// Source line, when the call site provides it
    pub line: Option<u32>,

    /// Wall-clock time the record was created
    pub timestamp: SystemTime,

    /// Debug-formatted id of the originating thread
    pub thread: String,
}

/// User callback invoked for every delivered record
pub type LogCallback = Box<dyn Fn(&LogRecord) + Send + Sync>;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Records below this level are dropped before enqueue
    pub level: LevelFilter,

    /// Write records to stderr
    pub console: bool,

    /// Use ANSI colors on the console sink
    pub color: bool,

    /// Include the origin thread id in formatted lines
    pub thread_ids: bool,

    /// Log file path; `None` disables the file sink
    pub file: Option<PathBuf>,

    /// Rotate the log file once it exceeds this many bytes
    pub max_file_size: u64,

    /// Drain records on a dedicated worker thread
    pub async_mode: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            console: true,
            color: true,
            thread_ids: false,
            file: None,
            max_file_size: 5 * 1024 * 1024,
            async_mode: false,
        }
    }
}

/// Open file sink with rotation bookkeeping
struct FileSink {
    path: PathBuf,
    file: File,
    written: u64,
    rotations: u64,
}

impl FileSink {
    fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(UTF8_BOM)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written: len.max(UTF8_BOM.len() as u64),
            rotations: 0,
        })
    }

    /// Close the current file, rename it with a monotone timestamp suffix,
    /// and reopen a fresh file at the original path. Called under the sink
    /// lock, so records arriving during rotation are serialized behind it.
    fn rotate(&mut self) -> std::io::Result<()> {
        self.file.flush()?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        let rotated = self
            .path
            .with_extension(format!("{stamp}.{:04}.log", self.rotations));
        self.rotations += 1;

        // Replace the handle before renaming so the old handle is closed.
        fs::rename(&self.path, &rotated)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(UTF8_BOM)?;
        self.file = file;
        self.written = UTF8_BOM.len() as u64;
        Ok(())
    }

    fn write_line(&mut self, line: &str, max_size: u64) -> std::io::Result<()> {
        if max_size > 0 && self.written + line.len() as u64 > max_size {
            self.rotate()?;
        }
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }
}

/// Mutable sink state, guarded by one lock
struct SinkState {
    console: bool,
    color: bool,
    thread_ids: bool,
    max_file_size: u64,
    file: Option<FileSink>,
    callback: Option<LogCallback>,
    callback_failed: bool,
}

/// Messages for the async drain worker
enum WorkerMsg {
    Record(LogRecord),
    Flush(Sender<()>),
    Shutdown,
}

struct AsyncState {
    tx: Sender<WorkerMsg>,
    handle: Option<JoinHandle<()>>,
}

struct LoggerCore {
    level: AtomicUsize,
    sinks: Mutex<SinkState>,
    async_state: Mutex<Option<AsyncState>>,
    queue_len: Arc<AtomicUsize>,
}

/// Thread-safe engine logger; cheap to clone, all clones share state.
///
/// Install it as the global `log` backend with [`EngineLogger::init`], or use
/// it standalone (tests substitute it without touching process-global state).
#[derive(Clone)]
pub struct EngineLogger {
    core: Arc<LoggerCore>,
}

impl EngineLogger {
    /// Create a logger from a configuration without installing it globally
    pub fn with_config(config: &LogConfig) -> std::io::Result<Self> {
        let file = match &config.file {
            Some(path) => Some(FileSink::open(path)?),
            None => None,
        };
        let logger = Self {
            core: Arc::new(LoggerCore {
                level: AtomicUsize::new(level_filter_to_usize(config.level)),
                sinks: Mutex::new(SinkState {
                    console: config.console,
                    color: config.color,
                    thread_ids: config.thread_ids,
                    max_file_size: config.max_file_size,
                    file,
                    callback: None,
                    callback_failed: false,
                }),
                async_state: Mutex::new(None),
                queue_len: Arc::new(AtomicUsize::new(0)),
            }),
        };
        if config.async_mode {
            logger.set_async(true);
        }
        Ok(logger)
    }

    /// Create a logger with the default configuration
    pub fn new() -> Self {
        Self::with_config(&LogConfig::default()).expect("default config opens no files")
    }

    /// Build a logger from `config` and install it as the global `log`
    /// backend. Fails if another backend is already installed.
    pub fn init(config: &LogConfig) -> Result<Self, log::SetLoggerError> {
        let logger = match Self::with_config(config) {
            Ok(logger) => logger,
            Err(e) => {
                // Fall back to a console-only logger rather than refusing to start.
                eprintln!("logger file sink unavailable: {e}");
                let mut fallback = config.clone();
                fallback.file = None;
                Self::with_config(&fallback).expect("config without a file sink opens no files")
            }
        };
        log::set_boxed_logger(Box::new(logger.clone()))?;
        log::set_max_level(config.level);
        Ok(logger)
    }

    /// Current level filter
    pub fn level(&self) -> LevelFilter {
        usize_to_level_filter(self.core.level.load(Ordering::Relaxed))
    }

    /// Set the level filter; records below it are dropped before enqueue
    pub fn set_level(&self, level: LevelFilter) {
        self.core
            .level
            .store(level_filter_to_usize(level), Ordering::Relaxed);
    }

    /// Enable or disable the console sink
    pub fn set_console(&self, enabled: bool) {
        self.lock_sinks().console = enabled;
    }

    /// Enable or disable ANSI color on the console sink
    pub fn set_color(&self, enabled: bool) {
        self.lock_sinks().color = enabled;
    }

    /// Include or omit thread ids in formatted lines
    pub fn set_thread_ids(&self, enabled: bool) {
        self.lock_sinks().thread_ids = enabled;
    }

    /// Set the file size at which the log file rotates (0 disables rotation)
    pub fn set_max_file_size(&self, bytes: u64) {
        self.lock_sinks().max_file_size = bytes;
    }

    /// Enable the file sink. Creates the parent directory if needed and
    /// writes a UTF-8 byte-order mark into a fresh file.
    pub fn enable_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let sink = FileSink::open(path.as_ref())?;
        self.lock_sinks().file = Some(sink);
        Ok(())
    }

    /// Close the file sink
    pub fn disable_file(&self) {
        self.lock_sinks().file = None;
    }

    /// Install a user callback, invoked after the built-in sinks for every
    /// delivered record. Panics inside the callback are caught and reported
    /// once as an error record.
    pub fn set_callback(&self, callback: LogCallback) {
        let mut sinks = self.lock_sinks();
        sinks.callback = Some(callback);
        sinks.callback_failed = false;
    }

    /// Remove the user callback
    pub fn clear_callback(&self) {
        self.lock_sinks().callback = None;
    }

    /// Number of records waiting in the asynchronous queue
    pub fn queue_len(&self) -> usize {
        self.core.queue_len.load(Ordering::Acquire)
    }

    /// Whether asynchronous mode is active
    pub fn is_async(&self) -> bool {
        self.core
            .async_state
            .lock()
            .expect("logger async state poisoned")
            .is_some()
    }

    /// Toggle asynchronous mode. Switching in either direction implicitly
    /// flushes, so no records are lost or reordered across the transition.
    pub fn set_async(&self, enabled: bool) {
        self.flush();
        let mut state = self
            .core
            .async_state
            .lock()
            .expect("logger async state poisoned");
        match (enabled, state.as_mut()) {
            (true, None) => {
                let (tx, rx) = unbounded::<WorkerMsg>();
                let weak = Arc::downgrade(&self.core);
                let queue_len = Arc::clone(&self.core.queue_len);
                let handle = std::thread::Builder::new()
                    .name("log-drain".into())
                    .spawn(move || drain_worker(&rx, &weak, &queue_len))
                    .expect("failed to spawn log drain thread");
                *state = Some(AsyncState {
                    tx,
                    handle: Some(handle),
                });
            }
            (false, Some(async_state)) => {
                let _ = async_state.tx.send(WorkerMsg::Shutdown);
                if let Some(handle) = async_state.handle.take() {
                    let _ = handle.join();
                }
                *state = None;
            }
            _ => {}
        }
    }

    /// Block until the queue is empty and pending writes completed
    pub fn flush(&self) {
        let tx = {
            let state = self
                .core
                .async_state
                .lock()
                .expect("logger async state poisoned");
            state.as_ref().map(|s| s.tx.clone())
        };
        if let Some(tx) = tx {
            let (ack_tx, ack_rx) = bounded(1);
            if tx.send(WorkerMsg::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
        if let Some(file) = self.lock_sinks().file.as_mut() {
            let _ = file.file.flush();
        }
    }

    /// Submit a record built by the caller. Tests and engine internals use
    /// this directly; the global `log` facade routes here as well.
    pub fn submit(&self, record: LogRecord) {
        if record.level > self.level() {
            return;
        }
        let tx = {
            let state = self
                .core
                .async_state
                .lock()
                .expect("logger async state poisoned");
            state.as_ref().map(|s| s.tx.clone())
        };
        match tx {
            Some(tx) => {
                self.core.queue_len.fetch_add(1, Ordering::AcqRel);
                if tx.send(WorkerMsg::Record(record)).is_err() {
                    self.core.queue_len.fetch_sub(1, Ordering::AcqRel);
                }
            }
            None => self.core.deliver(&record),
        }
    }

    /// Convenience entry point for string messages
    pub fn log_str(&self, level: Level, message: impl Into<String>) {
        self.submit(LogRecord {
            level,
            message: message.into(),
            target: "prism".to_string(),
            file: None,
            line: None,
            timestamp: SystemTime::now(),
            thread: format!("{:?}", std::thread::current().id()),
        });
    }

    fn lock_sinks(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.core.sinks.lock().expect("logger sink state poisoned")
    }
}

impl Default for EngineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoggerCore {
    fn drop(&mut self) {
        if let Ok(mut state) = self.async_state.lock() {
            if let Some(async_state) = state.take() {
                let _ = async_state.tx.send(WorkerMsg::Shutdown);
                if let Some(handle) = async_state.handle {
                    let _ = handle.join();
                }
            }
        }
    }
}

impl log::Log for EngineLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.submit(LogRecord {
            level: record.level(),
            message: record.args().to_string(),
            target: record.target().to_string(),
            file: record.file().map(str::to_string),
            line: record.line(),
            timestamp: SystemTime::now(),
            thread: format!("{:?}", std::thread::current().id()),
        });
    }

    fn flush(&self) {
        EngineLogger::flush(self);
    }
}

impl LoggerCore {
    /// Write a record through every configured sink. Runs on the drain
    /// thread in async mode and on the caller thread otherwise.
    fn deliver(&self, record: &LogRecord) {
        let mut sinks = self.sinks.lock().expect("logger sink state poisoned");

        let plain = format_record(record, sinks.thread_ids, false);
        if sinks.console {
            let line = if sinks.color {
                format_record(record, sinks.thread_ids, true)
            } else {
                plain.clone()
            };
            eprintln!("{line}");
        }

        let max_size = sinks.max_file_size;
        if let Some(file) = sinks.file.as_mut() {
            if let Err(e) = file.write_line(&plain, max_size) {
                if sinks.console {
                    eprintln!("log file write failed: {e}");
                }
            }
        }

        if let Some(callback) = sinks.callback.as_ref() {
            let result = catch_unwind(AssertUnwindSafe(|| callback(record)));
            if result.is_err() && !sinks.callback_failed {
                sinks.callback_failed = true;
                let notice = LogRecord {
                    level: Level::Error,
                    message: "log callback panicked; further panics suppressed".to_string(),
                    target: "prism::logging".to_string(),
                    file: None,
                    line: None,
                    timestamp: SystemTime::now(),
                    thread: record.thread.clone(),
                };
                let line = format_record(&notice, sinks.thread_ids, false);
                if sinks.console {
                    eprintln!("{line}");
                }
                if let Some(file) = sinks.file.as_mut() {
                    let _ = file.write_line(&line, max_size);
                }
            }
        }
    }
}

fn drain_worker(
    rx: &crossbeam_channel::Receiver<WorkerMsg>,
    core: &Weak<LoggerCore>,
    queue_len: &AtomicUsize,
) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WorkerMsg::Record(record) => {
                if let Some(core) = core.upgrade() {
                    core.deliver(&record);
                }
                queue_len.fetch_sub(1, Ordering::AcqRel);
            }
            WorkerMsg::Flush(ack) => {
                let _ = ack.send(());
            }
            WorkerMsg::Shutdown => break,
        }
    }
}

fn format_record(record: &LogRecord, thread_ids: bool, color: bool) -> String {
    let datetime: DateTime<Local> = record.timestamp.into();
    let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

    let level = if color {
        match record.level {
            Level::Trace => "TRACE".bright_black().to_string(),
            Level::Debug => "DEBUG".cyan().to_string(),
            Level::Info => "INFO ".green().to_string(),
            Level::Warn => "WARN ".yellow().to_string(),
            Level::Error => "ERROR".red().bold().to_string(),
        }
    } else {
        match record.level {
            Level::Trace => "TRACE".to_string(),
            Level::Debug => "DEBUG".to_string(),
            Level::Info => "INFO ".to_string(),
            Level::Warn => "WARN ".to_string(),
            Level::Error => "ERROR".to_string(),
        }
    };

    let mut line = format!("[{timestamp}] [{level}] [{}]", record.target);
    if thread_ids {
        line.push_str(&format!(" [{}]", record.thread));
    }
    line.push(' ');
    line.push_str(&record.message);
    if let (Some(file), Some(line_no)) = (record.file.as_deref(), record.line) {
        if record.level == Level::Error {
            line.push_str(&format!(" ({file}:{line_no})"));
        }
    }
    line
}

fn level_filter_to_usize(level: LevelFilter) -> usize {
    match level {
        LevelFilter::Off => 0,
        LevelFilter::Error => 1,
        LevelFilter::Warn => 2,
        LevelFilter::Info => 3,
        LevelFilter::Debug => 4,
        LevelFilter::Trace => 5,
    }
}

fn usize_to_level_filter(value: usize) -> LevelFilter {
    match value {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn quiet_config() -> LogConfig {
        LogConfig {
            console: false,
            color: false,
            ..LogConfig::default()
        }
    }

    fn collector() -> (Arc<StdMutex<Vec<String>>>, LogCallback) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: LogCallback = Box::new(move |record: &LogRecord| {
            sink.lock().unwrap().push(record.message.clone());
        });
        (seen, callback)
    }

    #[test]
    fn drops_records_below_level() {
        let logger = EngineLogger::with_config(&quiet_config()).unwrap();
        let (seen, callback) = collector();
        logger.set_callback(callback);
        logger.set_level(LevelFilter::Warn);

        logger.log_str(Level::Info, "dropped");
        logger.log_str(Level::Error, "kept");

        assert_eq!(seen.lock().unwrap().as_slice(), ["kept"]);
    }

    #[test]
    fn async_flush_retains_submission_order() {
        let mut config = quiet_config();
        config.async_mode = true;
        let logger = EngineLogger::with_config(&config).unwrap();
        let (seen, callback) = collector();
        logger.set_callback(callback);

        for i in 0..200 {
            logger.log_str(Level::Info, format!("record-{i}"));
        }
        logger.flush();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 200);
        for (i, message) in seen.iter().enumerate() {
            assert_eq!(message, &format!("record-{i}"));
        }
        assert_eq!(logger.queue_len(), 0);
    }

    #[test]
    fn async_multi_thread_total_count_preserved() {
        let mut config = quiet_config();
        config.async_mode = true;
        let logger = EngineLogger::with_config(&config).unwrap();
        let (seen, callback) = collector();
        logger.set_callback(callback);

        let mut handles = Vec::new();
        for t in 0..4 {
            let logger = logger.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    logger.log_str(Level::Info, format!("t{t}-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        logger.flush();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 200);
        // Per-thread submission order survives the shared queue.
        for t in 0..4 {
            let prefix = format!("t{t}-");
            let ordered: Vec<_> = seen.iter().filter(|m| m.starts_with(&prefix)).collect();
            for (i, message) in ordered.iter().enumerate() {
                assert_eq!(**message, format!("t{t}-{i}"));
            }
        }
    }

    #[test]
    fn toggling_async_mode_flushes() {
        let logger = EngineLogger::with_config(&quiet_config()).unwrap();
        let (seen, callback) = collector();
        logger.set_callback(callback);

        logger.set_async(true);
        logger.log_str(Level::Info, "queued");
        logger.set_async(false);

        assert_eq!(seen.lock().unwrap().as_slice(), ["queued"]);
        assert!(!logger.is_async());
    }

    #[test]
    fn callback_panic_reported_once() {
        let logger = EngineLogger::with_config(&quiet_config()).unwrap();
        logger.set_callback(Box::new(|_| panic!("boom")));

        // Neither call propagates the panic out of the logger.
        logger.log_str(Level::Info, "first");
        logger.log_str(Level::Info, "second");
    }

    #[test]
    fn file_sink_writes_bom_and_rotates() {
        let dir = std::env::temp_dir().join(format!("prism_log_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("engine.log");

        let logger = EngineLogger::with_config(&quiet_config()).unwrap();
        logger.enable_file(&path).unwrap();
        logger.set_max_file_size(256);

        for i in 0..64 {
            logger.log_str(Level::Info, format!("rotation filler line {i}"));
        }
        logger.flush();
        logger.disable_file();

        let current = fs::read(&path).unwrap();
        assert_eq!(&current[..3], UTF8_BOM);

        let rotated = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path() != path)
            .count();
        assert!(rotated >= 1, "expected at least one rotated file");

        let _ = fs::remove_dir_all(&dir);
    }
}
