use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Destination for user-facing lines.
///
/// Every component that talks to the user receives a [`Console`] wrapping one
/// of these; nothing prints directly.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
    }
}

/// Used when stdout is reserved for machine-readable output.
#[derive(Debug, Default)]
pub struct StderrSink;

impl OutputSink for StderrSink {
    fn write_line(&self, line: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

/// Collects lines in memory; used by tests and by callers that render output later.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// All captured lines joined the way a terminal would show them.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| format!("{line}\n"))
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Verbosity levels: 0 silent, 1 normal, 2 and above echo subprocess details.
pub const VERBOSITY_NORMAL: u8 = 1;
pub const VERBOSITY_DEEP_DEBUG: u8 = 2;

#[derive(Clone)]
pub struct Console {
    sink: Arc<dyn OutputSink>,
    verbosity: u8,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

impl Console {
    pub fn new(sink: Arc<dyn OutputSink>, verbosity: u8) -> Self {
        Self { sink, verbosity }
    }

    #[must_use]
    pub fn stdout(verbosity: u8) -> Self {
        Self::new(Arc::new(StdoutSink), verbosity)
    }

    #[must_use]
    pub fn stderr(verbosity: u8) -> Self {
        Self::new(Arc::new(StderrSink), verbosity)
    }

    #[must_use]
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    #[must_use]
    pub fn is_deep_debug(&self) -> bool {
        self.verbosity >= VERBOSITY_DEEP_DEBUG
    }

    pub fn info(&self, prefix: Option<&str>, message: &str) {
        if self.verbosity < VERBOSITY_NORMAL {
            return;
        }
        match prefix {
            Some(prefix) => self.write_block(&format!("[{prefix}] {message}")),
            None => self.write_block(message),
        }
    }

    /// Warnings are shown at every verbosity.
    pub fn warning(&self, message: &str) {
        tracing::warn!("{}", message.trim());
        self.write_block(message);
    }

    pub fn debug(&self, message: &str) {
        if self.is_deep_debug() {
            self.write_block(message);
        }
    }

    fn write_block(&self, message: &str) {
        for line in message.split('\n') {
            self.sink.write_line(line);
        }
    }
}
