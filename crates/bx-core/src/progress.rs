use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(80);
const START_DELAY: Duration = Duration::from_millis(120);

static OUTPUT_LOCK: Mutex<()> = Mutex::new(());

/// Spinners render only on a terminal unless the caller says otherwise.
#[must_use]
pub fn progress_enabled(preference: Option<bool>) -> bool {
    preference.unwrap_or_else(|| io::stderr().is_terminal())
}

fn clear_progress_line() {
    let _guard = OUTPUT_LOCK.lock().ok();
    let _ = io::stderr().write_all(b"\r\x1b[2K");
    let _ = io::stderr().flush();
}

/// A stderr spinner shown while a long-running tool works.
///
/// The spinner stops and clears its line when dropped.
pub struct WaitBar {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WaitBar {
    pub fn start(label: impl Into<String>, enabled: bool) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        if !enabled {
            return Self { stop, handle: None };
        }
        let label = label.into();
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let started = Instant::now();
            let mut idx = 0usize;
            let mut rendered = false;
            while !flag.load(Ordering::Relaxed) {
                if started.elapsed() >= START_DELAY {
                    let frame = FRAMES[idx % FRAMES.len()];
                    idx = idx.wrapping_add(1);
                    let line = format!("\r\x1b[2Kbx ▸ {label} {frame}");
                    let _guard = OUTPUT_LOCK.lock().ok();
                    let _ = io::stderr().write_all(line.as_bytes());
                    let _ = io::stderr().flush();
                    rendered = true;
                }
                thread::sleep(TICK);
            }
            if rendered {
                clear_progress_line();
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn finish(mut self, message: impl Into<String>) {
        let active = self.is_active();
        self.stop();
        if active {
            eprintln!("bx ▸ {}", message.into());
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WaitBar {
    fn drop(&mut self) {
        self.stop();
    }
}
