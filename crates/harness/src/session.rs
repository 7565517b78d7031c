//! Session orchestration.
//!
//! A [`Session`] ties one PTY, one screen, and one output-pump task
//! together behind the only surface test code needs: submit input, poll
//! for text, capture snapshots, close. Teardown runs on every exit path;
//! dropping an open session force-kills the child.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::pty::Pty;
use crate::query::{self, FindOptions, Match, SharedScreen};
use crate::recording::Recording;
use crate::screen::Screen;
use crate::snapshot::SnapshotRecord;

/// How long a closing session waits between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Session configuration. `command: None` hosts a bare interactive shell,
/// the mode used when tests drive the session line-by-line via `submit`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub shell: String,
    pub command: Option<String>,
    pub rows: u16,
    pub cols: u16,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub env: Vec<(String, String)>,
    /// When set, raw output and harness events are traced here.
    pub record_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            command: None,
            rows: 24,
            cols: 80,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(25),
            env: Vec::new(),
            record_dir: None,
        }
    }
}

impl SessionConfig {
    /// Config for running a single command to completion.
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::default()
        }
    }

    /// Config hosting an interactive shell.
    pub fn shell_session() -> Self {
        Self::default()
    }

    pub fn shell_path(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn record_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = Some(dir.into());
        self
    }

    /// Query defaults derived from this config.
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            case_sensitive: true,
        }
    }
}

/// One live terminal session. Independent of every other session: no
/// globals, no shared state beyond what the caller passes in.
pub struct Session {
    config: SessionConfig,
    screen: SharedScreen,
    pty: Option<Arc<Pty>>,
    pump: Option<JoinHandle<()>>,
    recording: Option<Arc<Mutex<Recording>>>,
    eof: Arc<AtomicBool>,
}

impl Session {
    /// Spawn the configured process in a PTY and start pumping its output
    /// into the screen model.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let pty = Arc::new(Pty::spawn(&config)?);
        let screen: SharedScreen = Arc::new(Mutex::new(Screen::new(
            config.cols as usize,
            config.rows as usize,
        )));
        let recording = match config.record_dir.as_deref().map(Recording::new).transpose() {
            Ok(rec) => rec.map(|r| Arc::new(Mutex::new(r))),
            Err(e) => {
                pty.kill_now();
                return Err(e);
            }
        };
        let eof = Arc::new(AtomicBool::new(false));

        let pump = tokio::spawn(pump_output(
            Arc::clone(&pty),
            Arc::clone(&screen),
            recording.clone(),
            Arc::clone(&eof),
        ));

        Ok(Self {
            config,
            screen,
            pty: Some(pty),
            pump: Some(pump),
            recording,
            eof,
        })
    }

    fn pty(&self) -> Result<&Arc<Pty>> {
        self.pty.as_ref().ok_or(Error::ClosedSession)
    }

    /// Forward raw bytes to the child as if typed.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let pty = self.pty()?;
        if let Some(rec) = &self.recording {
            rec.lock().log_send(&String::from_utf8_lossy(data))?;
        }
        pty.write(data).await
    }

    /// Type a line and press enter.
    pub async fn submit(&self, line: &str) -> Result<()> {
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.write(&data).await
    }

    /// Poll for plain text with the session's default timeout and cadence.
    pub async fn find_text(&self, pattern: &str) -> Result<Match> {
        self.find_text_with(pattern, &self.config.find_options()).await
    }

    pub async fn find_text_with(&self, pattern: &str, opts: &FindOptions) -> Result<Match> {
        self.pty()?;
        self.record(query::find_text(&self.screen, pattern, opts).await)
    }

    /// First-match-wins race over candidate patterns under one timeout.
    pub async fn find_any(&self, patterns: &[&str]) -> Result<Match> {
        self.find_any_with(patterns, &self.config.find_options()).await
    }

    pub async fn find_any_with(&self, patterns: &[&str], opts: &FindOptions) -> Result<Match> {
        self.pty()?;
        self.record(query::find_any(&self.screen, patterns, opts).await)
    }

    /// Poll for a regex over the rendered screen.
    pub async fn find_regex(&self, pattern: &Regex) -> Result<Match> {
        self.find_regex_with(pattern, &self.config.find_options()).await
    }

    pub async fn find_regex_with(&self, pattern: &Regex, opts: &FindOptions) -> Result<Match> {
        self.pty()?;
        self.record(query::find_regex(&self.screen, pattern, opts).await)
    }

    fn record(&self, result: Result<Match>) -> Result<Match> {
        if let Some(rec) = &self.recording {
            let mut rec = rec.lock();
            match &result {
                Ok(m) => rec.log_match(&m.pattern).ok(),
                Err(Error::TextNotFound { pattern, .. }) => rec.log_timeout(pattern).ok(),
                Err(_) => None,
            };
        }
        result
    }

    /// Canonical text-only snapshot of the current screen.
    pub fn capture(&self) -> SnapshotRecord {
        SnapshotRecord::capture(&self.screen.lock(), false)
    }

    /// Snapshot with inline style markers.
    pub fn capture_styled(&self) -> SnapshotRecord {
        SnapshotRecord::capture(&self.screen.lock(), true)
    }

    /// The rendered screen right now, rows joined with newlines.
    pub fn screen_text(&self) -> String {
        self.screen.lock().render()
    }

    /// True once the child has closed its side of the PTY.
    pub fn saw_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    /// Wait (up to `timeout`) for the child to exit on its own; returns
    /// its exit code and tears the session down. A child still running
    /// when the budget expires is terminated via the usual grace path.
    pub async fn wait_eof(&mut self, timeout: Duration) -> Result<i32> {
        let pty = Arc::clone(self.pty()?);
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.saw_eof() {
            if tokio::time::Instant::now() >= deadline {
                return self.teardown(KILL_GRACE).await;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        // EOF only means the child closed its side of the PTY; it may
        // keep running, so the reap honors the same deadline.
        match pty.wait_until(deadline).await? {
            Some(code) => {
                self.finish_pump().await;
                self.pty = None;
                self.flush_recording(code)?;
                Ok(code)
            }
            None => self.teardown(KILL_GRACE).await,
        }
    }

    /// Terminate the child (SIGTERM, then SIGKILL after a grace period)
    /// and release the device. Returns the child's exit code.
    pub async fn close(mut self) -> Result<i32> {
        self.teardown(KILL_GRACE).await
    }

    async fn teardown(&mut self, grace: Duration) -> Result<i32> {
        let pty = self.pty.take().ok_or(Error::ClosedSession)?;
        let code = pty.close(grace).await?;
        self.finish_pump().await;
        self.flush_recording(code)?;
        Ok(code)
    }

    async fn finish_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            // The pump exits on its own once the PTY reads EOF/EIO; give
            // it a moment, then stop waiting.
            let _ = tokio::time::timeout(Duration::from_secs(1), pump).await;
        }
    }

    fn flush_recording(&self, code: i32) -> Result<()> {
        if let Some(rec) = &self.recording {
            let mut rec = rec.lock();
            rec.log_exit(code)?;
            rec.flush()?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(pty) = self.pty.take() {
            tracing::debug!("session dropped while open, killing child");
            pty.kill_now();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// The output pump: single writer of the screen model. Reads arrive in
/// child order and are applied as whole chunks under the lock, so queries
/// never observe a half-interpreted update.
async fn pump_output(
    pty: Arc<Pty>,
    screen: SharedScreen,
    recording: Option<Arc<Mutex<Recording>>>,
    eof: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match pty.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(rec) = &recording {
                    if let Err(e) = rec.lock().append_raw(&buf[..n]) {
                        tracing::warn!(error = %e, "recording write failed");
                    }
                }
                screen.lock().feed(&buf[..n]);
            }
            Err(e) => {
                tracing::debug!(error = %e, "output pump stopped");
                break;
            }
        }
    }
    eof.store(true, Ordering::Release);
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
