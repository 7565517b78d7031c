//! Optional per-session trace: raw PTY dump plus a JSONL event log.
//!
//! When a polling assertion fails in CI, `raw.bin` replays exactly what the
//! child emitted and `events.jsonl` shows what the harness did about it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde_json::json;

use crate::error::Result;

pub struct Recording {
    start: Instant,
    events: BufWriter<File>,
    raw: BufWriter<File>,
}

impl Recording {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let events = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dir.join("events.jsonl"))?;
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dir.join("raw.bin"))?;

        Ok(Self {
            start: Instant::now(),
            events: BufWriter::new(events),
            raw: BufWriter::new(raw),
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn log(&mut self, event: serde_json::Value) -> Result<()> {
        let mut line = json!({"ms": self.elapsed_ms()});
        if let (Some(obj), Some(extra)) = (line.as_object_mut(), event.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        writeln!(self.events, "{line}")?;
        Ok(())
    }

    pub fn append_raw(&mut self, data: &[u8]) -> Result<()> {
        self.raw.write_all(data)?;
        Ok(())
    }

    pub fn log_send(&mut self, input: &str) -> Result<()> {
        self.log(json!({"send": input}))
    }

    pub fn log_match(&mut self, pattern: &str) -> Result<()> {
        self.log(json!({"match": pattern}))
    }

    pub fn log_timeout(&mut self, pattern: &str) -> Result<()> {
        self.log(json!({"timeout": pattern}))
    }

    pub fn log_exit(&mut self, code: i32) -> Result<()> {
        self.log(json!({"exit": code}))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.events.flush()?;
        self.raw.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;
