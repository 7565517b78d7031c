//! Bounded-polling queries over the live screen.
//!
//! Every poll takes a consistent locked read of the grid; the output pump
//! keeps feeding it in between. A query that times out simply stops
//! polling, nothing to roll back.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;

use crate::error::{Error, Result};
use crate::screen::Screen;

pub type SharedScreen = Arc<Mutex<Screen>>;

/// Options for a single query. The defaults match interactive-CLI latency:
/// 5 s budget, 25 ms cadence, case-sensitive.
#[derive(Debug, Clone)]
pub struct FindOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub case_sensitive: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(25),
            case_sensitive: true,
        }
    }
}

impl FindOptions {
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// Location of a successful text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub row: usize,
    pub col: usize,
    /// The pattern that matched; with `find_any` this names the winner.
    pub pattern: String,
}

async fn poll_until<F>(pattern_desc: &str, opts: &FindOptions, mut check: F) -> Result<Match>
where
    F: FnMut() -> Option<Match>,
{
    let deadline = tokio::time::Instant::now() + opts.timeout;
    loop {
        if let Some(m) = check() {
            tracing::trace!(pattern = %m.pattern, row = m.row, col = m.col, "query matched");
            return Ok(m);
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!(pattern = %pattern_desc, timeout = ?opts.timeout, "query timed out");
            return Err(Error::TextNotFound {
                pattern: pattern_desc.to_string(),
                timeout: opts.timeout,
            });
        }
        tokio::time::sleep(opts.poll_interval).await;
    }
}

/// Poll for a plain-text pattern anywhere on the visible screen.
pub async fn find_text(screen: &SharedScreen, pattern: &str, opts: &FindOptions) -> Result<Match> {
    poll_until(pattern, opts, || {
        let screen = screen.lock();
        screen
            .find(pattern, opts.case_sensitive)
            .map(|(row, col)| Match {
                row,
                col,
                pattern: pattern.to_string(),
            })
    })
    .await
}

/// First-match-wins race over several candidate patterns, sharing one
/// timeout. This is the tool for text that may render in any of several
/// locale or casing variants: total latency is bounded by the single
/// timeout, not the sum of per-candidate budgets.
pub async fn find_any(
    screen: &SharedScreen,
    patterns: &[&str],
    opts: &FindOptions,
) -> Result<Match> {
    let desc = patterns.join(" | ");
    poll_until(&desc, opts, || {
        let screen = screen.lock();
        for pattern in patterns {
            if let Some((row, col)) = screen.find(pattern, opts.case_sensitive) {
                return Some(Match {
                    row,
                    col,
                    pattern: (*pattern).to_string(),
                });
            }
        }
        None
    })
    .await
}

/// Poll for a regex over the rendered screen text.
pub async fn find_regex(screen: &SharedScreen, pattern: &Regex, opts: &FindOptions) -> Result<Match> {
    poll_until(pattern.as_str(), opts, || {
        let screen = screen.lock();
        let rendered = screen.render();
        pattern.find(&rendered).map(|m| {
            let prefix = &rendered[..m.start()];
            let row = prefix.matches('\n').count();
            let col = prefix.rsplit('\n').next().map_or(0, |l| l.chars().count());
            Match {
                row,
                col,
                pattern: pattern.as_str().to_string(),
            }
        })
    })
    .await
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
