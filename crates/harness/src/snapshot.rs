//! Canonical screen snapshots and baseline comparison.
//!
//! A snapshot is one line per grid row with trailing blanks trimmed, so
//! baselines stay human-diffable and stable across theme differences.
//! Style-aware capture is opt-in and encodes attribute runs inline.

use std::fs;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::error::{Error, Result};
use crate::screen::{Attrs, Screen};

/// Whether `compare` may create missing baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineMode {
    /// Fail with `MissingBaseline` when no baseline exists. CI default.
    #[default]
    Verify,
    /// Write the captured text as the new baseline and report a match.
    Update,
}

impl BaselineMode {
    /// Explicit CI wiring: `SCREENPROBE_UPDATE=1` selects update mode.
    /// Absence always means verify; the mode is never inferred from the
    /// state of the baseline directory.
    pub fn from_env() -> Self {
        match std::env::var("SCREENPROBE_UPDATE").as_deref() {
            Ok("1") | Ok("true") => Self::Update,
            _ => Self::Verify,
        }
    }
}

/// A canonical textual rendering of the screen at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    text: String,
}

impl SnapshotRecord {
    /// Render the grid. `style_aware` wraps attribute runs in inline
    /// `{+b}`/`{-b}` (bold), `{+u}`/`{-u}` (underline), `{+i}`/`{-i}`
    /// (inverse) markers; the default text-only form ignores styling.
    pub fn capture(screen: &Screen, style_aware: bool) -> Self {
        let text = if style_aware {
            Self::render_styled(screen)
        } else {
            screen.render()
        };
        Self { text }
    }

    fn render_styled(screen: &Screen) -> String {
        let grid = screen.grid();
        let mut lines = Vec::with_capacity(grid.rows());
        for row in 0..grid.rows() {
            let width = grid.row_text(row).chars().count();
            let mut line = String::new();
            let mut active = Attrs::empty();
            for col in 0..width {
                let cell = match grid.cell(row, col) {
                    Some(c) => *c,
                    None => break,
                };
                for (flag, tag) in [
                    (Attrs::BOLD, 'b'),
                    (Attrs::UNDERLINE, 'u'),
                    (Attrs::INVERSE, 'i'),
                ] {
                    if cell.attrs.contains(flag) && !active.contains(flag) {
                        line.push_str(&format!("{{+{tag}}}"));
                    }
                    if !cell.attrs.contains(flag) && active.contains(flag) {
                        line.push_str(&format!("{{-{tag}}}"));
                    }
                }
                active = cell.attrs;
                line.push(cell.ch);
            }
            for (flag, tag) in [
                (Attrs::BOLD, 'b'),
                (Attrs::UNDERLINE, 'u'),
                (Attrs::INVERSE, 'i'),
            ] {
                if active.contains(flag) {
                    line.push_str(&format!("{{-{tag}}}"));
                }
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Outcome of a baseline comparison. A mismatch is data, not an error:
/// the caller decides how to fail the test and gets the full diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Diff {
        baseline: String,
        captured: String,
        /// Unified diff, baseline on the left.
        diff: String,
    },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

/// Baseline files on disk, one `<key>.snap` per test identity.
pub struct SnapshotStore {
    dir: PathBuf,
    mode: BaselineMode,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, mode: BaselineMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn baseline_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.snap"))
    }

    /// Compare a capture against the stored baseline for `key`.
    ///
    /// Missing baseline: error in verify mode; in update mode the capture
    /// becomes the baseline and the result is a match. Comparison is exact
    /// line-by-line, no fuzzy matching.
    pub fn compare(&self, record: &SnapshotRecord, key: &str) -> Result<Comparison> {
        let path = self.baseline_path(key);

        if !path.exists() {
            return match self.mode {
                BaselineMode::Verify => Err(Error::MissingBaseline {
                    key: key.to_string(),
                }),
                BaselineMode::Update => {
                    self.write_baseline(&path, record)?;
                    tracing::debug!(key, path = %path.display(), "baseline created");
                    Ok(Comparison::Match)
                }
            };
        }

        let baseline = canonicalize(&fs::read_to_string(&path)?);
        let captured = canonicalize(record.text());

        if baseline == captured {
            return Ok(Comparison::Match);
        }

        if self.mode == BaselineMode::Update {
            self.write_baseline(&path, record)?;
            tracing::debug!(key, path = %path.display(), "baseline updated");
            return Ok(Comparison::Match);
        }

        let diff = TextDiff::from_lines(&baseline, &captured)
            .unified_diff()
            .header("baseline", "captured")
            .to_string();
        Ok(Comparison::Diff {
            baseline,
            captured,
            diff,
        })
    }

    fn write_baseline(&self, path: &Path, record: &SnapshotRecord) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, record.text())?;
        Ok(())
    }
}

/// Normalize line endings and trailing whitespace so that editor or VCS
/// touch-ups of a committed baseline never produce spurious diffs.
fn canonicalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
