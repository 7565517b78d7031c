//! screenprobe: a terminal-emulation test harness.
//!
//! Spawns a process inside a pseudo-terminal, interprets its raw output
//! into a grid of styled cells, and lets tests poll for text and compare
//! canonical screen snapshots against committed baselines.
//!
//! ```no_run
//! use screenprobe::{Session, SessionConfig};
//!
//! # async fn example() -> screenprobe::Result<()> {
//! let session = Session::open(SessionConfig::shell_session().size(80, 50))?;
//! session.submit("journal --help").await?;
//! session.find_any(&["help", "Help", "HELP"]).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod parser;
pub mod pty;
pub mod query;
pub mod recording;
pub mod screen;
pub mod session;
pub mod snapshot;

pub use error::{Error, Result};
pub use query::{FindOptions, Match};
pub use screen::{Attrs, Cell, Color, Screen};
pub use session::{Session, SessionConfig};
pub use snapshot::{BaselineMode, Comparison, SnapshotRecord, SnapshotStore};
