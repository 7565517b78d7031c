use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use screenprobe::{BaselineMode, Comparison, Session, SessionConfig, SnapshotStore};

#[derive(Parser, Debug)]
#[command(
    name = "screenprobe",
    about = "Run a command in a PTY, wait for text, verify a screen snapshot"
)]
struct Args {
    /// Terminal width
    #[arg(long, default_value = "80")]
    cols: u16,

    /// Terminal height
    #[arg(long, default_value = "24")]
    rows: u16,

    /// Text to wait for before capturing
    #[arg(long)]
    wait: Option<String>,

    /// Poll timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Baseline file to compare the final screen against
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Create or overwrite the baseline instead of verifying
    #[arg(long)]
    update: bool,

    /// Directory for raw output and event traces
    #[arg(long)]
    record: Option<PathBuf>,

    /// Command to run
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = SessionConfig::command(args.command.join(" "))
        .size(args.cols, args.rows)
        .timeout(Duration::from_millis(args.timeout_ms));
    if let Some(dir) = &args.record {
        config = config.record_to(dir);
    }

    let mut session = Session::open(config)?;

    if let Some(pattern) = &args.wait {
        if let Err(e) = session.find_text(pattern).await {
            eprintln!("screenprobe: {e}");
            drop(session);
            std::process::exit(1);
        }
    }

    let exit_code = session
        .wait_eof(Duration::from_millis(args.timeout_ms))
        .await?;

    if let Some(path) = &args.snapshot {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let key = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "screen".to_string());
        let mode = if args.update {
            BaselineMode::Update
        } else {
            BaselineMode::from_env()
        };
        let store = SnapshotStore::new(dir, mode);
        match store.compare(&session.capture(), &key)? {
            Comparison::Match => {}
            Comparison::Diff { diff, .. } => {
                eprintln!("screenprobe: snapshot mismatch for '{key}':\n{diff}");
                std::process::exit(1);
            }
        }
    }

    std::process::exit(exit_code);
}
