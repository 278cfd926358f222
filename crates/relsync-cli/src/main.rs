mod completion;
mod dispatch;
mod orchestrator;
mod pass_lock;
mod render;
mod triggers;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::completion::CliCompletionShell;
use crate::dispatch::run_cli;
use crate::triggers::TriggerKind;

#[derive(Parser, Debug)]
#[command(name = "relsync")]
#[command(
    about = "Keeps release-tracked units in sync with their upstream releases",
    long_about = None,
    after_help = "Mutating commands hold <state-dir>/active-pass while they run. A marker left by a process that is no longer running is cleared on the next command; otherwise delete it by hand."
)]
struct Cli {
    /// State directory holding relsync.json and manifest.json.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Directory containing the first host segment.
    #[arg(long, global = true)]
    host_root: Option<PathBuf>,
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    List,
    Update {
        identifier: Option<String>,
    },
    Install {
        identifier: String,
        #[arg(long)]
        no_auto_update: bool,
    },
    Remove {
        target: String,
    },
    Trigger {
        #[arg(value_enum)]
        kind: TriggerKind,
    },
    Watch,
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> Result<()> {
    init_tracing();
    run_cli(Cli::parse())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests;
