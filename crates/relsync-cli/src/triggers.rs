use anyhow::Result;
use clap::ValueEnum;
use relsync_core::{StateLayout, SyncConfig, Trigger};
use tracing::{info, warn};

use crate::orchestrator::PassReport;
use crate::pass_lock::PassLock;

/// Host events that can fire an update pass from the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum TriggerKind {
    Startup,
    Reload,
    Periodic,
}

impl From<TriggerKind> for Trigger {
    fn from(value: TriggerKind) -> Self {
        match value {
            TriggerKind::Startup => Trigger::Startup,
            TriggerKind::Reload => Trigger::Reload,
            TriggerKind::Periodic => Trigger::Periodic,
        }
    }
}

/// Runs `pass` under the pass lock when `trigger` is enabled. Returns
/// `None` when configuration disables the trigger.
pub(crate) fn run_triggered_pass<F>(
    config: &SyncConfig,
    state: &StateLayout,
    trigger: Trigger,
    pass: F,
) -> Result<Option<PassReport>>
where
    F: FnOnce() -> Result<PassReport>,
{
    if !config.trigger_enabled(trigger) {
        info!(trigger = trigger.as_str(), "trigger disabled by config");
        return Ok(None);
    }

    let _lock = PassLock::acquire(state)?;
    info!(trigger = trigger.as_str(), "update pass started");
    let report = pass()?;
    info!(
        trigger = trigger.as_str(),
        updated = report.installed_count(),
        up_to_date = report.up_to_date_count(),
        failed = report.failed_count(),
        "update pass finished"
    );
    Ok(Some(report))
}

#[derive(Debug)]
pub(crate) enum WatchedPass {
    Finished(PassReport),
    Disabled,
    Skipped,
}

/// Runs one pass of the watch loop. A pass that cannot run, for example
/// because another command holds the pass lock, is logged and reported as
/// skipped so the loop keeps going.
pub(crate) fn run_watched_pass<F>(
    config: &SyncConfig,
    state: &StateLayout,
    trigger: Trigger,
    pass: F,
) -> WatchedPass
where
    F: FnOnce() -> Result<PassReport>,
{
    match run_triggered_pass(config, state, trigger, pass) {
        Ok(Some(report)) => WatchedPass::Finished(report),
        Ok(None) => WatchedPass::Disabled,
        Err(err) => {
            warn!(
                trigger = trigger.as_str(),
                error = %format!("{err:#}"),
                "update pass skipped"
            );
            WatchedPass::Skipped
        }
    }
}
