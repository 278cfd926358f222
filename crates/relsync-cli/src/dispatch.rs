use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use relsync_core::{default_state_dir, HostLayout, StateLayout, SyncConfig, Trigger};
use relsync_manifest::ManifestStore;
use relsync_resolver::{GithubTransport, DEFAULT_USER_AGENT};

use crate::completion::write_completions_script;
use crate::orchestrator::{remove_unit, Orchestrator, PassReport};
use crate::pass_lock::PassLock;
use crate::render::{
    format_pass_report, format_removal, format_unit_lines, format_unit_report,
    render_status_line, DownloadProgress, OutputStyle,
};
use crate::triggers::{run_triggered_pass, run_watched_pass, WatchedPass};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let style = OutputStyle::detect(cli.plain);
    if let Commands::Completions { shell } = cli.command {
        let mut stdout = io::stdout().lock();
        return write_completions_script(shell, &mut stdout);
    }

    let state = StateLayout::new(match cli.state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    });
    state.ensure_base_dirs()?;
    let config = SyncConfig::load_or_create(&state.config_path())?;
    let host = config.host_layout(resolve_host_root(cli.host_root, &config)?);
    let store = ManifestStore::new(state.manifest_path());

    // Mutating commands read the manifest only once they hold the pass lock.
    match cli.command {
        Commands::List => print_lines(&format_unit_lines(&store.load_or_create()?)),
        Commands::Remove { target } => {
            let _lock = PassLock::acquire(&state)?;
            let mut manifest = store.load_or_create()?;
            let removed = remove_unit(&host, &store, &mut manifest, &target)?;
            print_lines(&format_removal(style, &removed));
        }
        Commands::Update {
            identifier: Some(identifier),
        } => {
            let _lock = PassLock::acquire(&state)?;
            let mut manifest = store.load_or_create()?;
            let report = with_orchestrator(&config, &state, &host, style, |orchestrator| {
                orchestrator.update_named(&store, &mut manifest, &identifier)
            })?;
            println!("{}", format_unit_report(style, &report));
        }
        Commands::Update { identifier: None } => {
            let report = with_orchestrator(&config, &state, &host, style, |orchestrator| {
                run_triggered_pass(&config, &state, Trigger::Manual, || {
                    orchestrator.run_pass(&store)
                })
            })?;
            print_pass(style, Trigger::Manual, report);
        }
        Commands::Install {
            identifier,
            no_auto_update,
        } => {
            let _lock = PassLock::acquire(&state)?;
            let mut manifest = store.load_or_create()?;
            let unit = with_orchestrator(&config, &state, &host, style, |orchestrator| {
                orchestrator.install_unit(&store, &mut manifest, &identifier, !no_auto_update)
            })?;
            println!(
                "{}",
                render_status_line(
                    style,
                    "ok",
                    &format!(
                        "installed {} {} into '{}'",
                        unit.identifier,
                        unit.version.as_deref().unwrap_or("-"),
                        unit.directory.as_deref().unwrap_or("-")
                    ),
                )
            );
        }
        Commands::Trigger { kind } => {
            let trigger = Trigger::from(kind);
            let report = with_orchestrator(&config, &state, &host, style, |orchestrator| {
                run_triggered_pass(&config, &state, trigger, || orchestrator.run_pass(&store))
            })?;
            print_pass(style, trigger, report);
        }
        Commands::Watch => {
            with_orchestrator(&config, &state, &host, style, |orchestrator| {
                let startup = run_watched_pass(&config, &state, Trigger::Startup, || {
                    orchestrator.run_pass(&store)
                });
                print_watched_pass(style, Trigger::Startup, startup);

                if !config.trigger_enabled(Trigger::Periodic) {
                    println!(
                        "{}",
                        render_status_line(
                            style,
                            "skip",
                            "periodic updates are disabled (update_on_map_change=false)",
                        )
                    );
                    return Ok(());
                }

                let interval = Duration::from_secs(config.periodic_interval_secs);
                loop {
                    thread::sleep(interval);
                    let periodic = run_watched_pass(&config, &state, Trigger::Periodic, || {
                        orchestrator.run_pass(&store)
                    });
                    print_watched_pass(style, Trigger::Periodic, periodic);
                }
            })?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Builds the network transport, validating the configured credential
/// before any release query goes out.
fn connect(config: &SyncConfig) -> Result<GithubTransport> {
    let transport =
        GithubTransport::new(&config.api_base_url, DEFAULT_USER_AGENT, config.api_token())?;
    transport
        .validate_credential()
        .context("api_token validation failed")?;
    Ok(transport)
}

fn with_orchestrator<T>(
    config: &SyncConfig,
    state: &StateLayout,
    host: &HostLayout,
    style: OutputStyle,
    run: impl FnOnce(&mut Orchestrator<'_>) -> Result<T>,
) -> Result<T> {
    let transport = connect(config)?;
    let mut progress = DownloadProgress::new(style);
    let mut orchestrator = Orchestrator::new(
        &transport,
        &config.api_base_url,
        host,
        state.downloads_dir(),
        &config.artifact_extension,
        &mut progress,
    );
    run(&mut orchestrator)
}

fn resolve_host_root(flag: Option<PathBuf>, config: &SyncConfig) -> Result<PathBuf> {
    if let Some(root) = flag.or_else(|| config.host_root.clone()) {
        return Ok(root);
    }
    std::env::current_dir().context("failed to resolve current directory as host root")
}

fn print_pass(style: OutputStyle, trigger: Trigger, report: Option<PassReport>) {
    match report {
        Some(report) => print_lines(&format_pass_report(style, &report)),
        None => println!(
            "{}",
            render_status_line(
                style,
                "skip",
                &format!("{} trigger is disabled by config", trigger.as_str()),
            )
        ),
    }
}

fn print_watched_pass(style: OutputStyle, trigger: Trigger, pass: WatchedPass) {
    match pass {
        WatchedPass::Finished(report) => print_pass(style, trigger, Some(report)),
        WatchedPass::Disabled => print_pass(style, trigger, None),
        WatchedPass::Skipped => println!(
            "{}",
            render_status_line(
                style,
                "warn",
                &format!("{} update pass skipped", trigger.as_str()),
            )
        ),
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
