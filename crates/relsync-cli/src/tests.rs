use super::*;
use crate::completion::write_completions_script;
use crate::orchestrator::{remove_unit, Orchestrator, UnitOutcome, UnitStatus};
use crate::pass_lock::PassLock;
use crate::render::{format_pass_report, format_unit_lines, render_status_line, OutputStyle};
use crate::triggers::{run_triggered_pass, run_watched_pass, WatchedPass};
use relsync_core::{
    classify_failure, FailureClass, HostLayout, InstalledUnit, StateLayout, SyncConfig, Trigger,
    DEFAULT_HOST_SEGMENTS,
};
use relsync_installer::{MergeStrategy, NoopObserver, RemovalStatus};
use relsync_manifest::{Manifest, ManifestStore};
use relsync_resolver::{latest_release_url, StaticRoute, StaticTransport};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const API: &str = "https://api.example.test";

#[test]
fn install_unit_records_unit_after_first_successful_install() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v1.0.0",
        &[("Sample/Sample.dll", "v1"), ("Sample/lang/en.json", "{}")],
    );
    let mut manifest = fixture.store.load_or_create().expect("must load manifest");
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let unit = orchestrator
        .install_unit(&fixture.store, &mut manifest, "owner/Sample", true)
        .expect("must install");
    assert_eq!(unit.directory.as_deref(), Some("Sample"));
    assert_eq!(unit.version.as_deref(), Some("v1.0.0"));
    assert_eq!(read_file(&fixture.host.unit_dir("Sample").join("Sample.dll")), "v1");

    let persisted = fixture.store.load_or_create().expect("must reload manifest");
    assert_eq!(persisted.units, vec![unit]);
    assert!(
        fs::read_dir(&fixture.scratch)
            .expect("scratch dir must exist")
            .next()
            .is_none(),
        "scratch must be empty after install"
    );
}

#[test]
fn second_update_pass_is_up_to_date_and_queries_once() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v1.0.0",
        &[("Sample/Sample.dll", "v1")],
    );
    let mut manifest = Manifest::default();
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);
    orchestrator
        .install_unit(&fixture.store, &mut manifest, "owner/Sample", true)
        .expect("must install");
    let before = manifest.clone();
    transport.clear_requests();

    let report = orchestrator
        .update_all(&fixture.store, &mut manifest)
        .expect("pass must finish");
    assert_eq!(report.up_to_date_count(), 1);
    assert_eq!(report.installed_count(), 0);
    assert_eq!(
        transport.requests(),
        vec![latest_release_url(API, "owner/Sample")]
    );
    assert_eq!(manifest, before);
    assert_eq!(read_file(&fixture.host.unit_dir("Sample").join("Sample.dll")), "v1");
}

#[test]
fn update_one_reports_up_to_date_without_touching_disk() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v2",
        &[("Sample/Sample.dll", "v2")],
    );
    let unit = InstalledUnit {
        identifier: "owner/Sample".to_string(),
        directory: Some("Sample".to_string()),
        version: Some("v2".to_string()),
        auto_update: true,
    };
    let manifest = Manifest::new(vec![unit.clone()]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let outcome = orchestrator
        .update_one(&unit, &manifest)
        .expect("must resolve");
    assert_eq!(outcome, UnitOutcome::UpToDate);
    assert!(!fixture.host.unit_dir("Sample").exists());
}

#[test]
fn update_all_continues_past_failing_units_and_saves() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Working",
        "v3",
        &[("Working/Working.dll", "v3")],
    );
    let mut manifest = Manifest::new(vec![
        InstalledUnit::new("owner/Offline", true),
        InstalledUnit::new("owner/Working", true),
    ]);
    fixture.store.save(&manifest).expect("must seed manifest");
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let report = orchestrator
        .update_all(&fixture.store, &mut manifest)
        .expect("pass must finish");
    assert_eq!(report.results.len(), 2);
    assert!(matches!(
        report.results[0].status,
        UnitStatus::Failed {
            class: FailureClass::Transport,
            ..
        }
    ));
    assert_eq!(
        report.results[1].status,
        UnitStatus::Installed {
            tag: "v3".to_string(),
            strategy: MergeStrategy::Fallback,
        }
    );

    let persisted = fixture.store.load_or_create().expect("must reload manifest");
    assert_eq!(persisted.units[0], InstalledUnit::new("owner/Offline", true));
    assert_eq!(persisted.units[1].version.as_deref(), Some("v3"));
    assert_eq!(persisted.units[1].directory.as_deref(), Some("Working"));
}

#[test]
fn update_all_skips_units_without_auto_update() {
    let fixture = Fixture::new();
    let transport = StaticTransport::new();
    let mut manifest = Manifest::new(vec![InstalledUnit::new("owner/Pinned", false)]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let report = orchestrator
        .update_all(&fixture.store, &mut manifest)
        .expect("pass must finish");
    assert!(report.results.is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn update_named_updates_unit_regardless_of_auto_update() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Pinned",
        "v2",
        &[("Pinned/Pinned.dll", "v2")],
    );
    let mut manifest = Manifest::new(vec![InstalledUnit::new("owner/Pinned", false)]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let report = orchestrator
        .update_named(&fixture.store, &mut manifest, "owner/Pinned")
        .expect("must update");
    assert!(matches!(report.status, UnitStatus::Installed { ref tag, .. } if tag == "v2"));
    assert!(!manifest.units[0].auto_update);
    assert_eq!(manifest.units[0].version.as_deref(), Some("v2"));

    let err = orchestrator
        .update_named(&fixture.store, &mut manifest, "owner/Unknown")
        .expect_err("untracked unit must fail");
    assert!(err.to_string().contains("not tracked"));
}

#[test]
fn directory_change_is_a_conflict_and_leaves_manifest_untouched() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v2",
        &[("Renamed/Renamed.dll", "v2")],
    );
    let unit = InstalledUnit {
        identifier: "owner/Sample".to_string(),
        directory: Some("Sample".to_string()),
        version: Some("v1".to_string()),
        auto_update: true,
    };
    let mut manifest = Manifest::new(vec![unit.clone()]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let report = orchestrator
        .update_all(&fixture.store, &mut manifest)
        .expect("pass must finish");
    assert!(matches!(
        report.results[0].status,
        UnitStatus::Failed {
            class: FailureClass::DirectoryConflict,
            ..
        }
    ));
    assert_eq!(manifest.units, vec![unit]);
    assert!(!fixture.host.unit_dir("Renamed").exists());
}

#[test]
fn install_refuses_directory_owned_by_another_unit() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "fork/Sample",
        "v9",
        &[("Sample/Sample.dll", "fork")],
    );
    let owner = InstalledUnit {
        identifier: "owner/Sample".to_string(),
        directory: Some("Sample".to_string()),
        version: Some("v1".to_string()),
        auto_update: true,
    };
    let mut manifest = Manifest::new(vec![owner.clone()]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let err = orchestrator
        .install_unit(&fixture.store, &mut manifest, "fork/Sample", true)
        .expect_err("shared directory must conflict");
    assert_eq!(classify_failure(&err), FailureClass::DirectoryConflict);
    assert!(err.to_string().contains("owner/Sample"));
    assert_eq!(manifest.units, vec![owner]);
}

#[test]
fn install_rejects_tracked_or_malformed_identifiers_without_network() {
    let fixture = Fixture::new();
    let transport = StaticTransport::new();
    let mut manifest = Manifest::new(vec![InstalledUnit::new("owner/Sample", true)]);
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let err = orchestrator
        .install_unit(&fixture.store, &mut manifest, "owner/Sample", true)
        .expect_err("tracked unit must be rejected");
    assert!(err.to_string().contains("already tracked"));

    orchestrator
        .install_unit(&fixture.store, &mut manifest, "not-a-repo", true)
        .expect_err("malformed identifier must be rejected");
    assert!(transport.requests().is_empty());
    assert_eq!(manifest.units.len(), 1);
}

#[test]
fn missing_payload_fails_and_cleans_scratch() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v1",
        &[("docs/readme.txt", "no binaries here")],
    );
    let mut manifest = Manifest::default();
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let err = orchestrator
        .install_unit(&fixture.store, &mut manifest, "owner/Sample", true)
        .expect_err("archive without payload must fail");
    assert_eq!(classify_failure(&err), FailureClass::PayloadNotFound);
    assert!(manifest.is_empty());
    assert!(
        fs::read_dir(&fixture.scratch)
            .expect("scratch dir must exist")
            .next()
            .is_none(),
        "scratch must be empty after failure"
    );
}

#[test]
fn structural_archive_merges_into_host_tree() {
    let fixture = Fixture::new();
    let transport = with_release(
        StaticTransport::new(),
        "owner/Sample",
        "v1",
        &[
            ("csgo/addons/counterstrikesharp/plugins/Sample/Sample.dll", "v1"),
            ("csgo/addons/counterstrikesharp/shared/Dep/Dep.dll", "dep"),
        ],
    );
    let mut manifest = Manifest::default();
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let unit = orchestrator
        .install_unit(&fixture.store, &mut manifest, "owner/Sample", true)
        .expect("must install");
    assert_eq!(unit.directory.as_deref(), Some("Sample"));
    assert_eq!(read_file(&fixture.host.unit_dir("Sample").join("Sample.dll")), "v1");
    assert_eq!(
        read_file(
            &fixture
                .host
                .host_root()
                .join("csgo/addons/counterstrikesharp/shared/Dep/Dep.dll")
        ),
        "dep"
    );
}

#[test]
fn remove_unit_tolerates_absent_directory() {
    let fixture = Fixture::new();
    let mut manifest = Manifest::new(vec![InstalledUnit {
        identifier: "owner/Sample".to_string(),
        directory: Some("Sample".to_string()),
        version: Some("v1".to_string()),
        auto_update: true,
    }]);

    let removed = remove_unit(&fixture.host, &fixture.store, &mut manifest, "owner/Sample")
        .expect("must remove");
    assert_eq!(removed.directory_status, Some(RemovalStatus::AlreadyAbsent));
    assert!(manifest.is_empty());
    assert!(fixture
        .store
        .load_or_create()
        .expect("must reload manifest")
        .is_empty());
}

#[test]
fn remove_unit_by_directory_name_deletes_directory() {
    let fixture = Fixture::new();
    write_file(&fixture.host.unit_dir("Sample").join("Sample.dll"), "v1");
    let mut manifest = Manifest::new(vec![
        InstalledUnit {
            identifier: "owner/Sample".to_string(),
            directory: Some("Sample".to_string()),
            version: Some("v1".to_string()),
            auto_update: true,
        },
        InstalledUnit::new("owner/Other", true),
    ]);

    let removed = remove_unit(&fixture.host, &fixture.store, &mut manifest, "Sample")
        .expect("must remove");
    assert_eq!(removed.unit.identifier, "owner/Sample");
    assert_eq!(removed.directory_status, Some(RemovalStatus::Removed));
    assert!(!fixture.host.unit_dir("Sample").exists());
    assert_eq!(manifest.units, vec![InstalledUnit::new("owner/Other", true)]);

    remove_unit(&fixture.host, &fixture.store, &mut manifest, "Sample")
        .expect_err("unknown target must fail");
}

#[test]
fn pass_lock_refuses_overlapping_passes() {
    let fixture = Fixture::new();

    let lock = PassLock::acquire(&fixture.state).expect("first pass must acquire");
    let err = PassLock::acquire(&fixture.state).expect_err("second pass must be refused");
    let message = err.to_string();
    assert!(message.contains("already running"), "unexpected error: {message}");
    assert!(message.contains(&std::process::id().to_string()));

    drop(lock);
    assert!(!fixture.state.active_pass_path().exists());
    PassLock::acquire(&fixture.state).expect("lock must be reusable after release");
}

#[test]
fn triggered_pass_respects_config_and_lock() {
    let fixture = Fixture::new();
    let config = SyncConfig::default();

    let skipped = run_triggered_pass(&config, &fixture.state, Trigger::Reload, || {
        panic!("disabled trigger must not run a pass")
    })
    .expect("disabled trigger is not an error");
    assert!(skipped.is_none());

    let ran = run_triggered_pass(&config, &fixture.state, Trigger::Startup, || {
        Ok(Default::default())
    })
    .expect("enabled trigger must run");
    assert!(ran.is_some());
    assert!(!fixture.state.active_pass_path().exists());

    let _held = PassLock::acquire(&fixture.state).expect("must hold lock");
    run_triggered_pass(&config, &fixture.state, Trigger::Manual, || {
        Ok(Default::default())
    })
    .expect_err("overlapping pass must be refused");
}

#[test]
fn pass_lock_clears_marker_left_by_exited_process() {
    let fixture = Fixture::new();
    let marker = fixture.state.active_pass_path();

    fs::write(&marker, "not-a-pid\n").expect("must write marker");
    PassLock::acquire(&fixture.state).expect_err("unreadable holder must be respected");

    // Far above the kernel pid limit, so never a running process.
    fs::write(&marker, "99999999\n").expect("must write marker");
    let lock = if cfg!(target_os = "linux") {
        PassLock::acquire(&fixture.state).expect("abandoned marker must be cleared")
    } else {
        fs::remove_file(&marker).expect("must remove marker");
        PassLock::acquire(&fixture.state).expect("must acquire")
    };
    assert_eq!(read_file(&marker).trim(), std::process::id().to_string());
    drop(lock);
    assert!(!marker.exists());
}

#[test]
fn watched_pass_outlives_a_held_lock_at_startup() {
    let fixture = Fixture::new();
    let config = SyncConfig::default();

    let held = PassLock::acquire(&fixture.state).expect("must hold lock");
    let startup = run_watched_pass(&config, &fixture.state, Trigger::Startup, || {
        panic!("refused pass must not run")
    });
    assert!(matches!(startup, WatchedPass::Skipped));
    drop(held);

    let retried = run_watched_pass(&config, &fixture.state, Trigger::Startup, || {
        Ok(Default::default())
    });
    assert!(matches!(retried, WatchedPass::Finished(_)));

    let reload = run_watched_pass(&config, &fixture.state, Trigger::Reload, || {
        panic!("disabled trigger must not run a pass")
    });
    assert!(matches!(reload, WatchedPass::Disabled));
}

#[test]
fn each_pass_reloads_manifest_saved_by_other_commands() {
    let fixture = Fixture::new();
    let transport = with_release(
        with_release(
            StaticTransport::new(),
            "owner/Alpha",
            "v1",
            &[("Alpha/Alpha.dll", "v1")],
        ),
        "owner/Beta",
        "v1",
        &[("Beta/Beta.dll", "v1")],
    );
    fixture
        .store
        .save(&Manifest::new(vec![InstalledUnit::new("owner/Alpha", true)]))
        .expect("must seed manifest");
    let mut observer = NoopObserver;
    let mut orchestrator = fixture.orchestrator(&transport, &mut observer);

    let first = orchestrator
        .run_pass(&fixture.store)
        .expect("first pass must finish");
    assert_eq!(first.installed_count(), 1);

    // An install run by another command while the watcher is idle.
    let mut separate = fixture.store.load_or_create().expect("must load manifest");
    orchestrator
        .install_unit(&fixture.store, &mut separate, "owner/Beta", true)
        .expect("must install");

    let second = orchestrator
        .run_pass(&fixture.store)
        .expect("second pass must finish");
    assert_eq!(second.up_to_date_count(), 2);

    let persisted = fixture.store.load_or_create().expect("must reload manifest");
    let identifiers = persisted
        .units
        .iter()
        .map(|unit| unit.identifier.as_str())
        .collect::<Vec<_>>();
    assert_eq!(identifiers, vec!["owner/Alpha", "owner/Beta"]);
    assert!(fixture.host.unit_dir("Beta").join("Beta.dll").exists());
}

#[test]
fn status_lines_are_unadorned_in_plain_mode() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "removed owner/Sample"),
        "removed owner/Sample"
    );
    let rich = render_status_line(OutputStyle::Rich, "ok", "removed owner/Sample");
    assert!(rich.contains("[OK]"));
    assert!(rich.ends_with("removed owner/Sample"));
}

#[test]
fn pass_report_lines_end_with_summary() {
    let report = crate::orchestrator::PassReport {
        results: vec![
            crate::orchestrator::UnitReport {
                identifier: "owner/A".to_string(),
                status: UnitStatus::UpToDate,
            },
            crate::orchestrator::UnitReport {
                identifier: "owner/B".to_string(),
                status: UnitStatus::Failed {
                    class: FailureClass::Transport,
                    reason: "connection refused".to_string(),
                },
            },
        ],
    };

    let lines = format_pass_report(OutputStyle::Plain, &report);
    assert_eq!(
        lines,
        vec![
            "owner/A is up to date".to_string(),
            "owner/B failed (reason=transport): connection refused".to_string(),
            "pass finished: 0 updated, 1 up to date, 1 failed".to_string(),
        ]
    );
}

#[test]
fn unit_lines_describe_each_tracked_unit() {
    assert_eq!(
        format_unit_lines(&Manifest::default()),
        vec!["No units tracked".to_string()]
    );
    let manifest = Manifest::new(vec![InstalledUnit::new("owner/Sample", false)]);
    assert_eq!(
        format_unit_lines(&manifest),
        vec!["owner/Sample directory=- version=- auto_update=false".to_string()]
    );
}

#[test]
fn cli_parses_install_flags_and_trigger_kinds() {
    let cli = Cli::try_parse_from([
        "relsync",
        "--plain",
        "install",
        "owner/repo",
        "--no-auto-update",
    ])
    .expect("must parse install");
    assert!(cli.plain);
    assert!(matches!(
        cli.command,
        Commands::Install {
            ref identifier,
            no_auto_update: true,
        } if identifier == "owner/repo"
    ));

    let cli = Cli::try_parse_from(["relsync", "trigger", "reload"]).expect("must parse trigger");
    assert!(matches!(
        cli.command,
        Commands::Trigger {
            kind: TriggerKind::Reload
        }
    ));

    Cli::try_parse_from(["relsync", "trigger", "manual"])
        .expect_err("manual is not a host trigger");
}

#[test]
fn completions_script_names_the_binary() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("must generate completions");
    let script = String::from_utf8(output).expect("completion script must be utf-8");
    assert!(script.contains("relsync"));
    assert!(script.contains("install"));
}

struct Fixture {
    root: PathBuf,
    state: StateLayout,
    host: HostLayout,
    store: ManifestStore,
    scratch: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = test_root();
        let state = StateLayout::new(root.join("state"));
        state.ensure_base_dirs().expect("must create state dirs");
        let host = HostLayout::new(
            root.join("server"),
            DEFAULT_HOST_SEGMENTS
                .iter()
                .map(|segment| segment.to_string())
                .collect(),
        );
        fs::create_dir_all(host.units_root()).expect("must create units root");
        let store = ManifestStore::new(state.manifest_path());
        let scratch = state.downloads_dir();
        Self {
            root,
            state,
            host,
            store,
            scratch,
        }
    }

    fn orchestrator<'a>(
        &'a self,
        transport: &'a StaticTransport,
        observer: &'a mut NoopObserver,
    ) -> Orchestrator<'a> {
        Orchestrator::new(
            transport,
            API,
            &self.host,
            self.scratch.clone(),
            "dll",
            observer,
        )
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn with_release(
    transport: StaticTransport,
    identifier: &str,
    tag: &str,
    files: &[(&str, &str)],
) -> StaticTransport {
    let asset_url = format!("https://dl.example.test/{identifier}/{tag}/asset.zip");
    let file_name = format!("{}-{tag}.zip", identifier.replace('/', "-"));
    let body = format!(
        r#"{{"tag_name": "{tag}", "assets": [{{"name": "{file_name}", "browser_download_url": "{asset_url}"}}]}}"#
    );
    transport
        .with_route(latest_release_url(API, identifier), StaticRoute::json(200, body))
        .with_route(asset_url, StaticRoute::file(file_name, zip_bytes(files)))
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("must start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("must write zip entry");
    }
    writer.finish().expect("must finish zip").into_inner()
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dir");
    }
    fs::write(path, contents).expect("must write file");
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).expect("must read file")
}

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "relsync-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
