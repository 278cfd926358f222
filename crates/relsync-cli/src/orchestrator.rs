use std::path::PathBuf;

use anyhow::{anyhow, Result};
use relsync_core::{
    classify_failure, validate_identifier, FailureClass, HostLayout, InstalledUnit, SyncError,
};
use relsync_installer::{
    fetch_release_archive, locate_payload, merge_into_host, payload_directory_name,
    remove_unit_directory, DownloadObserver, FsTree, MergeStrategy, RemovalStatus,
};
use relsync_manifest::{Manifest, ManifestStore};
use relsync_resolver::{resolve_latest_release, HttpTransport, ResolveOutcome};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitOutcome {
    Installed {
        unit: InstalledUnit,
        strategy: MergeStrategy,
    },
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitStatus {
    Installed {
        tag: String,
        strategy: MergeStrategy,
    },
    UpToDate,
    Failed {
        class: FailureClass,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnitReport {
    pub(crate) identifier: String,
    pub(crate) status: UnitStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PassReport {
    pub(crate) results: Vec<UnitReport>,
}

impl PassReport {
    pub(crate) fn installed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| matches!(result.status, UnitStatus::Installed { .. }))
            .count()
    }

    pub(crate) fn up_to_date_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == UnitStatus::UpToDate)
            .count()
    }

    pub(crate) fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| matches!(result.status, UnitStatus::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemovedUnit {
    pub(crate) unit: InstalledUnit,
    /// `None` when the unit never recorded a directory.
    pub(crate) directory_status: Option<RemovalStatus>,
}

/// Drives resolve, fetch, locate and merge for tracked units.
pub(crate) struct Orchestrator<'a> {
    transport: &'a dyn HttpTransport,
    api_base: &'a str,
    host: &'a HostLayout,
    scratch_root: PathBuf,
    artifact_extension: &'a str,
    observer: &'a mut dyn DownloadObserver,
}

impl<'a> Orchestrator<'a> {
    pub(crate) fn new(
        transport: &'a dyn HttpTransport,
        api_base: &'a str,
        host: &'a HostLayout,
        scratch_root: PathBuf,
        artifact_extension: &'a str,
        observer: &'a mut dyn DownloadObserver,
    ) -> Self {
        Self {
            transport,
            api_base,
            host,
            scratch_root,
            artifact_extension,
            observer,
        }
    }

    /// Brings one unit up to date. The returned unit carries the new
    /// directory and version; `manifest` is only consulted, never changed.
    pub(crate) fn update_one(
        &mut self,
        unit: &InstalledUnit,
        manifest: &Manifest,
    ) -> Result<UnitOutcome> {
        let release = match resolve_latest_release(
            self.transport,
            self.api_base,
            &unit.identifier,
            unit.version.as_deref(),
        )? {
            ResolveOutcome::UpToDate => {
                info!(identifier = %unit.identifier, "unit is up to date");
                return Ok(UnitOutcome::UpToDate);
            }
            ResolveOutcome::NewRelease(release) => release,
        };
        info!(
            identifier = %unit.identifier,
            from = unit.version.as_deref().unwrap_or("-"),
            to = %release.tag,
            "new release found"
        );

        let archive = fetch_release_archive(
            self.transport,
            &release,
            &self.scratch_root,
            &mut *self.observer,
        )?;
        let payload = locate_payload(&FsTree::new(archive.root()), self.artifact_extension)?
            .ok_or_else(|| SyncError::PayloadNotFound {
                archive_root: archive.root().to_path_buf(),
                extension: self.artifact_extension.trim_start_matches('.').to_string(),
            })?;
        let directory = payload_directory_name(archive.root(), &payload)?;
        guard_directory(unit, manifest, &directory)?;

        let report = merge_into_host(archive.root(), &payload, self.host)?;
        if let Err(err) = archive.cleanup() {
            warn!(
                identifier = %unit.identifier,
                error = %format!("{err:#}"),
                "scratch cleanup failed"
            );
        }

        info!(
            identifier = %unit.identifier,
            directory = %directory,
            tag = %release.tag,
            strategy = report.strategy.as_str(),
            "unit installed"
        );
        let mut updated = unit.clone();
        updated.directory = Some(directory);
        updated.version = Some(release.tag);
        Ok(UnitOutcome::Installed {
            unit: updated,
            strategy: report.strategy,
        })
    }

    /// Updates every auto-updating unit in manifest order. A unit failure is
    /// recorded and the pass moves on.
    pub(crate) fn update_all(
        &mut self,
        store: &ManifestStore,
        manifest: &mut Manifest,
    ) -> Result<PassReport> {
        let units = manifest
            .units
            .iter()
            .filter(|unit| unit.auto_update)
            .cloned()
            .collect::<Vec<_>>();

        let mut report = PassReport::default();
        for unit in units {
            let status = match self.update_one(&unit, manifest) {
                Ok(UnitOutcome::Installed {
                    unit: updated,
                    strategy,
                }) => {
                    let tag = updated.version.clone().unwrap_or_default();
                    manifest.upsert(updated);
                    if let Err(err) = store.save(manifest) {
                        warn!(
                            identifier = %unit.identifier,
                            error = %format!("{err:#}"),
                            "failed to save manifest"
                        );
                    }
                    UnitStatus::Installed { tag, strategy }
                }
                Ok(UnitOutcome::UpToDate) => UnitStatus::UpToDate,
                Err(err) => {
                    let class = classify_failure(&err);
                    warn!(
                        identifier = %unit.identifier,
                        class = class.as_str(),
                        error = %format!("{err:#}"),
                        "unit update failed"
                    );
                    UnitStatus::Failed {
                        class,
                        reason: format!("{err:#}"),
                    }
                }
            };
            report.results.push(UnitReport {
                identifier: unit.identifier,
                status,
            });
        }

        store.save(manifest)?;
        Ok(report)
    }

    /// Runs `update_all` against the manifest as it is on disk now. Callers
    /// hold the pass lock, so edits saved by other commands between passes
    /// are picked up instead of overwritten.
    pub(crate) fn run_pass(&mut self, store: &ManifestStore) -> Result<PassReport> {
        let mut manifest = store.load_or_create()?;
        self.update_all(store, &mut manifest)
    }

    /// Updates one tracked unit whether or not it auto-updates.
    pub(crate) fn update_named(
        &mut self,
        store: &ManifestStore,
        manifest: &mut Manifest,
        identifier: &str,
    ) -> Result<UnitReport> {
        let unit = manifest
            .find(identifier)
            .cloned()
            .ok_or_else(|| anyhow!("unit '{identifier}' is not tracked"))?;

        let status = match self.update_one(&unit, manifest)? {
            UnitOutcome::Installed {
                unit: updated,
                strategy,
            } => {
                let tag = updated.version.clone().unwrap_or_default();
                manifest.upsert(updated);
                store.save(manifest)?;
                UnitStatus::Installed { tag, strategy }
            }
            UnitOutcome::UpToDate => UnitStatus::UpToDate,
        };

        Ok(UnitReport {
            identifier: unit.identifier,
            status,
        })
    }

    /// Installs a unit that is not tracked yet. Nothing is recorded unless
    /// the first install succeeds.
    pub(crate) fn install_unit(
        &mut self,
        store: &ManifestStore,
        manifest: &mut Manifest,
        identifier: &str,
        auto_update: bool,
    ) -> Result<InstalledUnit> {
        validate_identifier(identifier)?;
        if manifest.find(identifier).is_some() {
            anyhow::bail!(
                "unit '{identifier}' is already tracked; use `relsync update {identifier}`"
            );
        }

        let candidate = InstalledUnit::new(identifier, auto_update);
        let installed = match self.update_one(&candidate, manifest)? {
            UnitOutcome::Installed { unit, .. } => unit,
            UnitOutcome::UpToDate => candidate,
        };

        manifest.units.push(installed.clone());
        store.save(manifest)?;
        Ok(installed)
    }
}

fn guard_directory(unit: &InstalledUnit, manifest: &Manifest, located: &str) -> Result<()> {
    if let Some(recorded) = unit.directory.as_deref() {
        if recorded != located {
            return Err(SyncError::DirectoryConflict {
                identifier: unit.identifier.clone(),
                recorded: recorded.to_string(),
                located: located.to_string(),
                owner: None,
            }
            .into());
        }
    }

    match manifest.directory_owner(located) {
        Some(owner) if owner != unit.identifier => Err(SyncError::DirectoryConflict {
            identifier: unit.identifier.clone(),
            recorded: located.to_string(),
            located: located.to_string(),
            owner: Some(owner.to_string()),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Stops tracking the unit named by identifier or recorded directory and
/// deletes its directory. Touches no network.
pub(crate) fn remove_unit(
    host: &HostLayout,
    store: &ManifestStore,
    manifest: &mut Manifest,
    target: &str,
) -> Result<RemovedUnit> {
    let unit = manifest
        .find_target(target)
        .cloned()
        .ok_or_else(|| anyhow!("no tracked unit matches '{target}'"))?;

    let directory_status = match unit.directory.as_deref() {
        Some(directory) => {
            let status = remove_unit_directory(host, directory)?;
            if status == RemovalStatus::AlreadyAbsent {
                info!(
                    identifier = %unit.identifier,
                    directory,
                    "unit directory was already absent"
                );
            }
            Some(status)
        }
        None => None,
    };

    manifest.remove(&unit.identifier);
    store.save(manifest)?;
    info!(identifier = %unit.identifier, "unit removed");
    Ok(RemovedUnit {
        unit,
        directory_status,
    })
}
