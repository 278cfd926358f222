use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use relsync_installer::{DownloadObserver, RemovalStatus};
use relsync_manifest::Manifest;

use crate::orchestrator::{PassReport, RemovedUnit, UnitReport, UnitStatus};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

impl OutputStyle {
    pub(crate) fn detect(force_plain: bool) -> Self {
        if force_plain || !std::io::stdout().is_terminal() {
            Self::Plain
        } else {
            Self::Rich
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let badge = match status {
                "ok" => colorize(ok_style(), "[OK]"),
                "step" => colorize(step_style(), "[..]"),
                "skip" => colorize(skip_style(), "[--]"),
                "warn" => colorize(warn_style(), "[!!]"),
                "error" => colorize(error_style(), "[ERR]"),
                _ => format!("[{status}]"),
            };
            format!("{badge} {message}")
        }
    }
}

pub(crate) fn format_unit_lines(manifest: &Manifest) -> Vec<String> {
    if manifest.is_empty() {
        return vec!["No units tracked".to_string()];
    }

    manifest
        .units
        .iter()
        .map(|unit| {
            format!(
                "{} directory={} version={} auto_update={}",
                unit.identifier,
                unit.directory.as_deref().unwrap_or("-"),
                unit.version.as_deref().unwrap_or("-"),
                unit.auto_update
            )
        })
        .collect()
}

pub(crate) fn format_unit_report(style: OutputStyle, report: &UnitReport) -> String {
    match &report.status {
        UnitStatus::Installed { tag, strategy } => render_status_line(
            style,
            "ok",
            &format!(
                "{} updated to {} ({} merge)",
                report.identifier,
                tag,
                strategy.as_str()
            ),
        ),
        UnitStatus::UpToDate => render_status_line(
            style,
            "skip",
            &format!("{} is up to date", report.identifier),
        ),
        UnitStatus::Failed { class, reason } => render_status_line(
            style,
            "error",
            &format!(
                "{} failed (reason={}): {}",
                report.identifier,
                class.as_str(),
                reason
            ),
        ),
    }
}

pub(crate) fn format_pass_report(style: OutputStyle, report: &PassReport) -> Vec<String> {
    let mut lines = report
        .results
        .iter()
        .map(|result| format_unit_report(style, result))
        .collect::<Vec<_>>();

    let summary = format!(
        "pass finished: {} updated, {} up to date, {} failed",
        report.installed_count(),
        report.up_to_date_count(),
        report.failed_count()
    );
    let status = if report.failed_count() > 0 { "warn" } else { "ok" };
    lines.push(render_status_line(style, status, &summary));
    lines
}

pub(crate) fn format_removal(style: OutputStyle, removed: &RemovedUnit) -> Vec<String> {
    let mut lines = Vec::new();
    match (removed.unit.directory.as_deref(), removed.directory_status) {
        (Some(directory), Some(RemovalStatus::AlreadyAbsent)) => lines.push(render_status_line(
            style,
            "warn",
            &format!("directory '{directory}' was already absent"),
        )),
        (Some(directory), Some(RemovalStatus::Removed)) => lines.push(render_status_line(
            style,
            "step",
            &format!("deleted directory '{directory}'"),
        )),
        _ => {}
    }
    lines.push(render_status_line(
        style,
        "ok",
        &format!("removed {}", removed.unit.identifier),
    ));
    lines
}

/// Download observer drawing an indicatif bar in rich mode and staying
/// silent in plain mode.
pub(crate) struct DownloadProgress {
    style: OutputStyle,
    progress_bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            progress_bar: None,
        }
    }
}

impl DownloadObserver for DownloadProgress {
    fn on_start(&mut self, file_name: &str, total: Option<u64>) {
        if self.style == OutputStyle::Plain {
            return;
        }

        let progress_bar = match total {
            Some(total) => {
                let progress_bar = ProgressBar::new(total.max(1));
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.cyan.bold} {msg:<24} [{bar:20.cyan/blue}] {bytes:>10}/{total_bytes:10} {elapsed_precise}",
                ) {
                    progress_bar.set_style(style.progress_chars("=>-"));
                }
                progress_bar
            }
            None => ProgressBar::new_spinner(),
        };
        progress_bar.set_message(file_name.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        self.progress_bar = Some(progress_bar);
    }

    fn on_progress(&mut self, received: u64, _total: Option<u64>) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(received);
        }
    }

    fn on_finish(&mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };
        let received = progress_bar.position();
        progress_bar.finish_and_clear();
        println!(
            "{}",
            render_status_line(
                self.style,
                "step",
                &format!("downloaded {}", HumanBytes(received))
            )
        );
    }
}

fn ok_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightGreen.into()))
        .effects(Effects::BOLD)
}

fn step_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightCyan.into()))
}

fn skip_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlack.into()))
}

fn warn_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightYellow.into()))
        .effects(Effects::BOLD)
}

fn error_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
