//! Homebrew integration: app scans and upgrades on macOS

use crate::context::AppContext;
use crate::exec::{run_capture, ExternalCommand};
use crate::parser::{parse_text, RowParser, ShapeHint};
use crate::rows::{AppRow, RowKind};
use crate::session;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

pub fn ensure_ready(ctx: &mut AppContext) -> bool {
    let probe = run_capture(
        &ExternalCommand::new("brew").arg("--version"),
        Some(PROBE_TIMEOUT),
    );
    if !probe.success() {
        ctx.sink
            .append("[brew] not found; install from https://brew.sh/");
        return false;
    }
    true
}

/// The outdated scan as run inside a health scan phase. v2 JSON reports
/// formulae and casks in one object.
pub fn outdated_scan_command(soft_total: u64) -> (ExternalCommand, RowKind, ShapeHint) {
    let cmd = ExternalCommand::new("brew")
        .args(["outdated", "--json=v2"])
        .with_title("Scanning brew packages")
        .with_soft_total(soft_total);
    (cmd, RowKind::AppUpgrade, ShapeHint::JsonObject)
}

/// Outdated packages (formulae and casks) with a real version bump
pub fn list_upgrades(ctx: &mut AppContext) -> Vec<AppRow> {
    if !ensure_ready(ctx) {
        return Vec::new();
    }
    let result = run_capture(
        &ExternalCommand::new("brew").args(["outdated", "--json=v2"]),
        Some(SCAN_TIMEOUT),
    );
    if !result.success() {
        ctx.sink.append("[brew] outdated query failed");
        return Vec::new();
    }
    parse_text(RowKind::AppUpgrade, ShapeHint::JsonObject, &result.output)
        .rows
        .into_iter()
        .filter_map(|row| row.as_app().cloned())
        .collect()
}

/// Upgrade packages by name, one live session each. brew picks the right
/// formula/cask type itself.
pub fn upgrade(ctx: &mut AppContext, names: &[String]) {
    for name in names {
        let cmd = ExternalCommand::new("brew")
            .arg("upgrade")
            .arg(name)
            .with_title(format!("Updating {name}"))
            .with_soft_total(80);
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        session::run_full(ctx, &cmd, parser, None);
    }
}

pub fn upgrade_all(ctx: &mut AppContext) {
    let cmd = ExternalCommand::new("brew")
        .arg("upgrade")
        .with_title("Updating all brew packages")
        .with_soft_total(120);
    let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
    session::run_full(ctx, &cmd, parser, None);
}

pub fn uninstall(ctx: &mut AppContext, name: &str) {
    let cmd = ExternalCommand::new("brew")
        .arg("uninstall")
        .arg(name)
        .with_title(format!("Uninstall {name}"))
        .with_soft_total(60);
    let parser = RowParser::new(RowKind::InstalledApp, ShapeHint::ColumnTable);
    session::run_full(ctx, &cmd, parser, None);
}

pub fn list_installed(ctx: &mut AppContext) -> Vec<AppRow> {
    if !ensure_ready(ctx) {
        return Vec::new();
    }
    let result = run_capture(
        &ExternalCommand::new("brew").args(["list", "--versions"]),
        Some(SCAN_TIMEOUT),
    );
    if !result.success() {
        return Vec::new();
    }
    parse_installed(&result.output)
}

/// `brew list --versions` prints "name version [version...]" per line
fn parse_installed(text: &str) -> Vec<AppRow> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let versions: Vec<&str> = parts.collect();
            Some(AppRow {
                id: name.to_string(),
                name: name.to_string(),
                version: versions.join(" "),
                available: String::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed() {
        let rows = parse_installed("ripgrep 14.1.0\nopenssl@3 3.2.0 3.2.1\n\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "ripgrep");
        assert_eq!(rows[0].version, "14.1.0");
        assert_eq!(rows[1].id, "openssl@3");
        assert_eq!(rows[1].version, "3.2.0 3.2.1");
    }

    #[test]
    fn test_parse_installed_handles_bare_names() {
        let rows = parse_installed("something\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].version, "");
    }

    #[test]
    fn test_outdated_scan_command_shape() {
        let (cmd, kind, shape) = outdated_scan_command(50);
        assert_eq!(kind, RowKind::AppUpgrade);
        assert_eq!(shape, ShapeHint::JsonObject);
        assert!(cmd.display_line().contains("outdated --json=v2"));
    }
}
