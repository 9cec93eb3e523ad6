//! winget integration: app scans, upgrades and uninstalls on Windows

use crate::context::AppContext;
use crate::exec::{run_capture, ExternalCommand};
use crate::parser::{parse_text, RowParser, ShapeHint};
use crate::rows::{AppRow, ParsedRow, RowKind};
use crate::session;
use std::path::PathBuf;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefer PATH resolution (portable or user installs), then known install
/// locations, then the bare name and let the OS complain.
pub fn resolve_path() -> String {
    if let Some(found) = which("winget") {
        return found;
    }
    for candidate in candidate_paths() {
        if candidate.is_file() {
            return candidate.display().to_string();
        }
    }
    "winget".to_string()
}

fn which(program: &str) -> Option<String> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in [format!("{program}.exe"), program.to_string()] {
            let exe = dir.join(&name);
            if exe.is_file() {
                return Some(exe.display().to_string());
            }
        }
    }
    None
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        let local = PathBuf::from(local);
        candidates.push(local.join("Microsoft").join("WindowsApps").join("winget.exe"));
        candidates.push(
            local
                .join("Microsoft")
                .join("Windows")
                .join("Apps")
                .join("winget.exe"),
        );
    }
    candidates.push(PathBuf::from(r"C:\Windows\System32\winget.exe"));
    candidates
}

/// Probe winget and refresh its sources. When the probe fails the Store
/// page for App Installer is opened as a courtesy; that side effect is best
/// effort and its failure is only logged.
pub fn ensure_ready(ctx: &mut AppContext) -> bool {
    let exe = resolve_path();
    let probe = run_capture(
        &ExternalCommand::new(&exe).arg("--version"),
        Some(PROBE_TIMEOUT),
    );
    if !probe.success() {
        ctx.sink
            .append("[winget] not available; pointing user at App Installer");
        open_store_page(ctx);
        return false;
    }
    let _ = run_capture(
        &ExternalCommand::new(&exe).args(["source", "update"]),
        Some(SCAN_TIMEOUT),
    );
    true
}

fn open_store_page(ctx: &mut AppContext) {
    let cmd = ExternalCommand::new("powershell")
        .args([
            "Start-Process",
            "ms-windows-store://pdp/?ProductId=9NBLGGH4NNS1",
        ])
        .with_title("Opening Microsoft Store");
    let result = run_capture(&cmd, Some(PROBE_TIMEOUT));
    if !result.success() {
        ctx.sink.append("[winget] could not open the Store page");
    }
}

/// Newer winget builds can emit JSON; older ones only print the table.
/// Probed via the upgrade command's help text, like the scan itself would
/// be invoked.
pub fn supports_json_output() -> bool {
    let help = run_capture(
        &ExternalCommand::new(resolve_path()).args(["upgrade", "-?"]),
        Some(PROBE_TIMEOUT),
    );
    help.success() && help.output.contains("--output")
}

/// The upgrade scan as run inside a health scan phase
pub fn upgrade_scan_command(soft_total: u64) -> (ExternalCommand, RowKind, ShapeHint) {
    let cmd = ExternalCommand::new(resolve_path())
        .args(["upgrade", "--include-unknown"])
        .with_title("Scanning app updates")
        .with_soft_total(soft_total);
    (cmd, RowKind::AppUpgrade, ShapeHint::ColumnTable)
}

/// All apps with an available upgrade. Tries the JSON output first where
/// supported, then falls back to the table listing.
pub fn list_upgrades(ctx: &mut AppContext) -> Vec<AppRow> {
    if !ensure_ready(ctx) {
        return Vec::new();
    }
    let exe = resolve_path();
    if supports_json_output() {
        let result = run_capture(
            &ExternalCommand::new(&exe).args([
                "upgrade",
                "--include-unknown",
                "--output",
                "json",
            ]),
            Some(SCAN_TIMEOUT),
        );
        let report = parse_text(RowKind::AppUpgrade, ShapeHint::JsonArray, &result.output);
        if !report.rows.is_empty() {
            return app_rows(report.rows);
        }
    }
    let result = run_capture(
        &ExternalCommand::new(&exe).args(["upgrade", "--include-unknown"]),
        Some(SCAN_TIMEOUT),
    );
    app_rows(parse_text(RowKind::AppUpgrade, ShapeHint::ColumnTable, &result.output).rows)
}

pub fn list_installed(ctx: &mut AppContext) -> Vec<AppRow> {
    if !ensure_ready(ctx) {
        return Vec::new();
    }
    let result = run_capture(
        &ExternalCommand::new(resolve_path()).arg("list"),
        Some(SCAN_TIMEOUT),
    );
    app_rows(parse_text(RowKind::InstalledApp, ShapeHint::ColumnTable, &result.output).rows)
}

fn app_rows(rows: Vec<ParsedRow>) -> Vec<AppRow> {
    rows.into_iter()
        .filter_map(|row| row.as_app().cloned())
        .collect()
}

/// Upgrade the given package ids, one live session each
pub fn upgrade_ids(ctx: &mut AppContext, ids: &[String]) {
    let exe = resolve_path();
    for id in ids {
        let cmd = ExternalCommand::new(&exe)
            .args(["upgrade", "--id"])
            .arg(id)
            .args([
                "-h",
                "--disable-interactivity",
                "--accept-package-agreements",
                "--accept-source-agreements",
            ])
            .with_title(format!("Updating {id}"))
            .with_soft_total(120);
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        session::run_full(ctx, &cmd, parser, None);
    }
}

pub fn uninstall(ctx: &mut AppContext, id: &str) {
    let cmd = ExternalCommand::new(resolve_path())
        .args(["uninstall", "--id"])
        .arg(id)
        .args(["--silent", "--disable-interactivity"])
        .with_title(format!("Uninstall {id}"))
        .with_soft_total(80);
    let parser = RowParser::new(RowKind::InstalledApp, ShapeHint::ColumnTable);
    session::run_full(ctx, &cmd, parser, None);
}

/// How a free-form uninstall query resolved against the installed list
#[derive(Debug, PartialEq)]
pub enum UninstallMatch {
    /// Exact id match, or a single name substring match
    One(AppRow),
    /// Several apps matched the name substring
    Several(Vec<AppRow>),
    NoMatch,
}

/// Exact id first, then case-insensitive name substring
pub fn match_uninstall_target(apps: &[AppRow], query: &str) -> UninstallMatch {
    let lowered = query.to_lowercase();
    if let Some(exact) = apps.iter().find(|app| app.id.to_lowercase() == lowered) {
        return UninstallMatch::One(exact.clone());
    }
    let mut matches: Vec<AppRow> = apps
        .iter()
        .filter(|app| app.name.to_lowercase().contains(&lowered))
        .cloned()
        .collect();
    match matches.len() {
        0 => UninstallMatch::NoMatch,
        1 => UninstallMatch::One(matches.remove(0)),
        _ => UninstallMatch::Several(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: &str) -> AppRow {
        AppRow {
            id: id.into(),
            name: name.into(),
            version: "1.0".into(),
            available: "2.0".into(),
        }
    }

    #[test]
    fn test_match_exact_id_wins() {
        let apps = vec![app("Mozilla.Firefox", "Firefox"), app("Fire.Tool", "Fire Tool")];
        let matched = match_uninstall_target(&apps, "mozilla.firefox");
        assert_eq!(matched, UninstallMatch::One(apps[0].clone()));
    }

    #[test]
    fn test_match_single_name_substring() {
        let apps = vec![app("Mozilla.Firefox", "Firefox"), app("VideoLAN.VLC", "VLC")];
        let matched = match_uninstall_target(&apps, "vlc");
        assert_eq!(matched, UninstallMatch::One(apps[1].clone()));
    }

    #[test]
    fn test_match_ambiguous_lists_all() {
        let apps = vec![app("A.One", "Fire One"), app("B.Two", "Fire Two")];
        match match_uninstall_target(&apps, "fire") {
            UninstallMatch::Several(found) => assert_eq!(found.len(), 2),
            other => panic!("expected several matches, got {other:?}"),
        }
    }

    #[test]
    fn test_match_none() {
        let apps = vec![app("A.One", "One")];
        assert_eq!(match_uninstall_target(&apps, "zzz"), UninstallMatch::NoMatch);
    }

    #[test]
    fn test_resolve_path_never_empty() {
        assert!(!resolve_path().is_empty());
    }

    #[test]
    fn test_upgrade_scan_command_shape() {
        let (cmd, kind, shape) = upgrade_scan_command(50);
        assert_eq!(kind, RowKind::AppUpgrade);
        assert_eq!(shape, ShapeHint::ColumnTable);
        assert_eq!(cmd.soft_total(), 50);
        assert!(cmd.display_line().contains("upgrade --include-unknown"));
    }
}
