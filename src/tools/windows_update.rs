//! PSWindowsUpdate integration: OS and driver update scans/installs
//!
//! Everything goes through PowerShell. The scripts keep their own error
//! stream quiet and end by converting rows to JSON, so the live session can
//! stream noise lines for the log while the parser waits for the final
//! document.

use crate::context::AppContext;
use crate::exec::ExternalCommand;
use crate::parser::{RowParser, ShapeHint};
use crate::rows::{RowKind, UpdateRow};
use crate::session;
use std::time::Duration;

/// Installs the NuGet provider and the PSWindowsUpdate module on first use.
/// Prints OK as the last line so success is detectable from merged output.
const MODULE_BOOTSTRAP: &str = r#"
$ErrorActionPreference='SilentlyContinue'
try { [Net.ServicePointManager]::SecurityProtocol = [Net.SecurityProtocolType]::Tls12 } catch {}
if (-not (Get-PSRepository -Name 'PSGallery' -ErrorAction SilentlyContinue)) { Register-PSRepository -Default | Out-Null }
if (-not (Get-PackageProvider -Name NuGet -ErrorAction SilentlyContinue)) { Install-PackageProvider -Name NuGet -MinimumVersion 2.8.5.201 -Force | Out-Null }
if (-not (Get-Module -ListAvailable PSWindowsUpdate | Select-Object -First 1)) { Install-Module -Name PSWindowsUpdate -Scope CurrentUser -Force -AllowClobber -Repository PSGallery | Out-Null }
Import-Module PSWindowsUpdate -Force
'OK'
"#;

const SCAN_TEMPLATE: &str = r#"
$ErrorActionPreference='SilentlyContinue'
Import-Module PSWindowsUpdate
$u = Get-WindowsUpdate -MicrosoftUpdate __CATEGORY__ -IgnoreReboot -AcceptAll
$rows = @()
foreach ($x in $u) {
  $kb = $null
  if ($x.KB) { $kb = ($x.KB | Select-Object -First 1) }
  elseif ($x.Title -match 'KB\d{5,7}') { $kb = $Matches[0] }
  $rows += [PSCustomObject]@{
    Title = $x.Title
    KB    = $kb
    UpdateId = $x.UpdateID
    Categories = @($x.Categories | ForEach-Object { $_.Name })
  }
}
$rows | ConvertTo-Json -Depth 4
"#;

pub fn scan_script(include_drivers: bool) -> String {
    let category = if include_drivers {
        "-Category 'Drivers'"
    } else {
        ""
    };
    SCAN_TEMPLATE.replace("__CATEGORY__", category)
}

pub fn install_script(update_ids: &[String]) -> String {
    format!(
        "Import-Module PSWindowsUpdate\n\
         Install-WindowsUpdate -MicrosoftUpdate -UpdateID {} -AcceptAll -IgnoreReboot -AutoReboot:$false -Verbose:$false\n",
        ps_array_literal(update_ids)
    )
}

/// A PowerShell array literal of single-quoted strings, so ids containing
/// commas, spaces or quotes cannot break the command line
pub fn ps_array_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", item.replace('\'', "''")))
        .collect();
    format!("@({})", quoted.join(","))
}

fn powershell_command(script: String, title: &str, soft_total: u64) -> ExternalCommand {
    ExternalCommand::new("powershell")
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
        .arg(script)
        .with_title(title)
        .with_soft_total(soft_total)
}

/// The update scan as run inside a health scan phase
pub fn update_scan_command(soft_total: u64) -> (ExternalCommand, RowKind, ShapeHint) {
    let cmd = powershell_command(scan_script(false), "Scanning Windows updates", soft_total);
    (cmd, RowKind::OsUpdate, ShapeHint::JsonArray)
}

/// Prepare the PSWindowsUpdate module, with live output since the first run
/// can download packages for a while
pub fn ensure_module(ctx: &mut AppContext) -> bool {
    let cmd = powershell_command(
        MODULE_BOOTSTRAP.to_string(),
        "Preparing PSWindowsUpdate",
        40,
    );
    let parser = RowParser::new(RowKind::OsUpdate, ShapeHint::JsonArray);
    let out = session::run_full(ctx, &cmd, parser, Some(Duration::from_secs(120)));
    out.result.exit_code == 0 && out.result.output.contains("OK")
}

/// Scan for pending updates, optionally restricted to driver updates
pub fn scan(ctx: &mut AppContext, include_drivers: bool) -> Vec<UpdateRow> {
    if !ensure_module(ctx) {
        ctx.sink.append("[updates] PSWindowsUpdate could not be prepared");
        return Vec::new();
    }
    let kind = if include_drivers {
        RowKind::DriverUpdate
    } else {
        RowKind::OsUpdate
    };
    let title = if include_drivers {
        "Scanning driver updates"
    } else {
        "Scanning Windows updates"
    };
    let cmd = powershell_command(scan_script(include_drivers), title, 80);
    let parser = RowParser::new(kind, ShapeHint::JsonArray);
    let timeout = ctx.config.updates_timeout();
    let out = session::run_full(ctx, &cmd, parser, Some(timeout));
    if out.result.exit_code != 0 && !out.result.timed_out {
        return Vec::new();
    }
    out.rows
        .into_iter()
        .filter_map(|row| row.as_update().cloned())
        .collect()
}

/// Install specific update ids
pub fn install(ctx: &mut AppContext, update_ids: &[String]) {
    if update_ids.is_empty() {
        return;
    }
    if !ensure_module(ctx) {
        return;
    }
    let cmd = powershell_command(
        install_script(update_ids),
        "Installing Windows updates",
        120,
    );
    let parser = RowParser::new(RowKind::OsUpdate, ShapeHint::JsonArray);
    session::run_full(ctx, &cmd, parser, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ps_array_literal_quotes_and_escapes() {
        let ids = vec!["plain".to_string(), "with space".to_string(), "o'quote".to_string()];
        assert_eq!(
            ps_array_literal(&ids),
            "@('plain','with space','o''quote')"
        );
    }

    #[test]
    fn test_scan_script_category_toggle() {
        let with = scan_script(true);
        let without = scan_script(false);
        assert!(with.contains("-Category 'Drivers'"));
        assert!(!without.contains("-Category"));
        assert!(without.contains("ConvertTo-Json"));
    }

    #[test]
    fn test_install_script_embeds_ids() {
        let script = install_script(&["abc-123".to_string(), "def-456".to_string()]);
        assert!(script.contains("@('abc-123','def-456')"));
        assert!(script.contains("Install-WindowsUpdate"));
    }

    #[test]
    fn test_update_scan_command_shape() {
        let (cmd, kind, shape) = update_scan_command(40);
        assert_eq!(kind, RowKind::OsUpdate);
        assert_eq!(shape, ShapeHint::JsonArray);
        assert_eq!(cmd.program(), "powershell");
        assert_eq!(cmd.soft_total(), 40);
    }
}
