//! Output verbosity and result printing

use crate::health::ScanSummary;
use crate::rows::{AppRow, DriverRow, UpdateRow};
use crate::theme::Theme;
use anyhow::Result;
use serde::Serialize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,   // Only errors
    Normal,  // Standard output
    Verbose, // More details
}

pub fn print_health_summary(summary: &ScanSummary, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    println!();
    println!("{}", Theme::header("Health Summary"));
    println!("{}", Theme::divider(40));
    println!(
        "- Apps needing updates: {}",
        Theme::warning(&summary.apps_needing_update().to_string())
    );
    println!(
        "- OS updates available: {}",
        Theme::warning(&summary.updates_available().to_string())
    );
    println!("- Junk detected: {}", Theme::warning(&summary.junk_human()));

    if mode == OutputMode::Verbose {
        for outcome in &summary.outcomes {
            let status = if outcome.timed_out {
                "timed out".to_string()
            } else {
                format!("rc={}", outcome.exit_code)
            };
            println!(
                "  {}",
                Theme::dim(&format!(
                    "phase {}: {} row(s), {status}",
                    outcome.name, outcome.rows
                ))
            );
        }
    }
}

pub fn print_app_rows(apps: &[AppRow], mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    if apps.is_empty() {
        println!("{}", Theme::dim("No upgradable apps found."));
        return;
    }
    println!(
        "{:<32} {:<36} {:>14} {:>14}",
        Theme::primary("Name"),
        Theme::primary("Id"),
        Theme::primary("Version"),
        Theme::primary("Available")
    );
    println!("{}", Theme::divider(98));
    for app in apps {
        println!(
            "{:<32} {:<36} {:>14} {:>14}",
            truncate(&app.name, 32),
            truncate(&app.id, 36),
            truncate(&app.version, 14),
            truncate(&app.available, 14)
        );
    }
    println!("\n{} upgrade(s) available", apps.len());
}

pub fn print_update_rows(updates: &[UpdateRow], mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    if updates.is_empty() {
        println!("{}", Theme::dim("No updates reported."));
        return;
    }
    for (index, update) in updates.iter().enumerate() {
        let kb = update.kb.as_deref().unwrap_or("-");
        println!("{:>2}. {}  [{}]", index + 1, update.title, kb);
        if !update.categories.is_empty() {
            println!("    {}", Theme::dim(&update.categories.join(", ")));
        }
    }
}

pub fn print_driver_rows(drivers: &[DriverRow], mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    if drivers.is_empty() {
        println!("{}", Theme::dim("No driver packages retrieved."));
        return;
    }
    println!(
        "{:<14} {:<30} {:<12} {:>16}",
        Theme::primary("Published"),
        Theme::primary("Provider"),
        Theme::primary("Date"),
        Theme::primary("Version")
    );
    println!("{}", Theme::divider(76));
    for driver in drivers {
        println!(
            "{:<14} {:<30} {:<12} {:>16}",
            truncate(&driver.published_name, 14),
            truncate(&driver.provider, 30),
            truncate(&driver.date, 12),
            truncate(&driver.version, 16)
        );
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    apps: &'a [AppRow],
    updates: &'a [UpdateRow],
    junk_bytes: u64,
    junk_human: String,
}

/// Machine-readable scan summary for scripting
pub fn print_json_summary(summary: &ScanSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonSummary {
        apps: &summary.apps,
        updates: &summary.updates,
        junk_bytes: summary.junk_bytes,
        junk_human: summary.junk_human(),
    })?;
    println!("{json}");
    Ok(())
}

/// Machine-readable app listing
pub fn print_json_apps(apps: &[AppRow]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(apps)?);
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-10", 10), "exactly-10");
        assert_eq!(truncate("much too long for this", 8), "much to…");
    }
}
