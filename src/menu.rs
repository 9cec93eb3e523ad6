//! Interactive console menus

use crate::context::AppContext;
use crate::diagnostics;
use crate::health;
use crate::output::{self, OutputMode};
use crate::platform::OsKind;
use crate::theme::Theme;
use crate::tools::{brew, drivers, junk, winget};
use crate::{exec, session};
use anyhow::Result;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

/// Read a line from stdin with a fresh handle each time. Getting a new
/// locked handle per read avoids stale-state problems when the terminal
/// loses and regains focus on Windows.
pub(crate) fn read_line_from_stdin() -> io::Result<String> {
    io::stdout().flush()?;
    use std::io::BufRead;
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut input = String::new();
    handle.read_line(&mut input)?;
    Ok(input)
}

fn prompt(msg: &str) -> String {
    print!("{msg}");
    read_line_from_stdin()
        .map(|line| line.trim().to_string())
        .unwrap_or_default()
}

pub fn confirm(msg: &str) -> bool {
    prompt(msg).to_lowercase().starts_with('y')
}

fn pause() {
    let _ = prompt("\nPress Enter to return to the menu…");
}

fn banner() {
    println!();
    println!(
        "{}",
        Theme::header(&format!(
            "=== Upkeep {} ===",
            env!("CARGO_PKG_VERSION")
        ))
    );
    println!();
}

/// Main menu loop. In non-interactive environments only the banner is
/// shown, so piping the binary somewhere cannot hang on a prompt.
pub fn run(ctx: &mut AppContext) -> Result<()> {
    if !io::stdin().is_terminal() {
        banner();
        return Ok(());
    }
    loop {
        banner();
        println!("1. Health Check");
        println!("2. Custom Clean");
        if ctx.caps.power_plans {
            println!("3. Performance Optimizer");
        }
        if ctx.caps.drivers {
            println!("4. Driver Updater");
        }
        if ctx.caps.apps {
            println!("5. App Tools");
        }
        println!("6. Diagnostics");
        println!("7. Exit");
        println!();

        match prompt("Choose an option (1-7): ").as_str() {
            "1" => {
                health_flow(ctx, false)?;
                pause();
            }
            "2" => {
                custom_clean(ctx);
                pause();
            }
            "3" if ctx.caps.power_plans => performance_optimizer(ctx),
            "4" if ctx.caps.drivers => driver_menu(ctx),
            "5" if ctx.caps.apps => app_tools(ctx),
            "6" => {
                diagnostics_view(ctx);
                pause();
            }
            "7" | "q" | "exit" => {
                println!("Goodbye!");
                return Ok(());
            }
            _ => println!("{}", Theme::warning("Invalid choice.")),
        }
    }
}

/// Full health flow: scan, summarize, then offer Fix All
pub fn health_flow(ctx: &mut AppContext, assume_yes: bool) -> Result<()> {
    if ctx.mode != OutputMode::Quiet {
        println!("\n{}", Theme::header("--- Health Check ---"));
        println!("{}\n", Theme::dim(&format!("Log file: {}", ctx.sink.path().display())));
    }
    let phases = health::health_phases(ctx);
    if phases.is_empty() {
        println!(
            "{}",
            Theme::warning("No maintenance features are available on this system.")
        );
        return Ok(());
    }
    let summary = health::run_scan(ctx, phases);
    output::print_health_summary(&summary, ctx.mode);

    if !summary.has_work() {
        if ctx.mode != OutputMode::Quiet {
            println!("\n{}", Theme::success("Nothing to fix."));
        }
        return Ok(());
    }
    let apply = assume_yes || confirm("\nApply Fix All now? (Y/N): ");
    if !apply {
        println!("{}", Theme::dim("No changes applied."));
        return Ok(());
    }
    health::apply_all(ctx, &summary)?;
    if ctx.mode != OutputMode::Quiet {
        println!("\n{}", Theme::success("Health Check complete!"));
    }
    Ok(())
}

pub fn custom_clean(ctx: &mut AppContext) {
    let paths = junk::temp_paths(ctx.os);
    let spinner = crate::progress::create_spinner("Scanning junk folders…");
    let size = junk::measure(&paths);
    crate::progress::finish_and_clear(&spinner);

    println!(
        "\nJunk detected: {}",
        Theme::warning(&bytesize::to_string(size, true))
    );
    if size == 0 {
        return;
    }
    if confirm("Clean now? (Y/N): ") {
        let freed = junk::sweep(ctx);
        println!(
            "{} Cleaned {}",
            Theme::success("OK"),
            bytesize::to_string(freed, true)
        );
    }
}

/// powercfg scheme GUIDs are stable across Windows versions
fn performance_optimizer(ctx: &mut AppContext) {
    println!("\n{}", Theme::header("Performance Optimizer"));
    println!("{}", Theme::dim("Switch power plan quickly."));
    loop {
        println!("\n1) Balanced plan");
        println!("2) High Performance");
        println!("3) Ultimate Performance (enable + set)");
        println!("4) Back");
        match prompt("Choose: ").as_str() {
            "1" => run_plain(ctx, "Power plan: Balanced", &[
                "powercfg", "/setactive", "381b4222-f694-41f0-9685-ff5bb260df2e",
            ]),
            "2" => run_plain(ctx, "Power plan: High performance", &[
                "powercfg", "/setactive", "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c",
            ]),
            "3" => {
                run_plain(ctx, "Enable Ultimate Performance", &[
                    "powershell", "-NoProfile", "-Command",
                    "powercfg -duplicatescheme e9a42b02-d5df-448d-aa00-03f14749eb61",
                ]);
                run_plain(ctx, "Power plan: Ultimate", &[
                    "powercfg", "/setactive", "e9a42b02-d5df-448d-aa00-03f14749eb61",
                ]);
            }
            "4" => return,
            _ => println!("{}", Theme::warning("Invalid choice.")),
        }
    }
}

/// One-off command with live output and no row parsing
fn run_plain(ctx: &mut AppContext, title: &str, argv: &[&str]) {
    let cmd = exec::ExternalCommand::new(argv[0])
        .args(argv[1..].iter().copied())
        .with_title(title);
    let parser = crate::parser::RowParser::new(
        crate::rows::RowKind::InstalledApp,
        crate::parser::ShapeHint::ColumnTable,
    );
    session::run_full(ctx, &cmd, parser, None);
}

fn driver_menu(ctx: &mut AppContext) {
    loop {
        println!("\n{}", Theme::header("Driver Updater"));
        println!("1) Scan for driver updates");
        println!("2) List installed drivers");
        println!("3) Rollback a driver package");
        println!("4) Export all drivers");
        println!("5) Back");
        match prompt("Choose: ").as_str() {
            "1" => {
                let updates = drivers::scan_updates(ctx);
                output::print_update_rows(&updates, ctx.mode);
            }
            "2" => {
                let installed = drivers::list_installed(ctx);
                output::print_driver_rows(&installed, ctx.mode);
            }
            "3" => {
                let name = prompt("Published name to roll back (e.g. oem42.inf): ");
                if !name.is_empty() {
                    drivers::rollback(ctx, &name);
                }
            }
            "4" => {
                let dir = prompt("Target directory: ");
                if !dir.is_empty() {
                    drivers::export_all(ctx, &PathBuf::from(dir));
                }
            }
            "5" => return,
            _ => println!("{}", Theme::warning("Invalid choice.")),
        }
    }
}

fn app_tools(ctx: &mut AppContext) {
    loop {
        println!("\n{}", Theme::header("App Tools"));
        println!("1) List upgradable apps");
        println!("2) Upgrade all apps");
        println!("3) Uninstall an app");
        println!("4) List installed apps");
        println!("5) Back");
        match prompt("Choose: ").as_str() {
            "1" => {
                let apps = list_upgrades(ctx);
                output::print_app_rows(&apps, ctx.mode);
            }
            "2" => upgrade_all(ctx),
            "3" => {
                let query = prompt("App id or name: ");
                if !query.is_empty() {
                    uninstall_flow(ctx, &query);
                }
            }
            "4" => {
                let apps = list_installed(ctx);
                output::print_app_rows(&apps, ctx.mode);
            }
            "5" => return,
            _ => println!("{}", Theme::warning("Invalid choice.")),
        }
    }
}

pub fn list_upgrades(ctx: &mut AppContext) -> Vec<crate::rows::AppRow> {
    match ctx.os {
        OsKind::Windows => winget::list_upgrades(ctx),
        OsKind::MacOs => brew::list_upgrades(ctx),
        OsKind::Linux => Vec::new(),
    }
}

fn list_installed(ctx: &mut AppContext) -> Vec<crate::rows::AppRow> {
    match ctx.os {
        OsKind::Windows => winget::list_installed(ctx),
        OsKind::MacOs => brew::list_installed(ctx),
        OsKind::Linux => Vec::new(),
    }
}

pub fn upgrade_all(ctx: &mut AppContext) {
    match ctx.os {
        OsKind::Windows => {
            let apps = winget::list_upgrades(ctx);
            if apps.is_empty() {
                println!("{}", Theme::dim("No upgradable apps found."));
                return;
            }
            let ids: Vec<String> = apps.into_iter().map(|app| app.id).collect();
            winget::upgrade_ids(ctx, &ids);
        }
        OsKind::MacOs => brew::upgrade_all(ctx),
        OsKind::Linux => println!(
            "{}",
            Theme::warning("Package upgrades are not supported on this system yet.")
        ),
    }
}

/// Resolve a free-form query against the installed list, asking the user
/// to disambiguate when several apps match
pub fn uninstall_flow(ctx: &mut AppContext, query: &str) {
    let apps = list_installed(ctx);
    if apps.is_empty() {
        println!("{}", Theme::dim("No installed apps retrieved."));
        return;
    }
    match winget::match_uninstall_target(&apps, query) {
        winget::UninstallMatch::One(app) => uninstall_one(ctx, &app.id),
        winget::UninstallMatch::Several(matches) => {
            println!("{}", Theme::warning("Multiple matches:"));
            for (index, app) in matches.iter().enumerate() {
                println!(
                    "{:02}. {}  [{}]  v{}",
                    index + 1,
                    app.name,
                    app.id,
                    if app.version.is_empty() { "-" } else { &app.version }
                );
            }
            let pick = prompt("Pick a number to uninstall (or blank to cancel): ");
            if let Ok(number) = pick.parse::<usize>() {
                if (1..=matches.len()).contains(&number) {
                    let id = matches[number - 1].id.clone();
                    uninstall_one(ctx, &id);
                }
            }
        }
        winget::UninstallMatch::NoMatch => {
            println!("{}", Theme::dim("No match for that name/ID."));
        }
    }
}

fn uninstall_one(ctx: &mut AppContext, id: &str) {
    match ctx.os {
        OsKind::Windows => winget::uninstall(ctx, id),
        OsKind::MacOs => brew::uninstall(ctx, id),
        OsKind::Linux => {}
    }
}

pub fn diagnostics_view(ctx: &mut AppContext) {
    println!();
    let report = diagnostics::gather();
    diagnostics::print_report(&report, ctx.mode);
    println!();
    println!("{}", Theme::header("Recent log"));
    println!("{}", Theme::divider(40));
    let tail = ctx.sink.tail(20);
    if tail.is_empty() {
        println!("{}", Theme::dim("(log is empty)"));
    } else {
        println!("{tail}");
    }
}
