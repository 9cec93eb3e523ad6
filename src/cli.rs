use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::consent;
use crate::context::AppContext;
use crate::diagnostics;
use crate::health;
use crate::menu;
use crate::output::{self, OutputMode};
use crate::theme::Theme;
use crate::tools::{drivers, junk, windows_update};

#[derive(Parser)]
#[command(name = "upkeep")]
#[command(version)]
#[command(about = "Keep apps, updates, drivers and junk under control from one console")]
#[command(long_about = "Upkeep is an interactive maintenance console that drives the OS-native \
    package and update tools with live progress.\n\n\
    Examples:\n  \
    upkeep                      # Interactive menu\n  \
    upkeep health -y            # Scan and apply all fixes\n  \
    upkeep scan --json          # Upgradable apps as JSON\n  \
    upkeep clean -y             # Clean junk without confirmation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full health scan (apps, OS updates, junk), then offer Fix All
    #[command(visible_alias = "h")]
    Health {
        /// Apply all fixes without prompting
        #[arg(short = 'y', long)]
        yes: bool,

        /// Print the scan summary as JSON (implies no fixes)
        #[arg(long)]
        json: bool,
    },

    /// List applications with available upgrades
    #[command(visible_alias = "s")]
    Scan {
        /// Output results as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Upgrade applications
    #[command(visible_alias = "u")]
    Upgrade {
        /// Upgrade everything with an available update
        #[arg(short = 'a', long)]
        all: bool,

        /// Specific package ids to upgrade
        ids: Vec<String>,
    },

    /// Uninstall an application by id or name
    Uninstall {
        /// Package id, or a name fragment to match against installed apps
        query: String,
    },

    /// Scan for pending OS updates
    Updates {
        /// Install everything found after the scan
        #[arg(long)]
        install: bool,

        /// Restrict the scan to driver updates
        #[arg(long)]
        drivers: bool,
    },

    /// Driver package maintenance
    Drivers {
        #[command(subcommand)]
        action: DriverAction,
    },

    /// Scan and clean junk files (temp folders, recycle bin)
    #[command(visible_alias = "c")]
    Clean {
        /// Clean without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show a system report
    Status,

    /// Show the tail of the durable log
    Log {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "40")]
        lines: usize,
    },
}

#[derive(Subcommand)]
pub enum DriverAction {
    /// List driver packages in the driver store
    List,
    /// Scan for pending driver updates
    Updates,
    /// Remove and roll back a driver package by its published name
    Rollback { published_name: String },
    /// Export all driver packages to a directory
    Export { dir: PathBuf },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let mode = if self.quiet {
            OutputMode::Quiet
        } else if self.verbose > 0 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        };
        let mut ctx = AppContext::init(mode);
        if !consent::ensure_consent(mode, &ctx.sink)? {
            return Ok(());
        }

        match self.command {
            Commands::Health { yes, json } => {
                if json {
                    let phases = health::health_phases(&ctx);
                    let summary = health::run_scan(&mut ctx, phases);
                    output::print_json_summary(&summary)?;
                } else {
                    menu::health_flow(&mut ctx, yes)?;
                }
            }
            Commands::Scan { json } => {
                let apps = menu::list_upgrades(&mut ctx);
                if json {
                    output::print_json_apps(&apps)?;
                } else {
                    output::print_app_rows(&apps, ctx.mode);
                }
            }
            Commands::Upgrade { all, ids } => {
                if !ctx.caps.apps {
                    println!(
                        "{}",
                        Theme::warning("Package upgrades are not supported on this system yet.")
                    );
                } else if all || ids.is_empty() {
                    menu::upgrade_all(&mut ctx);
                } else {
                    match ctx.os {
                        crate::platform::OsKind::Windows => {
                            crate::tools::winget::upgrade_ids(&mut ctx, &ids)
                        }
                        crate::platform::OsKind::MacOs => {
                            crate::tools::brew::upgrade(&mut ctx, &ids)
                        }
                        crate::platform::OsKind::Linux => {}
                    }
                }
            }
            Commands::Uninstall { query } => {
                if ctx.caps.apps {
                    menu::uninstall_flow(&mut ctx, &query);
                } else {
                    println!(
                        "{}",
                        Theme::warning("App management is not supported on this system.")
                    );
                }
            }
            Commands::Updates { install, drivers } => {
                if !ctx.caps.updates {
                    println!(
                        "{}",
                        Theme::warning("OS update scans are only available on Windows.")
                    );
                    return Ok(());
                }
                let updates = windows_update::scan(&mut ctx, drivers);
                output::print_update_rows(&updates, ctx.mode);
                if install && !updates.is_empty() {
                    let ids: Vec<String> = updates
                        .iter()
                        .map(|update| update.update_id.clone())
                        .filter(|id| !id.is_empty())
                        .collect();
                    windows_update::install(&mut ctx, &ids);
                }
            }
            Commands::Drivers { action } => {
                if !ctx.caps.drivers {
                    println!(
                        "{}",
                        Theme::warning("Driver maintenance is only available on Windows.")
                    );
                    return Ok(());
                }
                match action {
                    DriverAction::List => {
                        let installed = drivers::list_installed(&mut ctx);
                        output::print_driver_rows(&installed, ctx.mode);
                    }
                    DriverAction::Updates => {
                        let updates = drivers::scan_updates(&mut ctx);
                        output::print_update_rows(&updates, ctx.mode);
                    }
                    DriverAction::Rollback { published_name } => {
                        drivers::rollback(&mut ctx, &published_name);
                    }
                    DriverAction::Export { dir } => {
                        drivers::export_all(&mut ctx, &dir);
                    }
                }
            }
            Commands::Clean { yes } => {
                let paths = junk::temp_paths(ctx.os);
                let size = junk::measure(&paths);
                if ctx.mode != OutputMode::Quiet {
                    println!(
                        "Junk detected: {}",
                        Theme::warning(&bytesize::to_string(size, true))
                    );
                }
                if size == 0 {
                    return Ok(());
                }
                if yes || menu::confirm("Clean now? (Y/N): ") {
                    let freed = junk::sweep(&mut ctx);
                    if ctx.mode != OutputMode::Quiet {
                        println!(
                            "{} Cleaned {}",
                            Theme::success("OK"),
                            bytesize::to_string(freed, true)
                        );
                    }
                }
            }
            Commands::Status => {
                let report = diagnostics::gather();
                diagnostics::print_report(&report, ctx.mode);
            }
            Commands::Log { lines } => {
                println!("{}", ctx.sink.tail(lines));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_health_flags() {
        let cli = Cli::parse_from(["upkeep", "health", "-y"]);
        match cli.command {
            Commands::Health { yes, json } => {
                assert!(yes);
                assert!(!json);
            }
            _ => panic!("expected health command"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["upkeep", "-q", "-v", "scan"]).is_err());
    }

    #[test]
    fn test_driver_subcommands() {
        let cli = Cli::parse_from(["upkeep", "drivers", "rollback", "oem42.inf"]);
        match cli.command {
            Commands::Drivers {
                action: DriverAction::Rollback { published_name },
            } => assert_eq!(published_name, "oem42.inf"),
            _ => panic!("expected drivers rollback"),
        }
    }
}
