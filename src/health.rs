//! Multi-phase health scan orchestration
//!
//! A health scan strings several live sessions together on one shared
//! progress scale: each enabled phase gets a contiguous slice proportional
//! to its weight, runs strictly after the previous one, and feeds its rows
//! into a single summary. A phase failing, timing out or finding nothing
//! never aborts the scan; the user just gets fewer results.

use crate::context::AppContext;
use crate::exec::ExternalCommand;
use crate::output::OutputMode;
use crate::parser::{RowParser, ShapeHint};
use crate::platform::OsKind;
use crate::progress::{PhaseRange, PhaseTracker};
use crate::rows::{AppRow, ParsedRow, RowKind, UpdateRow};
use crate::session;
use crate::theme::Theme;
use crate::tools::{brew, junk, windows_update, winget};
use anyhow::Result;
use std::time::Duration;

/// One scheduled scan phase
pub struct ScanPhase {
    pub name: &'static str,
    pub weight: u32,
    pub work: PhaseWork,
}

/// What a phase actually does. Most phases stream an external command; the
/// junk probe walks the filesystem locally.
pub enum PhaseWork {
    Command {
        command: ExternalCommand,
        kind: RowKind,
        shape: ShapeHint,
        timeout: Duration,
    },
    JunkSweep,
}

/// Per-phase record kept in the summary
#[derive(Debug)]
pub struct PhaseOutcome {
    pub name: &'static str,
    pub rows: usize,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Aggregated result of a full scan. Constructed once at the end of
/// `run_scan` and read-only thereafter.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub apps: Vec<AppRow>,
    pub updates: Vec<UpdateRow>,
    pub junk_bytes: u64,
    pub outcomes: Vec<PhaseOutcome>,
}

impl ScanSummary {
    pub fn apps_needing_update(&self) -> usize {
        self.apps.len()
    }

    pub fn updates_available(&self) -> usize {
        self.updates.len()
    }

    pub fn junk_human(&self) -> String {
        bytesize::to_string(self.junk_bytes, true)
    }

    pub fn has_work(&self) -> bool {
        !self.apps.is_empty() || !self.updates.is_empty() || self.junk_bytes > 0
    }
}

/// Disjoint, contiguous ranges across [0,100] proportional to the weights.
/// Skipped phases are simply absent from `weights`, which is what
/// redistributes their share to the rest.
pub fn allocate_ranges(weights: &[u32]) -> Vec<PhaseRange> {
    let total: u32 = weights.iter().sum();
    assert!(
        weights.is_empty() || total > 0,
        "phase weights must not all be zero"
    );
    let total = total as f64;
    let mut ranges = Vec::with_capacity(weights.len());
    let mut acc = 0u32;
    for weight in weights {
        let start = acc as f64 * 100.0 / total;
        acc += weight;
        let end = acc as f64 * 100.0 / total;
        ranges.push(PhaseRange::new(start, end));
    }
    ranges
}

/// Build the phase list for this system. A feature disabled by capability
/// or config contributes no phase at all: it appears in no log and consumes
/// no progress space.
pub fn health_phases(ctx: &AppContext) -> Vec<ScanPhase> {
    let cfg = &ctx.config.scan;
    let mut phases = Vec::new();

    if ctx.caps.apps {
        let scan = match ctx.os {
            OsKind::Windows => Some(winget::upgrade_scan_command(cfg.apps_soft_total)),
            OsKind::MacOs => Some(brew::outdated_scan_command(cfg.apps_soft_total)),
            OsKind::Linux => None,
        };
        if let Some((command, kind, shape)) = scan {
            phases.push(ScanPhase {
                name: "apps",
                weight: cfg.app_weight,
                work: PhaseWork::Command {
                    command,
                    kind,
                    shape,
                    timeout: ctx.config.apps_timeout(),
                },
            });
        }
    }

    if ctx.caps.updates && cfg.updates_enabled {
        let (command, kind, shape) = windows_update::update_scan_command(cfg.updates_soft_total);
        phases.push(ScanPhase {
            name: "updates",
            weight: cfg.update_weight,
            work: PhaseWork::Command {
                command,
                kind,
                shape,
                timeout: ctx.config.updates_timeout(),
            },
        });
    }

    if ctx.caps.junk_clean {
        phases.push(ScanPhase {
            name: "junk",
            weight: cfg.junk_weight,
            work: PhaseWork::JunkSweep,
        });
    }

    phases
}

/// Run the given phases strictly in order and aggregate their results.
///
/// Row handling per phase: a clean exit keeps all parsed rows; a timeout
/// keeps the partial rows collected before the kill; any other non-zero
/// exit contributes zero rows (the tool failed internally, its output is
/// not trusted). Zero rows is a result, not an error.
pub fn run_scan(ctx: &mut AppContext, phases: Vec<ScanPhase>) -> ScanSummary {
    let mut summary = ScanSummary::default();
    if phases.is_empty() {
        return summary;
    }
    let weights: Vec<u32> = phases.iter().map(|phase| phase.weight).collect();
    let ranges = allocate_ranges(&weights);
    let log_capacity = ctx.config.scan.log_lines;

    for (phase, range) in phases.into_iter().zip(ranges) {
        match phase.work {
            PhaseWork::Command {
                command,
                kind,
                shape,
                timeout,
            } => {
                let parser = RowParser::new(kind, shape);
                let out = session::run(ctx, &command, parser, range, Some(timeout), log_capacity);
                let rows = if out.result.exit_code != 0 && !out.result.timed_out {
                    Vec::new()
                } else {
                    out.rows
                };
                for row in &rows {
                    match row {
                        ParsedRow::AppUpgrade(app) => summary.apps.push(app.clone()),
                        ParsedRow::OsUpdate(update) | ParsedRow::DriverUpdate(update) => {
                            summary.updates.push(update.clone())
                        }
                        _ => {}
                    }
                }
                summary.outcomes.push(PhaseOutcome {
                    name: phase.name,
                    rows: rows.len(),
                    exit_code: out.result.exit_code,
                    timed_out: out.result.timed_out,
                });
            }
            PhaseWork::JunkSweep => {
                let title = "Scanning junk files";
                let mut tracker = PhaseTracker::new(range, 1);
                ctx.render.begin(title, range.start());
                let mut lines = vec![format!("{title}…")];
                ctx.render.render(tracker.current(), title, &lines);

                let bytes = junk::measure(&junk::temp_paths(ctx.os));
                summary.junk_bytes = bytes;
                lines.push(format!(
                    "Junk size detected: {}",
                    bytesize::to_string(bytes, true)
                ));
                ctx.render.render(tracker.complete(), title, &lines);
                ctx.sink.append(&format!("[scan] junk -> {bytes} bytes"));
                summary.outcomes.push(PhaseOutcome {
                    name: phase.name,
                    rows: 0,
                    exit_code: 0,
                    timed_out: false,
                });
            }
        }
    }

    ctx.render.finish();
    summary
}

/// Corrective continuation for a finished scan: app upgrades, configured OS
/// update installs and the junk sweep, each as its own single-phase run.
/// The caller (menu or CLI layer) decides whether to invoke this.
pub fn apply_all(ctx: &mut AppContext, summary: &ScanSummary) -> Result<()> {
    let quiet = ctx.mode == OutputMode::Quiet;

    if !summary.apps.is_empty() {
        if !quiet {
            println!("\n{}", Theme::header("Updating applications…"));
        }
        let ids: Vec<String> = summary.apps.iter().map(|app| app.id.clone()).collect();
        match ctx.os {
            OsKind::Windows => winget::upgrade_ids(ctx, &ids),
            OsKind::MacOs => brew::upgrade(ctx, &ids),
            OsKind::Linux => {}
        }
    }

    if !summary.updates.is_empty() {
        if ctx.config.apply.install_os_updates && ctx.caps.updates {
            let ids: Vec<String> = summary
                .updates
                .iter()
                .map(|update| update.update_id.clone())
                .filter(|id| !id.is_empty())
                .collect();
            windows_update::install(ctx, &ids);
        } else if !quiet {
            println!(
                "{}",
                Theme::warning(
                    "OS updates were detected but automatic installation is disabled."
                )
            );
        }
    }

    if summary.junk_bytes > 0 && ctx.caps.junk_clean {
        if !quiet {
            println!("\n{}", Theme::header("Cleaning junk…"));
        }
        let freed = junk::sweep(ctx);
        if !quiet {
            println!("Freed {}", bytesize::to_string(freed, true));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::memory::MemorySurface;

    #[test]
    fn test_allocate_ranges_three_phases() {
        let ranges = allocate_ranges(&[40, 40, 20]);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start(), 0.0);
        assert_eq!(ranges[0].end(), 40.0);
        assert_eq!(ranges[1].start(), 40.0);
        assert_eq!(ranges[1].end(), 80.0);
        assert_eq!(ranges[2].start(), 80.0);
        assert_eq!(ranges[2].end(), 100.0);
    }

    #[test]
    fn test_allocate_ranges_renormalizes_when_phase_dropped() {
        // three phases weighted 40/40/20 with the third disabled
        let ranges = allocate_ranges(&[40, 40]);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start(), 0.0);
        assert_eq!(ranges[0].end(), 50.0);
        assert_eq!(ranges[1].start(), 50.0);
        assert_eq!(ranges[1].end(), 100.0);
    }

    #[test]
    fn test_allocate_ranges_are_contiguous() {
        let ranges = allocate_ranges(&[7, 13, 29, 51]);
        assert_eq!(ranges.first().unwrap().start(), 0.0);
        assert_eq!(ranges.last().unwrap().end(), 100.0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
    }

    #[test]
    fn test_allocate_ranges_empty() {
        assert!(allocate_ranges(&[]).is_empty());
    }

    #[test]
    #[should_panic(expected = "must not all be zero")]
    fn test_allocate_ranges_all_zero_panics() {
        allocate_ranges(&[0, 0]);
    }

    #[test]
    fn test_empty_scan_summary() {
        let surface = MemorySurface::new();
        let mut ctx = AppContext::for_tests(Box::new(surface));
        let summary = run_scan(&mut ctx, Vec::new());
        assert!(!summary.has_work());
        assert!(summary.outcomes.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_aggregates_rows_and_respects_ranges() {
        let surface = MemorySurface::new();
        let frames = surface.frames_handle();
        let mut ctx = AppContext::for_tests(Box::new(surface));

        let table = "echo 'Name  Id  Version  Available'; \
                     echo '---------------------------'; \
                     echo 'Foo   Foo.App   1.0   2.0'";
        let phases = vec![
            ScanPhase {
                name: "apps",
                weight: 40,
                work: PhaseWork::Command {
                    command: ExternalCommand::new("sh")
                        .args(["-c", table])
                        .with_title("Scanning app updates")
                        .with_soft_total(50),
                    kind: RowKind::AppUpgrade,
                    shape: ShapeHint::ColumnTable,
                    timeout: Duration::from_secs(20),
                },
            },
            ScanPhase {
                name: "updates",
                weight: 40,
                work: PhaseWork::Command {
                    command: ExternalCommand::new("sh")
                        .args(["-c", "echo '[{\"Title\": \"KB5031354 cumulative\", \"UpdateId\": \"u-1\", \"Categories\": []}]'"])
                        .with_title("Scanning Windows updates")
                        .with_soft_total(40),
                    kind: RowKind::OsUpdate,
                    shape: ShapeHint::JsonArray,
                    timeout: Duration::from_secs(20),
                },
            },
        ];

        let summary = run_scan(&mut ctx, phases);
        assert_eq!(summary.apps_needing_update(), 1);
        assert_eq!(summary.updates_available(), 1);
        assert_eq!(summary.apps[0].id, "Foo.App");
        assert_eq!(summary.updates[0].update_id, "u-1");
        assert_eq!(summary.outcomes.len(), 2);
        assert!(summary.outcomes.iter().all(|o| o.exit_code == 0));

        let frames = frames.borrow();
        let mut last = 0.0;
        for frame in frames.iter() {
            assert!(frame.progress >= last);
            last = frame.progress;
        }
        assert_eq!(frames.last().unwrap().progress, 100.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_phase_contributes_zero_rows_and_scan_continues() {
        let surface = MemorySurface::new();
        let mut ctx = AppContext::for_tests(Box::new(surface));

        let bad_table = "echo 'Name  Id  Version  Available'; \
                         echo '---------------------------'; \
                         echo 'Foo   Foo.App   1.0   2.0'; \
                         exit 9";
        let good_json = "echo '[{\"Title\": \"Fix\", \"UpdateId\": \"u-2\", \"Categories\": []}]'";
        let phases = vec![
            ScanPhase {
                name: "apps",
                weight: 50,
                work: PhaseWork::Command {
                    command: ExternalCommand::new("sh").args(["-c", bad_table]),
                    kind: RowKind::AppUpgrade,
                    shape: ShapeHint::ColumnTable,
                    timeout: Duration::from_secs(20),
                },
            },
            ScanPhase {
                name: "updates",
                weight: 50,
                work: PhaseWork::Command {
                    command: ExternalCommand::new("sh").args(["-c", good_json]),
                    kind: RowKind::OsUpdate,
                    shape: ShapeHint::JsonArray,
                    timeout: Duration::from_secs(20),
                },
            },
        ];

        let summary = run_scan(&mut ctx, phases);
        // the failed tool's rows are not trusted
        assert!(summary.apps.is_empty());
        assert_eq!(summary.outcomes[0].exit_code, 9);
        assert_eq!(summary.outcomes[0].rows, 0);
        // the scan still ran the next phase
        assert_eq!(summary.updates_available(), 1);
    }

    #[test]
    fn test_missing_command_phase_records_127() {
        let surface = MemorySurface::new();
        let mut ctx = AppContext::for_tests(Box::new(surface));
        let phases = vec![ScanPhase {
            name: "apps",
            weight: 100,
            work: PhaseWork::Command {
                command: ExternalCommand::new("definitely-not-a-real-binary-upkeep"),
                kind: RowKind::AppUpgrade,
                shape: ShapeHint::ColumnTable,
                timeout: Duration::from_secs(5),
            },
        }];
        let summary = run_scan(&mut ctx, phases);
        assert_eq!(summary.outcomes[0].exit_code, crate::exec::EXIT_NOT_FOUND);
        assert_eq!(summary.outcomes[0].rows, 0);
        assert!(summary.apps.is_empty());
    }
}
