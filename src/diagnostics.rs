//! System report for the diagnostics view

use crate::output::OutputMode;
use crate::theme::Theme;
use serde::Serialize;
use sysinfo::System;

#[derive(Debug, Serialize)]
pub struct SystemReport {
    pub os_name: String,
    pub os_version: String,
    pub host: String,
    pub cpu: String,
    pub cpu_cores: usize,
    pub total_ram_bytes: u64,
    pub arch: String,
    pub uptime_secs: u64,
}

pub fn gather() -> SystemReport {
    let sys = System::new_all();
    SystemReport {
        os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
        os_version: System::os_version().unwrap_or_default(),
        host: System::host_name().unwrap_or_default(),
        cpu: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_default(),
        cpu_cores: sys.cpus().len(),
        total_ram_bytes: sys.total_memory(),
        arch: std::env::consts::ARCH.to_string(),
        uptime_secs: System::uptime(),
    }
}

pub fn print_report(report: &SystemReport, mode: OutputMode) {
    if mode == OutputMode::Quiet {
        return;
    }
    println!("{}", Theme::header("System"));
    println!("{}", Theme::divider(40));
    println!("OS:      {} {}", report.os_name, report.os_version);
    println!("Host:    {}", report.host);
    println!("CPU:     {} ({} cores)", report.cpu, report.cpu_cores);
    println!("RAM:     {}", bytesize::to_string(report.total_ram_bytes, true));
    println!("Arch:    {}", report.arch);
    println!("Uptime:  {}h {}m", report.uptime_secs / 3600, (report.uptime_secs % 3600) / 60);
}
