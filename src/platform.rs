//! OS detection and the per-OS feature capability matrix

use std::fmt;

/// Operating system family the console is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
}

impl OsKind {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OsKind::Windows,
            "macos" => OsKind::MacOs,
            _ => OsKind::Linux,
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::Windows => write!(f, "Windows"),
            OsKind::MacOs => write!(f, "macOS"),
            OsKind::Linux => write!(f, "Linux"),
        }
    }
}

/// Features the console may expose, gated per OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Apps,
    Updates,
    Drivers,
    PowerPlans,
    RestorePoint,
    JunkClean,
}

/// Which features exist on a given OS. Queried once when the application
/// context is built; the orchestrator and menus never probe the OS again.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Package upgrades (winget on Windows, brew on macOS)
    pub apps: bool,
    /// OS update scan/install (PSWindowsUpdate)
    pub updates: bool,
    /// Driver enumeration, rollback and export (pnputil)
    pub drivers: bool,
    /// Power plan switching (powercfg)
    pub power_plans: bool,
    /// System restore points
    pub restore_point: bool,
    /// Temp/junk cleanup
    pub junk_clean: bool,
}

impl Capabilities {
    pub fn for_os(os: OsKind) -> Self {
        match os {
            OsKind::Windows => Self {
                apps: true,
                updates: true,
                drivers: true,
                power_plans: true,
                restore_point: true,
                junk_clean: true,
            },
            OsKind::MacOs => Self {
                apps: true,
                updates: false,
                drivers: false,
                power_plans: false,
                restore_point: false,
                junk_clean: true,
            },
            // apt/dnf/pacman support could be added later
            OsKind::Linux => Self {
                apps: false,
                updates: false,
                drivers: false,
                power_plans: false,
                restore_point: false,
                junk_clean: true,
            },
        }
    }

    pub fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::Apps => self.apps,
            Feature::Updates => self.updates,
            Feature::Drivers => self.drivers,
            Feature::PowerPlans => self.power_plans,
            Feature::RestorePoint => self.restore_point,
            Feature::JunkClean => self.junk_clean,
        }
    }
}

/// Name of the package manager wrapped on this OS
pub fn pm_name(os: OsKind) -> &'static str {
    match os {
        OsKind::Windows => "winget",
        OsKind::MacOs => "brew",
        OsKind::Linux => "pkg-manager",
    }
}
