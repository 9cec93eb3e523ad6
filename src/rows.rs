//! Typed records produced by the row parser
//!
//! Each wrapped tool reports rows in its own vocabulary; these variants pin
//! the known shapes down to fixed, named fields instead of loose key/value
//! maps.

use serde::Serialize;

/// Discriminant for the row variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// An application with an upgrade available
    AppUpgrade,
    /// An installed application (no upgrade information)
    InstalledApp,
    /// A pending OS update
    OsUpdate,
    /// A pending driver update (OS update scan restricted to drivers)
    DriverUpdate,
    /// A driver package present in the driver store
    InstalledDriver,
}

/// Package row as reported by winget or brew. `available` is empty for
/// plain installed listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRow {
    pub id: String,
    pub name: String,
    pub version: String,
    pub available: String,
}

/// OS or driver update row as reported by the update module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRow {
    pub title: String,
    pub kb: Option<String>,
    pub update_id: String,
    pub categories: Vec<String>,
}

/// Driver store entry as reported by pnputil
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverRow {
    pub published_name: String,
    pub provider: String,
    pub version: String,
    pub date: String,
}

/// One parsed output row, tagged with its kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParsedRow {
    AppUpgrade(AppRow),
    InstalledApp(AppRow),
    OsUpdate(UpdateRow),
    DriverUpdate(UpdateRow),
    InstalledDriver(DriverRow),
}

impl ParsedRow {
    pub fn kind(&self) -> RowKind {
        match self {
            ParsedRow::AppUpgrade(_) => RowKind::AppUpgrade,
            ParsedRow::InstalledApp(_) => RowKind::InstalledApp,
            ParsedRow::OsUpdate(_) => RowKind::OsUpdate,
            ParsedRow::DriverUpdate(_) => RowKind::DriverUpdate,
            ParsedRow::InstalledDriver(_) => RowKind::InstalledDriver,
        }
    }

    pub fn as_app(&self) -> Option<&AppRow> {
        match self {
            ParsedRow::AppUpgrade(app) | ParsedRow::InstalledApp(app) => Some(app),
            _ => None,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateRow> {
        match self {
            ParsedRow::OsUpdate(update) | ParsedRow::DriverUpdate(update) => Some(update),
            _ => None,
        }
    }

    pub fn as_driver(&self) -> Option<&DriverRow> {
        match self {
            ParsedRow::InstalledDriver(driver) => Some(driver),
            _ => None,
        }
    }
}
