//! Row parsing: exact JSON decode first, column-table heuristics second
//!
//! Every wrapped tool reports either JSON or a column-aligned table, and
//! several can produce both depending on version and flags. The parser is
//! fed incrementally (one line at a time while the process runs) and settles
//! on a final row set when the stream ends: the declared shape is attempted
//! first, the alternate shape is the fallback, and nothing in here is a hard
//! error. Unusable rows are counted, not raised.

use crate::rows::{AppRow, ParsedRow, RowKind, UpdateRow};
use serde_json::Value;

/// Declared expected output format, guiding the first parse attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeHint {
    /// A JSON array of row objects (winget `--output json`, update scans)
    JsonArray,
    /// A single JSON object (brew `outdated --json=v2`)
    JsonObject,
    /// A column-aligned table with a header and a dashed separator
    ColumnTable,
}

/// Final parse outcome: accepted rows in input order, plus how many
/// candidate rows were dropped for failing the validity rules
#[derive(Debug, Default)]
pub struct ParseReport {
    pub rows: Vec<ParsedRow>,
    pub dropped: usize,
}

/// Stateful line-by-line parser for one command's output
pub struct RowParser {
    kind: RowKind,
    shape: ShapeHint,
    raw: String,
    header_seen: bool,
    separator_seen: bool,
    table_rows: Vec<ParsedRow>,
    table_dropped: usize,
}

impl RowParser {
    pub fn new(kind: RowKind, shape: ShapeHint) -> Self {
        Self {
            kind,
            shape,
            raw: String::new(),
            header_seen: false,
            separator_seen: false,
            table_rows: Vec::new(),
            table_dropped: 0,
        }
    }

    /// Feed one raw output line. The table state machine runs on every line
    /// regardless of the declared shape, so a failed JSON decode still has
    /// rows to fall back on.
    pub fn push_line(&mut self, line: &str) {
        self.raw.push_str(line);
        self.raw.push('\n');
        self.observe_table_line(line);
    }

    fn observe_table_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if !self.header_seen {
            if is_header(trimmed) {
                self.header_seen = true;
                self.separator_seen = false;
            }
            // anything before the header is noise
            return;
        }
        if !self.separator_seen {
            self.separator_seen = is_separator(trimmed);
            return;
        }
        let columns = split_columns(trimmed);
        match map_table_row(self.kind, &columns) {
            Some(row) => self.table_rows.push(row),
            None => self.table_dropped += 1,
        }
    }

    /// Settle on the final row set. JSON shapes try an exact decode of the
    /// whole captured text and fall back to whatever the table pass
    /// collected; the table shape goes the other way when the text turns
    /// out to be JSON after all.
    pub fn finish(self) -> ParseReport {
        let text = self.raw.trim();
        let table_report = ParseReport {
            rows: self.table_rows,
            dropped: self.table_dropped,
        };
        match self.shape {
            ShapeHint::JsonArray | ShapeHint::JsonObject => {
                parse_json(self.kind, text).unwrap_or(table_report)
            }
            ShapeHint::ColumnTable => {
                if table_report.rows.is_empty() && looks_like_json(text) {
                    if let Some(report) = parse_json(self.kind, text) {
                        return report;
                    }
                }
                table_report
            }
        }
    }
}

/// One-shot parse of fully captured text
pub fn parse_text(kind: RowKind, shape: ShapeHint, text: &str) -> ParseReport {
    let mut parser = RowParser::new(kind, shape);
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}

// ---------------- column-table heuristics ----------------

const HEADER_KEYWORDS: [&str; 4] = ["Name", "Id", "Version", "Title"];

fn is_header(trimmed: &str) -> bool {
    let Some(first) = trimmed.split_whitespace().next() else {
        return false;
    };
    HEADER_KEYWORDS.contains(&first) && trimmed.split_whitespace().count() >= 2
}

fn is_separator(trimmed: &str) -> bool {
    trimmed.chars().all(|c| c == '-' || c == ' ')
        && trimmed.chars().filter(|c| *c == '-').count() >= 3
}

/// Split a table line on runs of two or more whitespace characters. Single
/// spaces stay inside a column, so multi-word names survive.
fn split_columns(line: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0usize;
    for ch in line.chars() {
        if ch.is_whitespace() {
            whitespace_run += 1;
            continue;
        }
        if whitespace_run >= 2 && !current.is_empty() {
            columns.push(current.clone());
            current.clear();
        } else if whitespace_run == 1 && !current.is_empty() {
            current.push(' ');
        }
        whitespace_run = 0;
        current.push(ch);
    }
    if !current.is_empty() {
        columns.push(current);
    }
    columns
}

/// The empty-state message most tools print ("No installed package found
/// matching input criteria.") survives column splitting, so it is filtered
/// by its leading token.
fn is_no_results(field: &str) -> bool {
    field.to_lowercase().starts_with("no ")
}

fn map_table_row(kind: RowKind, columns: &[String]) -> Option<ParsedRow> {
    match kind {
        RowKind::AppUpgrade => {
            if columns.len() < 4 {
                return None;
            }
            let (name, id, version, available) =
                (&columns[0], &columns[1], &columns[2], &columns[3]);
            if id.is_empty() || available.is_empty() {
                return None;
            }
            if is_no_results(id) || is_no_results(name) {
                return None;
            }
            Some(ParsedRow::AppUpgrade(AppRow {
                id: id.clone(),
                name: name.clone(),
                version: version.clone(),
                available: available.clone(),
            }))
        }
        RowKind::InstalledApp => {
            if columns.len() < 3 {
                return None;
            }
            let (name, id, version) = (&columns[0], &columns[1], &columns[2]);
            if id.is_empty() || is_no_results(id) || is_no_results(name) {
                return None;
            }
            Some(ParsedRow::InstalledApp(AppRow {
                id: id.clone(),
                name: name.clone(),
                version: version.clone(),
                available: String::new(),
            }))
        }
        // update and driver sources report JSON or key/value blocks, never
        // column tables
        _ => None,
    }
}

// ---------------- JSON shapes ----------------

fn looks_like_json(text: &str) -> bool {
    text.starts_with('[') || text.starts_with('{')
}

fn parse_json(kind: RowKind, text: &str) -> Option<ParseReport> {
    if text.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    let mut report = ParseReport::default();
    match &value {
        Value::Array(items) => {
            for item in items {
                push_json_row(kind, item, &mut report);
            }
        }
        Value::Object(map) => {
            if matches!(kind, RowKind::AppUpgrade)
                && (map.contains_key("formulae") || map.contains_key("casks"))
            {
                for key in ["formulae", "casks"] {
                    if let Some(Value::Array(items)) = map.get(key) {
                        for item in items {
                            push_brew_row(item, &mut report);
                        }
                    }
                }
            } else {
                // PowerShell collapses a single-row array to a bare object
                push_json_row(kind, &value, &mut report);
            }
        }
        _ => return None,
    }
    Some(report)
}

fn push_json_row(kind: RowKind, item: &Value, report: &mut ParseReport) {
    if !item.is_object() {
        report.dropped += 1;
        return;
    }
    match kind {
        RowKind::AppUpgrade | RowKind::InstalledApp => {
            let id = str_field(item, &["Id", "PackageIdentifier"]).unwrap_or_default();
            let name = str_field(item, &["Name"]).unwrap_or_default();
            let version = str_field(item, &["Version", "InstalledVersion"]).unwrap_or_default();
            let available =
                str_field(item, &["Available", "AvailableVersion"]).unwrap_or_default();
            let valid = !id.is_empty()
                && !is_no_results(&id)
                && (kind == RowKind::InstalledApp || !available.is_empty());
            if !valid {
                report.dropped += 1;
                return;
            }
            let app = AppRow {
                id,
                name,
                version,
                available,
            };
            report.rows.push(match kind {
                RowKind::AppUpgrade => ParsedRow::AppUpgrade(app),
                _ => ParsedRow::InstalledApp(app),
            });
        }
        RowKind::OsUpdate | RowKind::DriverUpdate => {
            let title = str_field(item, &["Title"]).unwrap_or_default();
            if title.is_empty() {
                report.dropped += 1;
                return;
            }
            let update = UpdateRow {
                kb: kb_field(item, &title),
                update_id: str_field(item, &["UpdateId", "UpdateID"]).unwrap_or_default(),
                categories: string_array(item.get("Categories")),
                title,
            };
            report.rows.push(match kind {
                RowKind::OsUpdate => ParsedRow::OsUpdate(update),
                _ => ParsedRow::DriverUpdate(update),
            });
        }
        RowKind::InstalledDriver => {
            report.dropped += 1;
        }
    }
}

/// brew `outdated --json=v2` entry (formula or cask). A row without a real
/// version bump is dropped.
fn push_brew_row(item: &Value, report: &mut ParseReport) {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let latest = item
        .get("current_version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let current = item
        .get("installed_versions")
        .and_then(Value::as_array)
        .and_then(|versions| versions.last())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if name.is_empty() || latest.is_empty() || current.is_empty() || current == latest {
        report.dropped += 1;
        return;
    }
    report.rows.push(ParsedRow::AppUpgrade(AppRow {
        id: name.clone(),
        name,
        version: current,
        available: latest,
    }));
}

/// First non-empty string value among the given keys
fn str_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        item.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// KB can be a string, an array of strings, or absent with the number only
/// present inside the title.
fn kb_field(item: &Value, title: &str) -> Option<String> {
    match item.get("KB") {
        Some(Value::String(kb)) if !kb.is_empty() => Some(kb.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
            .or_else(|| kb_from_title(title)),
        _ => kb_from_title(title),
    }
}

/// Recover "KB" followed by 5-7 digits out of an update title
fn kb_from_title(title: &str) -> Option<String> {
    for (index, _) in title.match_indices("KB") {
        let digits: String = title[index + 2..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if (5..=7).contains(&digits.len()) {
            return Some(format!("KB{digits}"));
        }
    }
    None
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
