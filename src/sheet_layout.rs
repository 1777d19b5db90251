//! Template layout discovery and structural repair.
//!
//! The master template is maintained by hand and drifts: columns get
//! renamed, reordered or deleted between rounds. Nothing here hard-codes a
//! column index. Each semantic field carries an ordered chain of header
//! patterns matched against row 1, independently per field, and the
//! canonical policy structurally re-inserts the "Värde" column family when
//! the whole family is missing. Repair always runs before the final map is
//! built, never interleaved with it, so inserted columns can never leave a
//! stale index behind.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, Xlsx};
use once_cell::sync::Lazy;
use regex::Regex;

/// Preferred data-sheet name; the first sheet is used when absent.
pub const DATA_SHEET: &str = "Data";

/// 1-based sheet row of the first data row; row 1 is the header.
pub const DATA_START_ROW: usize = 2;

/// Semantic field keys, named after the canonical template headers.
pub mod col {
    pub const MATCH_NR: &str = "Matchnr";
    pub const HOME: &str = "Hemmalag";
    pub const AWAY: &str = "Bortalag";
    pub const ODDS_1: &str = "Odds % 1";
    pub const ODDS_X: &str = "Odds % X";
    pub const ODDS_2: &str = "Odds % 2";
    pub const FOLK_1: &str = "Folk % 1";
    pub const FOLK_X: &str = "Folk % X";
    pub const FOLK_2: &str = "Folk % 2";
    pub const VALUE_1: &str = "Värde 1";
    pub const VALUE_X: &str = "Värde X";
    pub const VALUE_2: &str = "Värde 2";
    pub const FORM_HOME: &str = "Form H (senaste 5)";
    pub const FORM_AWAY: &str = "Form B (senaste 5)";
    pub const H2H: &str = "H2H senaste 5";
    pub const XG_H_OVERALL: &str = "xG H (overall)";
    pub const XG_H_HOME: &str = "xG H (hemma)";
    pub const XGA_H_OVERALL: &str = "xGA H (overall)";
    pub const XGA_H_HOME: &str = "xGA H (hemma)";
    pub const GF_H: &str = "Gjorda mål H (overall)";
    pub const GA_H: &str = "Insläppta H (overall)";
    pub const XG_B_OVERALL: &str = "xG B (overall)";
    pub const XG_B_AWAY: &str = "xG B (borta)";
    pub const XGA_B_OVERALL: &str = "xGA B (overall)";
    pub const XGA_B_AWAY: &str = "xGA B (borta)";
    pub const GF_B: &str = "Gjorda mål B (overall)";
    pub const GA_B: &str = "Insläppta B (overall)";
    pub const PPG_H_OVERALL: &str = "PPG H (overall)";
    pub const PPG_H_HOME: &str = "PPG H (hemma)";
    pub const PPG_B_OVERALL: &str = "PPG B (overall)";
    pub const PPG_B_AWAY: &str = "PPG B (borta)";
    pub const SOURCE: &str = "Footy-källa";
}

/// Header pattern chains, first-match-wins per field. New template variants
/// are added here, not in code.
const HEADER_CHAINS: &[(&str, &[&str])] = &[
    (col::MATCH_NR, &[r"(?i)^match\s*nr\.?$", r"(?i)^match\s*nummer$", r"(?i)^nr\.?$"]),
    (col::HOME, &[r"(?i)^hemmalag$", r"(?i)^hemma$", r"(?i)^home(?:\s*team)?$"]),
    (col::AWAY, &[r"(?i)^bortalag$", r"(?i)^borta$", r"(?i)^away(?:\s*team)?$"]),
    (col::ODDS_1, &[r"(?i)^odds\s*%?\s*1$", r"(?i)^odds\s*hemma$"]),
    (col::ODDS_X, &[r"(?i)^odds\s*%?\s*x$", r"(?i)^odds\s*kryss$"]),
    (col::ODDS_2, &[r"(?i)^odds\s*%?\s*2$", r"(?i)^odds\s*borta$"]),
    (col::FOLK_1, &[r"(?i)^folk\s*%?\s*1$", r"(?i)^svenska\s*folket\s*1$"]),
    (col::FOLK_X, &[r"(?i)^folk\s*%?\s*x$", r"(?i)^svenska\s*folket\s*x$"]),
    (col::FOLK_2, &[r"(?i)^folk\s*%?\s*2$", r"(?i)^svenska\s*folket\s*2$"]),
    (col::VALUE_1, &[r"(?i)^värde\s*1$", r"(?i)^spelvärde\s*1$"]),
    (col::VALUE_X, &[r"(?i)^värde\s*x$", r"(?i)^spelvärde\s*x$"]),
    (col::VALUE_2, &[r"(?i)^värde\s*2$", r"(?i)^spelvärde\s*2$"]),
    (
        col::FORM_HOME,
        &[r"(?i)^form\s*h(?:\s*\(senaste\s*5\))?$", r"(?i)^form\s*hemma$"],
    ),
    (
        col::FORM_AWAY,
        &[r"(?i)^form\s*b(?:\s*\(senaste\s*5\))?$", r"(?i)^form\s*borta$"],
    ),
    (col::H2H, &[r"(?i)^h2h(?:\s*senaste\s*5)?$", r"(?i)^head\s*to\s*head$"]),
    (col::XG_H_OVERALL, &[r"(?i)^xg\s*h\s*\(overall\)$", r"(?i)^xg\s*h$"]),
    (col::XG_H_HOME, &[r"(?i)^xg\s*h\s*\(hemma\)$"]),
    (col::XGA_H_OVERALL, &[r"(?i)^xga\s*h\s*\(overall\)$", r"(?i)^xga\s*h$"]),
    (col::XGA_H_HOME, &[r"(?i)^xga\s*h\s*\(hemma\)$"]),
    (
        col::GF_H,
        &[r"(?i)^gjorda\s*mål\s*h(?:\s*\(overall\))?$", r"(?i)^mål\s*h$"],
    ),
    (col::GA_H, &[r"(?i)^insläppta\s*h(?:\s*\(overall\))?$"]),
    (col::XG_B_OVERALL, &[r"(?i)^xg\s*b\s*\(overall\)$", r"(?i)^xg\s*b$"]),
    (col::XG_B_AWAY, &[r"(?i)^xg\s*b\s*\(borta\)$"]),
    (col::XGA_B_OVERALL, &[r"(?i)^xga\s*b\s*\(overall\)$", r"(?i)^xga\s*b$"]),
    (col::XGA_B_AWAY, &[r"(?i)^xga\s*b\s*\(borta\)$"]),
    (
        col::GF_B,
        &[r"(?i)^gjorda\s*mål\s*b(?:\s*\(overall\))?$", r"(?i)^mål\s*b$"],
    ),
    (col::GA_B, &[r"(?i)^insläppta\s*b(?:\s*\(overall\))?$"]),
    (col::PPG_H_OVERALL, &[r"(?i)^ppg\s*h\s*\(overall\)$", r"(?i)^ppg\s*h$"]),
    (col::PPG_H_HOME, &[r"(?i)^ppg\s*h\s*\(hemma\)$"]),
    (col::PPG_B_OVERALL, &[r"(?i)^ppg\s*b\s*\(overall\)$", r"(?i)^ppg\s*b$"]),
    (col::PPG_B_AWAY, &[r"(?i)^ppg\s*b\s*\(borta\)$"]),
    (col::SOURCE, &[r"(?i)^footy-?källa$", r"(?i)^källa$"]),
];

/// Every semantic field key, in canonical template order.
pub static FIELD_KEYS: Lazy<Vec<&'static str>> =
    Lazy::new(|| HEADER_CHAINS.iter().map(|(key, _)| *key).collect());

static COMPILED_CHAINS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    HEADER_CHAINS
        .iter()
        .map(|(key, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid header pattern"))
                .collect();
            (*key, compiled)
        })
        .collect()
});

/// The "Värde" columns vanish whenever the template is rebuilt from the
/// odds-only variant; they are recreated as a family next to the public-pick
/// columns.
const VALUE_FAMILY: [&str; 3] = [col::VALUE_1, col::VALUE_X, col::VALUE_2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// Leave missing columns out; their fields are skipped on write.
    SkipMissing,
    /// Re-insert known column families that are missing as a whole.
    InsertMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Dense value grid for one sheet, 1-based row/column accessors.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn get(&self, row: usize, column: usize) -> Option<&Cell> {
        if row == 0 || column == 0 {
            return None;
        }
        self.rows.get(row - 1).and_then(|r| r.get(column - 1))
    }

    pub fn set(&mut self, row: usize, column: usize, cell: Cell) {
        if row == 0 || column == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize(row, Vec::new());
        }
        let stored = &mut self.rows[row - 1];
        if stored.len() < column {
            stored.resize(column, Cell::Empty);
        }
        stored[column - 1] = cell;
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, cell)| (r + 1, c + 1, cell))
        })
    }

    /// Insert `labels.len()` columns starting at `at` (1-based), stamping
    /// the labels into the header row. Everything at or right of `at`
    /// shifts.
    pub fn insert_columns(&mut self, at: usize, labels: &[&str]) {
        if at == 0 || labels.is_empty() {
            return;
        }
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        for row in &mut self.rows {
            if row.len() < at - 1 {
                row.resize(at - 1, Cell::Empty);
            }
            for offset in 0..labels.len() {
                row.insert(at - 1 + offset, Cell::Empty);
            }
        }
        for (offset, label) in labels.iter().enumerate() {
            self.set(1, at + offset, Cell::Text((*label).to_string()));
        }
    }

    fn header_match(&self, patterns: &[Regex]) -> Option<usize> {
        let header = self.rows.first()?;
        for pattern in patterns {
            for (idx, cell) in header.iter().enumerate() {
                let Some(text) = cell.as_text() else {
                    continue;
                };
                if pattern.is_match(text.trim()) {
                    return Some(idx + 1);
                }
            }
        }
        None
    }

    fn last_header_column(&self) -> usize {
        let Some(header) = self.rows.first() else {
            return 0;
        };
        header
            .iter()
            .rposition(|cell| !matches!(cell, Cell::Empty))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }
}

/// All sheets of a template, values only.
#[derive(Debug, Clone)]
pub struct TemplateBook {
    pub sheets: Vec<(String, SheetGrid)>,
    data_idx: usize,
}

impl TemplateBook {
    pub fn data_sheet_name(&self) -> &str {
        &self.sheets[self.data_idx].0
    }

    pub fn data_sheet(&self) -> &SheetGrid {
        &self.sheets[self.data_idx].1
    }

    pub fn data_sheet_mut(&mut self) -> &mut SheetGrid {
        &mut self.sheets[self.data_idx].1
    }
}

pub fn load_template(path: &Path) -> Result<TemplateBook> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read template {}", path.display()))?;
    load_template_bytes(&bytes)
}

pub fn load_template_bytes(bytes: &[u8]) -> Result<TemplateBook> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("failed to open template workbook")?;
    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(anyhow!("template workbook has no sheets"));
    }

    let mut sheets = Vec::new();
    for name in &names {
        let range = workbook
            .worksheet_range(name)
            .with_context(|| format!("cannot read sheet {name}"))?;
        sheets.push((name.clone(), grid_from_range(&range)));
    }
    let data_idx = names.iter().position(|n| n == DATA_SHEET).unwrap_or(0);
    Ok(TemplateBook { sheets, data_idx })
}

fn grid_from_range(range: &Range<Data>) -> SheetGrid {
    let mut grid = SheetGrid::default();
    let Some(start) = range.start() else {
        return grid;
    };
    let (height, width) = range.get_size();
    for r in 0..(start.0 as usize + height) {
        for c in 0..(start.1 as usize + width) {
            let Some(data) = range.get_value((r as u32, c as u32)) else {
                continue;
            };
            let cell = cell_from_data(data);
            if cell != Cell::Empty {
                grid.set(r + 1, c + 1, cell);
            }
        }
    }
    grid
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    /// Semantic field key to 1-based column index.
    pub columns: HashMap<&'static str, usize>,
    pub data_start_row: usize,
    /// Field keys whose columns were created by structural repair.
    pub inserted: Vec<&'static str>,
}

impl SheetLayout {
    pub fn column(&self, key: &str) -> Option<usize> {
        self.columns.get(key).copied()
    }

    /// Sheet row for a match number; header occupies row 1.
    pub fn row_for_match(&self, match_nr: u8) -> usize {
        self.data_start_row - 1 + match_nr as usize
    }
}

/// Resolve the column map, repairing the grid first under
/// [`LayoutPolicy::InsertMissing`]. Absence of any one header never blocks
/// resolution of the others.
pub fn resolve_layout(grid: &mut SheetGrid, policy: LayoutPolicy) -> SheetLayout {
    let mut inserted = Vec::new();

    if policy == LayoutPolicy::InsertMissing {
        let family_missing = VALUE_FAMILY
            .iter()
            .all(|key| find_column(grid, key).is_none());
        if family_missing {
            let anchor = find_column(grid, col::FOLK_2)
                .map(|idx| idx + 1)
                .unwrap_or_else(|| grid.last_header_column() + 1);
            grid.insert_columns(anchor, &VALUE_FAMILY);
            inserted.extend(VALUE_FAMILY);
        }
    }

    let mut columns = HashMap::new();
    for (key, patterns) in COMPILED_CHAINS.iter() {
        if let Some(idx) = grid.header_match(patterns) {
            columns.insert(*key, idx);
        }
    }

    SheetLayout {
        columns,
        data_start_row: DATA_START_ROW,
        inserted,
    }
}

fn find_column(grid: &SheetGrid, key: &str) -> Option<usize> {
    let patterns = COMPILED_CHAINS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, p)| p)?;
    grid.header_match(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_headers(headers: &[&str]) -> SheetGrid {
        let mut grid = SheetGrid::default();
        for (idx, header) in headers.iter().enumerate() {
            grid.set(1, idx + 1, Cell::Text((*header).to_string()));
        }
        grid
    }

    #[test]
    fn headers_resolve_independently() {
        let mut grid = grid_with_headers(&["Matchnr", "Hemmalag", "mystery", "Odds % X"]);
        let layout = resolve_layout(&mut grid, LayoutPolicy::SkipMissing);
        assert_eq!(layout.column(col::MATCH_NR), Some(1));
        assert_eq!(layout.column(col::HOME), Some(2));
        assert_eq!(layout.column(col::ODDS_X), Some(4));
        assert_eq!(layout.column(col::AWAY), None);
    }

    #[test]
    fn header_variants_match_by_chain() {
        let mut grid = grid_with_headers(&["matchnummer", "HEMMA", "borta", "Spelvärde 1"]);
        let layout = resolve_layout(&mut grid, LayoutPolicy::SkipMissing);
        assert_eq!(layout.column(col::MATCH_NR), Some(1));
        assert_eq!(layout.column(col::HOME), Some(2));
        assert_eq!(layout.column(col::AWAY), Some(3));
        assert_eq!(layout.column(col::VALUE_1), Some(4));
    }

    #[test]
    fn value_family_is_inserted_after_folk() {
        let mut grid = grid_with_headers(&[
            "Matchnr", "Hemmalag", "Bortalag", "Folk % 1", "Folk % X", "Folk % 2", "Form H (senaste 5)",
        ]);
        // Pre-seed a data cell under the form column to verify shifting.
        grid.set(2, 7, Cell::Text("WWDLW".to_string()));

        let layout = resolve_layout(&mut grid, LayoutPolicy::InsertMissing);
        assert_eq!(layout.inserted, vec![col::VALUE_1, col::VALUE_X, col::VALUE_2]);
        assert_eq!(layout.column(col::VALUE_1), Some(7));
        assert_eq!(layout.column(col::VALUE_2), Some(9));
        // The form column and its data shifted right by the family width.
        assert_eq!(layout.column(col::FORM_HOME), Some(10));
        assert_eq!(
            grid.get(2, 10).and_then(|c| c.as_text()),
            Some("WWDLW")
        );
        assert_eq!(grid.get(2, 7), Some(&Cell::Empty));
    }

    #[test]
    fn partial_family_is_left_alone() {
        let mut grid = grid_with_headers(&["Matchnr", "Värde 1"]);
        let layout = resolve_layout(&mut grid, LayoutPolicy::InsertMissing);
        assert!(layout.inserted.is_empty());
        assert_eq!(layout.column(col::VALUE_1), Some(2));
        assert_eq!(layout.column(col::VALUE_X), None);
    }

    #[test]
    fn skip_policy_never_mutates() {
        let mut grid = grid_with_headers(&["Matchnr", "Hemmalag"]);
        let layout = resolve_layout(&mut grid, LayoutPolicy::SkipMissing);
        assert!(layout.inserted.is_empty());
        assert_eq!(grid.width(), 2);
        assert_eq!(layout.column(col::VALUE_1), None);
    }

    #[test]
    fn family_lands_at_end_without_anchor() {
        let mut grid = grid_with_headers(&["Matchnr", "Hemmalag", "Bortalag"]);
        let layout = resolve_layout(&mut grid, LayoutPolicy::InsertMissing);
        assert_eq!(layout.column(col::VALUE_1), Some(4));
        assert_eq!(layout.column(col::VALUE_2), Some(6));
    }

    #[test]
    fn row_mapping_offsets_past_header() {
        let layout = SheetLayout {
            data_start_row: 2,
            ..SheetLayout::default()
        };
        assert_eq!(layout.row_for_match(5), 6);
        assert_eq!(layout.row_for_match(1), 2);
    }
}
