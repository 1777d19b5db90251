//! Projection of the match store into a filled copy of the template.
//!
//! The template is read fresh from storage on every export, the layout is
//! resolved once, then each record writes only its own row. A field that is
//! `None` never touches its cell, so values already present in the template
//! survive. Re-running with the same store and template reproduces the same
//! visible cell values.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::sheet_layout::{
    self, Cell, LayoutPolicy, SheetGrid, SheetLayout, TemplateBook, col,
};
use crate::state::{FootyRecord, FormOutcome, MatchRecord, StoreSnapshot};

pub struct ExportReport {
    pub coupon_rows: usize,
    pub stats_rows: usize,
    /// Columns created by structural repair.
    pub inserted_columns: Vec<&'static str>,
    /// Fields that held data but had no column to land in.
    pub skipped_fields: Vec<String>,
}

pub fn export_workbook(
    template_path: &Path,
    snapshot: &StoreSnapshot,
    policy: LayoutPolicy,
) -> Result<(Vec<u8>, ExportReport)> {
    let book = sheet_layout::load_template(template_path)?;
    fill_template(book, snapshot, policy)
}

pub fn export_bytes(
    template: &[u8],
    snapshot: &StoreSnapshot,
    policy: LayoutPolicy,
) -> Result<(Vec<u8>, ExportReport)> {
    let book = sheet_layout::load_template_bytes(template)?;
    fill_template(book, snapshot, policy)
}

fn fill_template(
    mut book: TemplateBook,
    snapshot: &StoreSnapshot,
    policy: LayoutPolicy,
) -> Result<(Vec<u8>, ExportReport)> {
    let layout = sheet_layout::resolve_layout(book.data_sheet_mut(), policy);

    let mut report = ExportReport {
        coupon_rows: 0,
        stats_rows: 0,
        inserted_columns: layout.inserted.clone(),
        skipped_fields: Vec::new(),
    };

    {
        let grid = book.data_sheet_mut();
        for record in &snapshot.coupon {
            write_coupon_row(grid, &layout, record, &mut report.skipped_fields);
            report.coupon_rows += 1;
        }
        for (match_nr, footy) in &snapshot.stats {
            write_footy_row(grid, &layout, *match_nr, footy, &mut report.skipped_fields);
            report.stats_rows += 1;
        }
    }

    let bytes = render_workbook(&book)?;
    Ok((bytes, report))
}

struct RowWriter<'a> {
    grid: &'a mut SheetGrid,
    layout: &'a SheetLayout,
    row: usize,
    skipped: &'a mut Vec<String>,
}

impl RowWriter<'_> {
    fn text(&mut self, key: &'static str, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        match self.layout.column(key) {
            Some(column) => self
                .grid
                .set(self.row, column, Cell::Text(value.to_string())),
            None => self.note_skip(key),
        }
    }

    fn number(&mut self, key: &'static str, value: Option<f64>) {
        let Some(value) = value else {
            return;
        };
        match self.layout.column(key) {
            Some(column) => self.grid.set(self.row, column, Cell::Number(value)),
            None => self.note_skip(key),
        }
    }

    fn note_skip(&mut self, key: &str) {
        if !self.skipped.iter().any(|k| k == key) {
            self.skipped.push(key.to_string());
        }
    }
}

fn write_coupon_row(
    grid: &mut SheetGrid,
    layout: &SheetLayout,
    record: &MatchRecord,
    skipped: &mut Vec<String>,
) {
    let mut w = RowWriter {
        row: layout.row_for_match(record.match_nr),
        grid,
        layout,
        skipped,
    };

    w.number(col::MATCH_NR, Some(record.match_nr as f64));
    w.text(col::HOME, Some(&record.home));
    w.text(col::AWAY, Some(&record.away));
    w.number(col::ODDS_1, record.odds_1);
    w.number(col::ODDS_X, record.odds_x);
    w.number(col::ODDS_2, record.odds_2);
    w.number(col::FOLK_1, record.folk_1.map(f64::from));
    w.number(col::FOLK_X, record.folk_x.map(f64::from));
    w.number(col::FOLK_2, record.folk_2.map(f64::from));
    w.number(col::VALUE_1, record.value_1);
    w.number(col::VALUE_X, record.value_x);
    w.number(col::VALUE_2, record.value_2);
}

fn write_footy_row(
    grid: &mut SheetGrid,
    layout: &SheetLayout,
    match_nr: u8,
    footy: &FootyRecord,
    skipped: &mut Vec<String>,
) {
    let h2h_cell = footy.h2h_text.clone().or_else(|| {
        footy
            .h2h
            .map(|t| format!("H:{} X:{} B:{}", t.wins, t.draws, t.losses))
    });

    let mut w = RowWriter {
        row: layout.row_for_match(match_nr),
        grid,
        layout,
        skipped,
    };

    w.text(col::FORM_HOME, form_string(&footy.home.form).as_deref());
    w.text(col::FORM_AWAY, form_string(&footy.away.form).as_deref());
    w.text(col::H2H, h2h_cell.as_deref());

    w.number(col::XG_H_OVERALL, footy.home.xg.overall);
    w.number(col::XG_H_HOME, footy.home.xg.side);
    w.number(col::XGA_H_OVERALL, footy.home.xga.overall);
    w.number(col::XGA_H_HOME, footy.home.xga.side);
    w.number(col::GF_H, footy.home.goals_for_avg);
    w.number(col::GA_H, footy.home.goals_against_avg);
    w.number(col::PPG_H_OVERALL, footy.home.ppg.overall);
    w.number(col::PPG_H_HOME, footy.home.ppg.side);

    w.number(col::XG_B_OVERALL, footy.away.xg.overall);
    w.number(col::XG_B_AWAY, footy.away.xg.side);
    w.number(col::XGA_B_OVERALL, footy.away.xga.overall);
    w.number(col::XGA_B_AWAY, footy.away.xga.side);
    w.number(col::GF_B, footy.away.goals_for_avg);
    w.number(col::GA_B, footy.away.goals_against_avg);
    w.number(col::PPG_B_OVERALL, footy.away.ppg.overall);
    w.number(col::PPG_B_AWAY, footy.away.ppg.side);

    w.text(col::SOURCE, footy.source.as_deref());
}

fn form_string(form: &[FormOutcome]) -> Option<String> {
    if form.is_empty() {
        return None;
    }
    Some(form.iter().map(|o| o.as_char()).collect())
}

fn render_workbook(book: &TemplateBook) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    for (name, grid) in &book.sheets {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(name)
            .with_context(|| format!("invalid sheet name {name}"))?;
        write_grid(sheet, grid)?;
    }
    workbook
        .save_to_buffer()
        .context("failed to serialize workbook")
}

fn write_grid(sheet: &mut Worksheet, grid: &SheetGrid) -> Result<()> {
    for (row, column, cell) in grid.iter_cells() {
        let r = (row - 1) as u32;
        let c = (column - 1) as u16;
        match cell {
            Cell::Empty => {}
            Cell::Text(s) => {
                sheet
                    .write_string(r, c, s)
                    .with_context(|| format!("write cell ({row},{column})"))?;
            }
            Cell::Number(v) => {
                sheet
                    .write_number(r, c, *v)
                    .with_context(|| format!("write cell ({row},{column})"))?;
            }
            Cell::Bool(b) => {
                sheet
                    .write_boolean(r, c, *b)
                    .with_context(|| format!("write cell ({row},{column})"))?;
            }
        }
    }
    Ok(())
}
