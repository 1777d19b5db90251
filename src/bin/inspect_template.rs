//! Print a template workbook's resolved layout.
//!
//! Quick operator check after editing the master file: which sheet is the
//! data sheet, which semantic fields resolve to which columns, and which
//! headers nothing matched.

use std::path::PathBuf;

use anyhow::Result;

use strykanalys::sheet_layout::{self, LayoutPolicy};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Stryktipsanalys_MASTER.xlsx"));

    let book = sheet_layout::load_template(&path)?;
    println!("template: {}", path.display());
    for (name, grid) in &book.sheets {
        println!(
            "sheet {:?}: rows={}, cols={}",
            name,
            grid.height(),
            grid.width()
        );
    }
    println!("data sheet: {:?}", book.data_sheet_name());

    // Inspection only, so no structural repair.
    let mut grid = book.data_sheet().clone();
    let layout = sheet_layout::resolve_layout(&mut grid, LayoutPolicy::SkipMissing);

    let mut resolved: Vec<(&str, usize)> = layout
        .columns
        .iter()
        .map(|(key, idx)| (*key, *idx))
        .collect();
    resolved.sort_by_key(|(_, idx)| *idx);

    println!("\nresolved columns:");
    for (key, idx) in &resolved {
        println!("  {idx:>3}  {key}");
    }

    let unresolved: Vec<&str> = sheet_layout::FIELD_KEYS
        .iter()
        .copied()
        .filter(|key| layout.column(key).is_none())
        .collect();
    if !unresolved.is_empty() {
        println!("\nunresolved fields:");
        for key in unresolved {
            println!("  {key}");
        }
    }

    Ok(())
}
