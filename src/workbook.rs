//! Workbook assembly: write the 25-column table to an `.xlsx` file.
//!
//! The sheet is deliberately flat — one header row, one row per menu item,
//! no merged cells or formulas. Downstream menu-management tools import the
//! file by column header, so the header text and column order are the
//! contract; styling is cosmetic.

use crate::error::Menu2XlsxError;
use crate::menu::MenuTable;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Derive the output path from the user's base name.
///
/// The base name is used verbatim — spaces and all — with `.xlsx` appended.
/// `"menu 1"` becomes `menu 1.xlsx` in `dir`.
pub fn output_path(dir: &Path, base_name: &str) -> PathBuf {
    dir.join(format!("{base_name}.xlsx"))
}

/// Serialise the table to xlsx bytes in memory.
pub fn workbook_bytes(table: &MenuTable) -> Result<Vec<u8>, Menu2XlsxError> {
    let mut workbook = build_workbook(table)?;
    workbook
        .save_to_buffer()
        .map_err(|e| Menu2XlsxError::Internal(format!("Workbook serialisation failed: {e}")))
}

/// Write the table to `path` atomically (temp file + rename).
///
/// An interrupted run never leaves a truncated `.xlsx` behind — Excel
/// refuses half-written zip containers with an opaque repair dialog.
pub fn write_workbook(table: &MenuTable, path: &Path) -> Result<(), Menu2XlsxError> {
    let bytes = workbook_bytes(table)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Menu2XlsxError::OutputWriteFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        }
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    std::fs::write(&tmp_path, &bytes).map_err(|e| Menu2XlsxError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| Menu2XlsxError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    info!(
        "Wrote workbook: {} ({} rows, {} bytes)",
        path.display(),
        table.len(),
        bytes.len()
    );
    Ok(())
}

fn build_workbook(table: &MenuTable) -> Result<Workbook, Menu2XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Menu")
        .map_err(|e| Menu2XlsxError::Internal(format!("Worksheet setup failed: {e}")))?;

    // Plain text throughout: importers match on header names, not styling.
    let headers = MenuTable::headers();
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string(0, col as u16, header)
            .map_err(|e| Menu2XlsxError::Internal(format!("Header write failed: {e}")))?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let cells = MenuTable::row_cells(row);
        for (col, cell) in cells.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            sheet
                .write_string((row_idx + 1) as u32, col as u16, cell)
                .map_err(|e| Menu2XlsxError::Internal(format!("Cell write failed: {e}")))?;
        }
    }

    debug!("Built workbook: {} data rows, {} columns", table.len(), headers.len());
    Ok(workbook)
}
