use rust_xlsxwriter::Workbook;

use crate::store::{BillRecord, COLUMNS};

pub const WORKBOOK_PATH: &str = "inventory/MAS Bills - MAS Bills.xlsx";

/// One-shot conversion of the inventory to a workbook: same rows and columns
/// as the CSV, everything written as text, no formatting. Returns the number
/// of data rows written.
pub fn export_workbook(records: &[BillRecord], path: &str) -> Result<usize, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (column, name) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, column as u16, *name)
            .map_err(|e| format!("Failed to write header '{}': {}", name, e))?;
    }

    for (row, record) in records.iter().enumerate() {
        for (column, value) in record.to_row().iter().enumerate() {
            worksheet
                .write_string(row as u32 + 1, column as u16, value.as_str())
                .map_err(|e| format!("Failed to write row for {}: {}", record.issue_code, e))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save workbook to {}: {}", path, e))?;

    Ok(records.len())
}
