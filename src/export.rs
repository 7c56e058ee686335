use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::domain::DbvError;
use crate::table::TableModel;

/// Dump the table to CSV: one header line from the column labels, one line
/// per row from the raw (pre-format) values. Cells are joined with plain
/// commas; embedded commas are not escaped, the format targets the same
/// machine tooling the caches come from.
pub fn export_csv(model: &TableModel, path: &Path) -> Result<(), DbvError> {
    let mut out = String::new();
    let header: Vec<String> = (0..model.column_count())
        .map(|c| model.header_label(c))
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in model.raw_rows() {
        out.push_str(&row.join(","));
        out.push('\n');
    }

    write_file(path, &out)
        .map_err(|e| DbvError::ExportFailed(format!("{}: {e}", path.display())))?;
    info!("Exported {} rows to {}", model.row_count(), path.display());
    Ok(())
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())
}
