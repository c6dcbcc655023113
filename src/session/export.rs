//! Writing the last row set to a file.

use crate::error::{DbError, DbResult};
use crate::models::RowSet;
use crate::session::format::format_value;
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Supported export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values; NULL is written as an empty field
    Csv,
    /// Tab-separated text with a dashed rule under the header
    Txt,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Txt => "TXT",
        }
    }
}

/// Write `rows` to `path` in `format`, returning the number of data rows.
pub fn export(rows: &RowSet, format: ExportFormat, path: &Path) -> DbResult<usize> {
    let written = match format {
        ExportFormat::Csv => write_csv(rows, path),
        ExportFormat::Txt => write_txt(rows, path),
    }
    .map_err(|e| DbError::persistence(path.display().to_string(), e))?;

    info!(
        path = %path.display(),
        format = format.name(),
        rows = written,
        "Exported results"
    );
    Ok(written)
}

fn write_csv(rows: &RowSet, path: &Path) -> Result<usize, csv::Error> {
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(BufWriter::new(file));

    if !rows.headers.is_empty() {
        writer.write_record(&rows.headers)?;
    }
    for row in &rows.rows {
        let record: Vec<String> = row.iter().map(csv_value).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(rows.row_count())
}

fn csv_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        other => format_value(other),
    }
}

fn write_txt(rows: &RowSet, path: &Path) -> Result<usize, csv::Error> {
    let mut out = BufWriter::new(File::create(path)?);

    if !rows.headers.is_empty() {
        let header = rows.headers.join("\t");
        writeln!(out, "{}", header)?;
        writeln!(out, "{}", "-".repeat(header.chars().count()))?;
    }
    for row in &rows.rows {
        let cells: Vec<String> = row.iter().map(format_value).collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    out.flush()?;
    Ok(rows.row_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> RowSet {
        RowSet::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![json!(1), json!("Alice, A.")],
                vec![json!(2), json!(null)],
            ],
        )
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ExportFormat::from_name("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_name("txt"), Some(ExportFormat::Txt));
        assert_eq!(ExportFormat::from_name("xlsx"), None);
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let written = export(&sample(), ExportFormat::Csv, &path).unwrap();
        assert_eq!(written, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,name\n1,\"Alice, A.\"\n2,\n");
    }

    #[test]
    fn test_export_txt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        export(&sample(), ExportFormat::Txt, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id\tname\n-------\n1\tAlice, A.\n2\tNULL\n");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        for (format, name) in [(ExportFormat::Csv, "out.csv"), (ExportFormat::Txt, "out.txt")] {
            let path = dir.path().join("missing").join(name);
            let err = export(&sample(), format, &path).unwrap_err();
            assert!(matches!(err, DbError::Persistence { .. }), "{:?}", format);
        }
    }
}
