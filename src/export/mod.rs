//! Spreadsheet and CSV artifacts.
//!
//! Every renderer builds the whole artifact in memory and hands back bytes
//! only once it is complete, so a failure never yields a partial file.

mod delimited;
mod template;
mod workbook;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

use crate::error::{ReportError, Result};
use crate::models::ExpenseRecord;
use crate::pivot::Pivot;
use crate::window::AggregatedRow;

pub use delimited::render_csv;
pub use template::render_templated;
pub use workbook::{render_workbook, sheet_names, MAX_SHEET_NAME};

/// Column order of the flat data table, shared by the template contract.
pub const DATA_HEADERS: [&str; 17] = [
    "Name",
    "Type",
    "City",
    "State",
    "Units",
    "Vintage Year",
    "Avg SqFt Per Unit",
    "Date",
    "Payroll",
    "Admin",
    "Marketing",
    "Repairs & Maint",
    "Turnover",
    "Utilities",
    "Taxes",
    "Insurance",
    "Mgmt Fees",
];

pub(crate) const FMT_WHOLE_DOLLARS: &str = "$#,##0";
pub(crate) const FMT_DOLLARS: &str = "$#,##0.00";
pub(crate) const FMT_DATE: &str = "yyyy-mm-dd";
pub(crate) const FMT_INTEGER: &str = "0";

/// Identity of the table region a template exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    pub sheet: String,
    pub table: String,
}

impl Default for TemplateSpec {
    fn default() -> Self {
        Self {
            sheet: "Data".to_string(),
            table: "DataTable".to_string(),
        }
    }
}

pub enum ExportRequest<'a> {
    /// Overview, one sheet per property, and the consolidated pivot.
    Workbook {
        prefix: &'a str,
        date: NaiveDate,
        /// Monthly rows; each property sheet lists its own.
        rows: &'a [AggregatedRow],
        pivot: &'a Pivot,
    },
    /// Flat records poured into a template's named table.
    Template {
        name: &'a str,
        template: &'a [u8],
        spec: &'a TemplateSpec,
        records: &'a [ExpenseRecord],
    },
    Csv {
        name: &'a str,
        rows: &'a [AggregatedRow],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Xlsx,
    Csv,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

/// `<prefix>_<YYYY-MM-DD>.<ext>`
pub fn dated_file_name(prefix: &str, date: NaiveDate, kind: ArtifactKind) -> String {
    format!("{prefix}_{}.{}", date.format("%Y-%m-%d"), kind.extension())
}

/// `<name>_Export.<ext>`
pub fn export_file_name(name: &str, kind: ArtifactKind) -> String {
    format!("{name}_Export.{}", kind.extension())
}

pub fn serialize(request: &ExportRequest<'_>) -> Result<Artifact> {
    let artifact = match request {
        ExportRequest::Workbook {
            prefix,
            date,
            rows,
            pivot,
        } => Artifact {
            file_name: dated_file_name(prefix, *date, ArtifactKind::Xlsx),
            kind: ArtifactKind::Xlsx,
            bytes: render_workbook(rows, pivot)?,
        },
        ExportRequest::Template {
            name,
            template,
            spec,
            records,
        } => Artifact {
            file_name: export_file_name(name, ArtifactKind::Xlsx),
            kind: ArtifactKind::Xlsx,
            bytes: render_templated(template, spec, records)?,
        },
        ExportRequest::Csv { name, rows } => Artifact {
            file_name: export_file_name(name, ArtifactKind::Csv),
            kind: ArtifactKind::Csv,
            bytes: render_csv(rows)?,
        },
    };
    info!("rendered {} ({} bytes)", artifact.file_name, artifact.bytes.len());
    Ok(artifact)
}

/// Write `artifact` into `dir` through a temporary file, renamed into place
/// only after every byte is flushed.
pub fn write_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&artifact.bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| ReportError::Io(e.error))?;
    info!("wrote {}", path.display());
    Ok(path)
}

pub(crate) fn require_rows<T>(rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Err(ReportError::EmptyExport);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(
            dated_file_name("Selected_Properties", date, ArtifactKind::Xlsx),
            "Selected_Properties_2025-03-07.xlsx"
        );
        assert_eq!(export_file_name("Portfolio", ArtifactKind::Csv), "Portfolio_Export.csv");
    }

    #[test]
    fn test_write_artifact_leaves_only_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            file_name: "Portfolio_Export.csv".into(),
            kind: ArtifactKind::Csv,
            bytes: b"Name,Period\n".to_vec(),
        };
        let path = write_artifact(&dir.path().join("exports"), &artifact).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("exports")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_serialize_rejects_empty_csv() {
        let request = ExportRequest::Csv {
            name: "Portfolio",
            rows: &[],
        };
        assert!(matches!(serialize(&request), Err(ReportError::EmptyExport)));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(ArtifactKind::Csv.content_type(), "text/csv");
        assert!(ArtifactKind::Xlsx.content_type().contains("spreadsheetml"));
    }
}
