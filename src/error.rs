use thiserror::Error;

/// Failures reading from the record store. The engine never aggregates a
/// partial fetch, so any of these aborts the whole request.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid filter: {0}")]
    Validation(String),

    #[error("Template mismatch: {0}")]
    TemplateMismatch(String),

    #[error("No rows match the current filters")]
    EmptyExport,

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Template read error: {0}")]
    TemplateRead(#[from] calamine::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl From<rusqlite::Error> for ReportError {
    fn from(e: rusqlite::Error) -> Self {
        ReportError::Fetch(FetchError::Db(e))
    }
}

impl ReportError {
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, ReportError::Fetch(_))
    }

    pub fn is_validation_failure(&self) -> bool {
        matches!(self, ReportError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_errors_surface_as_fetch_failures() {
        let err: ReportError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.is_fetch_failure());
        assert!(err.to_string().starts_with("Fetch failed: Database error"));
    }

    #[test]
    fn test_validation_message_carries_reason() {
        let err = ReportError::Validation("unit range min 10 exceeds max 5".into());
        assert!(err.is_validation_failure());
        assert_eq!(err.to_string(), "Invalid filter: unit range min 10 exceeds max 5");
    }
}
