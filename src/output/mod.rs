//! Output module: report serialization and atomic persistence
//!
//! The report is always written to a `.tmp` sibling first and renamed into
//! place only once the write succeeded, so a partially-written file is never
//! visible under the final name.

pub mod xml;

mod xlsx;

pub use xlsx::{
    pixels_to_col_width, ReportRow, ReportWriter, HYPERLINK_FORMULA_MAX_LEN, REPORT_HEADERS,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while producing the report
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container error: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("Report could not be moved into place; kept at {kept}: {source}")]
    Persist {
        kept: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Persists a report atomically at `target`.
///
/// Writes `<target>.tmp`, then removes any pre-existing file at `target` and
/// renames the temporary into place. On a removal or rename failure the
/// temporary file is left on disk and the error names it.
pub fn persist_report(report: &ReportWriter, target: &Path) -> OutputResult<PathBuf> {
    let tmp = tmp_sibling(target);
    report.save(&tmp)?;

    if target.exists() {
        if let Err(source) = std::fs::remove_file(target) {
            return Err(OutputError::Persist { kept: tmp, source });
        }
    }
    match std::fs::rename(&tmp, target) {
        Ok(()) => {
            tracing::debug!("report persisted at {}", target.display());
            Ok(target.to_path_buf())
        }
        Err(source) => Err(OutputError::Persist { kept: tmp, source }),
    }
}

/// `<target>.tmp`, keeping the original extension in place.
pub fn tmp_sibling(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_row_report() -> ReportWriter {
        let mut report = ReportWriter::new();
        report.push(ReportRow {
            url: "http://x.test/a.png".to_string(),
            file_name: "a".to_string(),
            name_len: 1,
            extension: "png".to_string(),
            size_mb: Some(0.5),
            status: "OK".to_string(),
        });
        report
    }

    #[test]
    fn test_tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("/out/report.xlsx")),
            PathBuf::from("/out/report.xlsx.tmp")
        );
    }

    #[test]
    fn test_persist_leaves_no_tmp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.xlsx");

        let written = persist_report(&one_row_report(), &target).unwrap();

        assert_eq!(written, target);
        assert!(target.exists());
        assert!(!tmp_sibling(&target).exists());
    }

    #[test]
    fn test_persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.xlsx");
        std::fs::write(&target, b"stale").unwrap();

        persist_report(&one_row_report(), &target).unwrap();

        let bytes = std::fs::read(&target).unwrap();
        // A zip archive, not the stale placeholder.
        assert_eq!(&bytes[..2], b"PK");
    }
}
