//! Input readers: URL extraction from spreadsheets and WordPress exports
//!
//! Dispatch is by file extension. All input failures are reported before any
//! probing starts; a run never begins with a half-read URL list.

mod export;
mod sheet;

pub use export::read_urls_from_export;
pub use sheet::{read_first_sheet_rows, read_urls_from_sheet, SheetCell};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading the input file
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported input type {0:?}; expected .xlsx or .xml")]
    Unsupported(String),

    #[error("A URL column name is required for spreadsheet input")]
    ColumnNameRequired,

    #[error("No column titled {0:?} in the header row")]
    MissingColumn(String),

    #[error("No URLs found in the input")]
    NoUrls,

    #[error("Workbook has no worksheet")]
    MissingSheet,

    #[error("Container error: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for input operations
pub type InputResult<T> = Result<T, InputError>;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Spreadsheet container with a URL column
    Sheet,
    /// WordPress export file
    Export,
}

/// Picks the input format from the file extension.
pub fn input_kind(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "xlsx" => Some(InputKind::Sheet),
        "xml" => Some(InputKind::Export),
        _ => None,
    }
}

/// Reads the URL list from `path`.
///
/// `url_column` names the header of the URL column and is required for
/// spreadsheet input; export files ignore it. An empty extraction is an
/// error: a run with zero tasks is never started.
pub fn read_urls(path: &Path, url_column: Option<&str>) -> InputResult<Vec<String>> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }

    let kind = input_kind(path).ok_or_else(|| {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        InputError::Unsupported(ext)
    })?;

    let urls = match kind {
        InputKind::Sheet => {
            let column = url_column
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or(InputError::ColumnNameRequired)?;
            read_urls_from_sheet(path, column)?
        }
        InputKind::Export => read_urls_from_export(path)?,
    };

    if urls.is_empty() {
        return Err(InputError::NoUrls);
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind_by_extension() {
        assert_eq!(input_kind(Path::new("a/list.xlsx")), Some(InputKind::Sheet));
        assert_eq!(input_kind(Path::new("export.XML")), Some(InputKind::Export));
        assert_eq!(input_kind(Path::new("notes.txt")), None);
        assert_eq!(input_kind(Path::new("no_extension")), None);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_urls(Path::new("/definitely/not/here.xlsx"), Some("URL")).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_extension_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.csv");
        std::fs::write(&path, "url\nhttp://a.test/x.png\n").unwrap();

        let err = read_urls(&path, Some("URL")).unwrap_err();
        assert!(matches!(err, InputError::Unsupported(ext) if ext == "csv"));
    }

    #[test]
    fn test_sheet_input_requires_column_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.xlsx");
        std::fs::write(&path, b"placeholder").unwrap();

        let err = read_urls(&path, None).unwrap_err();
        assert!(matches!(err, InputError::ColumnNameRequired));
        let err = read_urls(&path, Some("  ")).unwrap_err();
        assert!(matches!(err, InputError::ColumnNameRequired));
    }
}
