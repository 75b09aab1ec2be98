//! Spreadsheet input
//!
//! Reads the first worksheet of a spreadsheet container and extracts the
//! column whose header matches a caller-supplied name. The worksheet is
//! located through the workbook's relationship table rather than by guessing
//! part names, and shared-string, inline-string and plain value cells are
//! all understood. Column resolution is by the letter-derived index of each
//! cell reference, so rows with missing cells stay aligned.

use crate::input::{InputError, InputResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// One cell of the raw grid: 1-based column index plus its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub col: u32,
    pub text: String,
}

/// Reads the URLs under the header `column` (case-insensitive match) from
/// the first worksheet. Blank cells are skipped.
pub fn read_urls_from_sheet(path: &Path, column: &str) -> InputResult<Vec<String>> {
    let rows = read_first_sheet_rows(path)?;
    let wanted = column.trim().to_lowercase();

    let header_col = rows
        .first()
        .and_then(|header| {
            header
                .iter()
                .find(|cell| cell.text.trim().to_lowercase() == wanted)
        })
        .map(|cell| cell.col)
        .ok_or_else(|| InputError::MissingColumn(column.to_string()))?;

    let urls = rows[1..]
        .iter()
        .filter_map(|row| row.iter().find(|cell| cell.col == header_col))
        .map(|cell| cell.text.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    Ok(urls)
}

/// Reads the first worksheet as a raw cell grid.
///
/// Also used to read reports back in tests and tooling.
pub fn read_first_sheet_rows(path: &Path) -> InputResult<Vec<Vec<SheetCell>>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let workbook = read_part(&mut archive, "xl/workbook.xml")?;
    let rel_id = first_sheet_rel_id(&workbook)?;

    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let target = rel_target(&rels, &rel_id)?;
    let sheet_path = resolve_sheet_path(&target);

    let shared = match read_optional_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(text) => parse_shared_strings(&text)?,
        None => Vec::new(),
    };

    let sheet = read_part(&mut archive, &sheet_path)?;
    parse_sheet_rows(&sheet, &shared)
}

/// Converts column letters to a 1-based index (`A` = 1, `AA` = 27).
pub(crate) fn letters_to_index(letters: &str) -> u32 {
    letters
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .fold(0, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1))
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> InputResult<String> {
    let mut part = archive.by_name(name)?;
    let mut text = String::new();
    part.read_to_string(&mut text)?;
    Ok(text)
}

fn read_optional_part(archive: &mut ZipArchive<File>, name: &str) -> InputResult<Option<String>> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut text = String::new();
            part.read_to_string(&mut text)?;
            Ok(Some(text))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Relationship id of the first `<sheet>` entry in the workbook.
fn first_sheet_rel_id(workbook: &str) -> InputResult<String> {
    let mut reader = Reader::from_str(workbook);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" {
                        if let Ok(value) = attr.unescape_value() {
                            return Ok(value.into_owned());
                        }
                    }
                }
            }
            Event::Eof => return Err(InputError::MissingSheet),
            _ => {}
        }
    }
}

/// Target of the relationship with the given id.
fn rel_target(rels: &str, rel_id: &str) -> InputResult<String> {
    let mut reader = Reader::from_str(rels);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|v| v.into_owned()),
                        b"Target" => target = attr.unescape_value().ok().map(|v| v.into_owned()),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rel_id) {
                    if let Some(target) = target {
                        return Ok(target);
                    }
                }
            }
            Event::Eof => return Err(InputError::MissingSheet),
            _ => {}
        }
    }
}

fn resolve_sheet_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else {
        format!("xl/{}", target)
    }
}

/// Parses the shared-string table: one concatenated string per `<si>`.
fn parse_shared_strings(text: &str) -> InputResult<Vec<String>> {
    let mut reader = Reader::from_str(text);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(t) if in_t => current.push_str(&t.unescape()?),
            Event::CData(t) if in_t => current.push_str(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Parses `<sheetData>` into rows of `(column, text)` cells.
fn parse_sheet_rows(sheet: &str, shared: &[String]) -> InputResult<Vec<Vec<SheetCell>>> {
    let mut reader = Reader::from_str(sheet);
    let mut rows: Vec<Vec<SheetCell>> = Vec::new();
    let mut current_row: Vec<SheetCell> = Vec::new();
    let mut in_row = false;

    // Per-cell state
    let mut cell_col = 0u32;
    let mut cell_type = String::new();
    let mut cell_value = String::new();
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current_row = Vec::new();
                }
                b"c" if in_row => {
                    let (col, kind) = cell_attrs(&e, &current_row);
                    cell_col = col;
                    cell_type = kind;
                    cell_value.clear();
                }
                b"v" => capture = true,
                b"t" if in_row => capture = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" if in_row => {
                    let (col, _) = cell_attrs(&e, &current_row);
                    current_row.push(SheetCell {
                        col,
                        text: String::new(),
                    });
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = false;
                    rows.push(std::mem::take(&mut current_row));
                }
                b"c" if in_row => {
                    let text = resolve_cell_text(&cell_type, &cell_value, shared);
                    current_row.push(SheetCell {
                        col: cell_col,
                        text,
                    });
                }
                b"v" | b"t" => capture = false,
                _ => {}
            },
            Event::Text(t) if capture => cell_value.push_str(&t.unescape()?),
            Event::CData(t) if capture => cell_value.push_str(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

/// Column index and type of a `<c>` element. A missing reference places the
/// cell right after the previous one.
fn cell_attrs(element: &quick_xml::events::BytesStart<'_>, row_so_far: &[SheetCell]) -> (u32, String) {
    let mut col = None;
    let mut kind = String::new();
    for attr in element.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"r" => {
                if let Ok(reference) = attr.unescape_value() {
                    let letters: String =
                        reference.chars().filter(|c| c.is_ascii_alphabetic()).collect();
                    col = Some(letters_to_index(&letters.to_uppercase()));
                }
            }
            b"t" => {
                if let Ok(value) = attr.unescape_value() {
                    kind = value.into_owned();
                }
            }
            _ => {}
        }
    }
    let col = col.unwrap_or_else(|| row_so_far.last().map(|c| c.col + 1).unwrap_or(1));
    (col, kind)
}

fn resolve_cell_text(cell_type: &str, value: &str, shared: &[String]) -> String {
    match cell_type {
        "s" => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared.get(idx))
            .cloned()
            .unwrap_or_default(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    #[test]
    fn test_letters_to_index() {
        assert_eq!(letters_to_index("A"), 1);
        assert_eq!(letters_to_index("F"), 6);
        assert_eq!(letters_to_index("Z"), 26);
        assert_eq!(letters_to_index("AA"), 27);
    }

    /// A minimal handcrafted workbook: shared-string header, inline and
    /// plain cells, one sparse row.
    fn write_fixture_workbook(path: &Path) {
        let file = File::create(path).unwrap();
        let mut archive = ZipWriter::new(file);
        let options = FileOptions::default();

        let parts: [(&str, &str); 4] = [
            (
                "xl/workbook.xml",
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Liste" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2"><si><t>Ad</t></si><si><t>URL</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                concat!(
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
                    r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#,
                    r#"<row r="2"><c r="A2" t="inlineStr"><is><t>one</t></is></c><c r="B2" t="inlineStr"><is><t>http://a.test/one.png</t></is></c></row>"#,
                    r#"<row r="3"><c r="B3" t="inlineStr"><is><t>  http://a.test/two.pdf  </t></is></c></row>"#,
                    r#"<row r="4"><c r="A4" t="inlineStr"><is><t>blank url</t></is></c><c r="B4" t="inlineStr"><is><t></t></is></c></row>"#,
                    r#"</sheetData></worksheet>"#,
                ),
            ),
        ];
        for (name, body) in parts {
            archive.start_file(name, options).unwrap();
            archive.write_all(body.as_bytes()).unwrap();
        }
        archive.finish().unwrap();
    }

    #[test]
    fn test_reads_urls_under_matching_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liste.xlsx");
        write_fixture_workbook(&path);

        // Case-insensitive header match; blanks skipped; sparse row aligned.
        let urls = read_urls_from_sheet(&path, "url").unwrap();
        assert_eq!(
            urls,
            vec![
                "http://a.test/one.png".to_string(),
                "http://a.test/two.pdf".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_header_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liste.xlsx");
        write_fixture_workbook(&path);

        let err = read_urls_from_sheet(&path, "Link").unwrap_err();
        assert!(matches!(err, InputError::MissingColumn(name) if name == "Link"));
    }

    #[test]
    fn test_raw_grid_resolves_shared_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liste.xlsx");
        write_fixture_workbook(&path);

        let rows = read_first_sheet_rows(&path).unwrap();
        assert_eq!(rows[0][0].text, "Ad");
        assert_eq!(rows[0][1].text, "URL");
        assert_eq!(rows[2][0].col, 2);
    }
}
