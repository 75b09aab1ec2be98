//! Spreadsheet container writer
//!
//! Builds the report as a zipped set of XML parts, with no spreadsheet
//! library involved. The layout is one sheet: a bold header row, then one
//! row per probe result in original input order.
//!
//! Column A holds the source URL. URLs short enough for an inline
//! `HYPERLINK` formula (the format caps formula-embedded link targets at 255
//! characters) are written as formulas; longer ones degrade to plain text
//! and are registered in a sidecar relationship part keyed by cell
//! reference.

use crate::output::xml::{sanitize, XmlWriter};
use crate::output::{OutputError, OutputResult};
use crate::prober::ProbeResult;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_DOC_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Longest URL that still fits an inline HYPERLINK formula.
pub const HYPERLINK_FORMULA_MAX_LEN: usize = 255;

/// Header row, column A through F.
pub const REPORT_HEADERS: [&str; 6] = [
    "Source URL",
    "File name",
    "Length",
    "Extension",
    "Size (MB)",
    "Status",
];

const COLUMN_LETTERS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Column widths in pixels, converted to character widths on write.
const COLUMN_PIXELS: [u32; 6] = [900, 225, 75, 75, 100, 75];

const SHEET_NAME: &str = "URL Report";
const APP_NAME: &str = "LinkGauge";

/// One report row.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub url: String,
    pub file_name: String,
    /// Character count of `file_name`
    pub name_len: usize,
    pub extension: String,
    pub size_mb: Option<f64>,
    pub status: String,
}

impl From<&ProbeResult> for ReportRow {
    fn from(result: &ProbeResult) -> Self {
        Self {
            url: result.url.clone(),
            file_name: result.file_name.clone(),
            name_len: result.file_name.chars().count(),
            extension: result.extension.clone(),
            size_mb: result.size_mb,
            status: result.status.to_string(),
        }
    }
}

/// Accumulates rows and serializes the container.
#[derive(Debug, Default)]
pub struct ReportWriter {
    rows: Vec<ReportRow>,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Serializes the whole container to `out`.
    pub fn write_to<W: Write + Seek>(&self, out: W) -> OutputResult<()> {
        let mut archive = ZipWriter::new(out);
        let options = FileOptions::default();

        let (sheet, hyperlinks) = self.sheet_xml();

        write_part(&mut archive, "[Content_Types].xml", CONTENT_TYPES_XML, options)?;
        write_part(&mut archive, "_rels/.rels", ROOT_RELS_XML, options)?;
        write_part(&mut archive, "docProps/app.xml", &app_props_xml(), options)?;
        write_part(&mut archive, "docProps/core.xml", &core_props_xml(), options)?;
        write_part(&mut archive, "xl/workbook.xml", &workbook_xml(), options)?;
        write_part(
            &mut archive,
            "xl/_rels/workbook.xml.rels",
            WORKBOOK_RELS_XML,
            options,
        )?;
        write_part(&mut archive, "xl/styles.xml", STYLES_XML, options)?;
        write_part(&mut archive, "xl/worksheets/sheet1.xml", &sheet, options)?;
        if !hyperlinks.is_empty() {
            write_part(
                &mut archive,
                "xl/worksheets/_rels/sheet1.xml.rels",
                &sheet_rels_xml(&hyperlinks),
                options,
            )?;
        }

        archive.finish()?;
        Ok(())
    }

    /// Serializes the container to a file at `path`.
    pub fn save(&self, path: &Path) -> OutputResult<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Builds the worksheet part. Returns the XML plus the
    /// `(cell reference, URL)` pairs that need sidecar relationships.
    fn sheet_xml(&self) -> (String, Vec<(String, String)>) {
        let total_rows = self.rows.len() + 1;
        let dimension = format!("A1:F{}", total_rows);
        let mut hyperlinks: Vec<(String, String)> = Vec::new();

        let mut xml = XmlWriter::new();
        xml.open("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_DOC_REL)]);
        xml.empty("dimension", &[("ref", &dimension)]);

        xml.open("sheetViews", &[]);
        xml.open("sheetView", &[("workbookViewId", "0")]);
        xml.empty(
            "pane",
            &[
                ("ySplit", "1"),
                ("topLeftCell", "A2"),
                ("activePane", "bottomLeft"),
                ("state", "frozen"),
            ],
        );
        xml.close("sheetView");
        xml.close("sheetViews");
        xml.empty("sheetFormatPr", &[("defaultRowHeight", "15")]);

        xml.open("cols", &[]);
        for (i, pixels) in COLUMN_PIXELS.iter().enumerate() {
            let position = (i + 1).to_string();
            let width = pixels_to_col_width(*pixels).to_string();
            xml.empty(
                "col",
                &[
                    ("min", &position),
                    ("max", &position),
                    ("width", &width),
                    ("customWidth", "1"),
                ],
            );
        }
        xml.close("cols");

        xml.open("sheetData", &[]);

        xml.open("row", &[("r", "1")]);
        for (i, title) in REPORT_HEADERS.iter().enumerate() {
            let cell_ref = format!("{}1", COLUMN_LETTERS[i]);
            inline_cell(&mut xml, &cell_ref, Some("1"), title);
        }
        xml.close("row");

        for (offset, row) in self.rows.iter().enumerate() {
            let row_num = offset + 2;
            xml.open("row", &[("r", &row_num.to_string())]);

            let url = sanitize(&row.url);
            let url_ref = format!("A{}", row_num);
            if !url.is_empty() && url.chars().count() <= HYPERLINK_FORMULA_MAX_LEN {
                let formula = format!("HYPERLINK(\"{}\")", excel_quote(&url));
                xml.open("c", &[("r", &url_ref), ("s", "2"), ("t", "str")]);
                xml.leaf("f", &[], &formula);
                xml.leaf("v", &[], &url);
                xml.close("c");
            } else {
                inline_cell(&mut xml, &url_ref, Some("2"), &url);
                if !url.is_empty() {
                    hyperlinks.push((url_ref, url));
                }
            }

            inline_cell(&mut xml, &format!("B{}", row_num), None, &row.file_name);

            xml.open("c", &[("r", &format!("C{}", row_num)), ("s", "0")]);
            xml.leaf("v", &[], &row.name_len.to_string());
            xml.close("c");

            inline_cell(&mut xml, &format!("D{}", row_num), None, &row.extension);

            let size_ref = format!("E{}", row_num);
            match row.size_mb {
                Some(size) => {
                    xml.open("c", &[("r", &size_ref), ("s", "3")]);
                    xml.leaf("v", &[], &size.to_string());
                    xml.close("c");
                }
                None => {
                    xml.empty("c", &[("r", &size_ref), ("s", "3")]);
                }
            }

            inline_cell(&mut xml, &format!("F{}", row_num), None, &row.status);

            xml.close("row");
        }

        xml.close("sheetData");
        xml.empty("autoFilter", &[("ref", &dimension)]);

        if !hyperlinks.is_empty() {
            xml.open("hyperlinks", &[]);
            for (i, (cell_ref, _)) in hyperlinks.iter().enumerate() {
                xml.empty(
                    "hyperlink",
                    &[("ref", cell_ref), ("r:id", &hyperlink_rel_id(i))],
                );
            }
            xml.close("hyperlinks");
        }

        xml.close("worksheet");
        (xml.finish(), hyperlinks)
    }
}

/// `<c r=".." t="inlineStr" [s=".."]><is><t>..</t></is></c>`
fn inline_cell(xml: &mut XmlWriter, cell_ref: &str, style: Option<&str>, text: &str) {
    match style {
        Some(style) => xml.open("c", &[("r", cell_ref), ("t", "inlineStr"), ("s", style)]),
        None => xml.open("c", &[("r", cell_ref), ("t", "inlineStr")]),
    };
    xml.open("is", &[]);
    xml.leaf("t", &[], text);
    xml.close("is");
    xml.close("c");
}

fn hyperlink_rel_id(index: usize) -> String {
    format!("rIdHL{}", index + 1)
}

/// Doubles embedded quotes so the value survives inside a formula string.
fn excel_quote(text: &str) -> String {
    text.replace('"', "\"\"")
}

/// Pixel width to spreadsheet character width: `max(0, (px - 5) / 7)`,
/// rounded to 2 decimals.
pub fn pixels_to_col_width(pixels: u32) -> f64 {
    let width = ((pixels as f64 - 5.0) / 7.0).max(0.0);
    (width * 100.0).round() / 100.0
}

fn sheet_rels_xml(hyperlinks: &[(String, String)]) -> String {
    let rel_type = format!("{}/hyperlink", NS_DOC_REL);
    let mut xml = XmlWriter::new();
    xml.open("Relationships", &[("xmlns", NS_PKG_REL)]);
    for (i, (_, url)) in hyperlinks.iter().enumerate() {
        xml.empty(
            "Relationship",
            &[
                ("Id", &hyperlink_rel_id(i)),
                ("Type", &rel_type),
                ("Target", url),
                ("TargetMode", "External"),
            ],
        );
    }
    xml.close("Relationships");
    xml.finish()
}

fn workbook_xml() -> String {
    let mut xml = XmlWriter::new();
    xml.open("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_DOC_REL)]);
    xml.open("sheets", &[]);
    xml.empty(
        "sheet",
        &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")],
    );
    xml.close("sheets");
    xml.empty("calcPr", &[("fullCalcOnLoad", "1")]);
    xml.close("workbook");
    xml.finish()
}

fn core_props_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut xml = XmlWriter::new();
    xml.open(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    );
    xml.leaf("dc:title", &[], "URL audit report");
    xml.leaf("dc:creator", &[], APP_NAME);
    xml.leaf("cp:lastModifiedBy", &[], APP_NAME);
    xml.leaf("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &now);
    xml.leaf("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &now);
    xml.close("cp:coreProperties");
    xml.finish()
}

fn app_props_xml() -> String {
    let mut xml = XmlWriter::new();
    xml.open(
        "Properties",
        &[
            (
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            ),
            (
                "xmlns:vt",
                "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
            ),
        ],
    );
    xml.leaf("Application", &[], APP_NAME);
    xml.leaf("DocSecurity", &[], "0");
    xml.leaf("ScaleCrop", &[], "false");
    xml.open("HeadingPairs", &[]);
    xml.open("vt:vector", &[("size", "2"), ("baseType", "variant")]);
    xml.open("vt:variant", &[]);
    xml.leaf("vt:lpstr", &[], "Worksheets");
    xml.close("vt:variant");
    xml.open("vt:variant", &[]);
    xml.leaf("vt:i4", &[], "1");
    xml.close("vt:variant");
    xml.close("vt:vector");
    xml.close("HeadingPairs");
    xml.open("TitlesOfParts", &[]);
    xml.open("vt:vector", &[("size", "1"), ("baseType", "lpstr")]);
    xml.leaf("vt:lpstr", &[], SHEET_NAME);
    xml.close("vt:vector");
    xml.close("TitlesOfParts");
    xml.leaf("LinksUpToDate", &[], "false");
    xml.leaf("SharedDoc", &[], "false");
    xml.leaf("HyperlinksChanged", &[], "false");
    xml.leaf("AppVersion", &[], "16.0000");
    xml.close("Properties");
    xml.finish()
}

const CONTENT_TYPES_XML: &str = concat!(
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
    r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS_XML: &str = concat!(
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

const WORKBOOK_RELS_XML: &str = concat!(
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

/// Style table: xf 0 plain, 1 bold header, 2 hyperlink (blue, underlined),
/// 3 two-decimal number format (id 165).
const STYLES_XML: &str = concat!(
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<numFmts count="1"><numFmt numFmtId="165" formatCode="0.00"/></numFmts>"#,
    r#"<fonts count="3">"#,
    r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><sz val="11"/><color rgb="FF0000FF"/><name val="Calibri"/><u/></font>"#,
    r#"</fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="4">"#,
    r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
    r#"<xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
    r#"<xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    r#"</cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#
);

fn write_part<W: Write + Seek>(
    archive: &mut ZipWriter<W>,
    name: &str,
    content: &str,
    options: FileOptions,
) -> OutputResult<()> {
    archive.start_file(name, options)?;
    archive.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ReportRow {
        ReportRow {
            url: "http://x.test/a.png".to_string(),
            file_name: "a".to_string(),
            name_len: 1,
            extension: "png".to_string(),
            size_mb: Some(0.5),
            status: "OK".to_string(),
        }
    }

    #[test]
    fn test_pixels_to_col_width() {
        assert_eq!(pixels_to_col_width(900), 127.86);
        assert_eq!(pixels_to_col_width(75), 10.0);
        assert_eq!(pixels_to_col_width(3), 0.0);
    }

    #[test]
    fn test_excel_quote_doubles_quotes() {
        assert_eq!(excel_quote(r#"a"b"#), r#"a""b"#);
    }

    #[test]
    fn test_short_url_gets_inline_formula() {
        let mut writer = ReportWriter::new();
        writer.push(sample_row());
        let (sheet, hyperlinks) = writer.sheet_xml();

        assert!(sheet.contains("HYPERLINK(&quot;http://x.test/a.png&quot;)"));
        assert!(hyperlinks.is_empty());
    }

    #[test]
    fn test_long_url_degrades_to_sidecar_relationship() {
        let long_url = format!("http://x.test/{}", "a".repeat(300));
        let mut writer = ReportWriter::new();
        let mut row = sample_row();
        row.url = long_url.clone();
        writer.push(row);

        let (sheet, hyperlinks) = writer.sheet_xml();
        assert!(!sheet.contains("HYPERLINK"));
        assert!(sheet.contains(r#"<hyperlink ref="A2" r:id="rIdHL1"/>"#));
        assert_eq!(hyperlinks.len(), 1);
        assert_eq!(hyperlinks[0].0, "A2");

        let rels = sheet_rels_xml(&hyperlinks);
        assert!(rels.contains(&long_url));
        assert!(rels.contains(r#"TargetMode="External""#));
    }

    #[test]
    fn test_undetermined_size_is_an_empty_styled_cell() {
        let mut writer = ReportWriter::new();
        let mut row = sample_row();
        row.size_mb = None;
        writer.push(row);

        let (sheet, _) = writer.sheet_xml();
        assert!(sheet.contains(r#"<c r="E2" s="3"/>"#));
    }

    #[test]
    fn test_container_lists_expected_parts() {
        let mut writer = ReportWriter::new();
        writer.push(sample_row());

        let mut buf = std::io::Cursor::new(Vec::new());
        writer.write_to(&mut buf).unwrap();

        let mut archive = zip::ZipArchive::new(buf).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "docProps/core.xml",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        // No oversized URLs, so no sidecar part.
        assert!(!names.iter().any(|n| n.contains("sheet1.xml.rels")));
        drop(names);
        let _ = archive.by_name("xl/styles.xml").unwrap();
    }
}
