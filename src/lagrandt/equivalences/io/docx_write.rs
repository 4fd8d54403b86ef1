//! Minimal WordprocessingML writer for the equivalence proposal.
//!
//! The package holds only the parts Word needs to open the file: content
//! types, the package relationship, the main document, and a style sheet that
//! defines the `Normal` font and the `TableGrid` borders.

use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::lagrandt::equivalences::error::Result;
use crate::lagrandt::equivalences::model::{DocumentHeader, WorkingRow};

pub const DOCX_FILE_NAME: &str = "LA_Gran_DT_equivalencias.docx";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const TITLE: &str = "Propuesta de Equivalencias ITBA ↔ POLIMI";
pub const FOOTER: &str = "Generado automáticamente.";
pub const TABLE_HEADERS: [&str; 6] = [
    "Código ITBA",
    "Materia ITBA",
    "Créditos ITBA",
    "Código POLIMI",
    "Materia POLIMI",
    "ECTS",
];
pub const FONT_FAMILY: &str = "Calibri";
/// Font size in half-points (10 pt).
const FONT_SIZE_HALF_POINTS: u32 = 20;
const TABLE_STYLE: &str = "TableGrid";

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Renders the proposal document for `rows`, in the given order.
pub fn render_document(rows: &[WorkingRow], header: &DocumentHeader) -> Result<Vec<u8>> {
    let document = document_xml(rows, header)?;
    let styles = styles_xml()?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", styles.as_str()),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(rows = rows.len(), bytes = bytes.len(), "document rendered");
    Ok(bytes)
}

/// Labelled header runs in display order. Empty values are skipped.
fn header_runs(header: &DocumentHeader) -> Vec<String> {
    let fields = [
        ("Alumno", &header.student, "  "),
        ("Legajo", &header.id, "  "),
        ("Carrera", &header.program, "  "),
        ("Período", &header.term, ""),
    ];
    fields
        .into_iter()
        .filter_map(|(label, value, trailer)| match value.as_deref() {
            Some(value) if !value.is_empty() => Some(format!("{label}: {value}{trailer}")),
            _ => None,
        })
        .collect()
}

fn document_xml(rows: &[WorkingRow], header: &DocumentHeader) -> Result<String> {
    let mut xml = String::with_capacity(4096 + rows.len() * 1024);
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{WORD_NS}"><w:body>"#
    )?;

    xml.push_str(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#);
    write_run(&mut xml, TITLE, true)?;
    xml.push_str("</w:p>");

    xml.push_str("<w:p>");
    for run in header_runs(header) {
        write_run(&mut xml, &run, true)?;
    }
    xml.push_str("</w:p>");

    xml.push_str("<w:p/>");

    write_table(&mut xml, rows)?;

    xml.push_str("<w:p/>");
    xml.push_str("<w:p>");
    write_run(&mut xml, FOOTER, false)?;
    xml.push_str("</w:p>");

    xml.push_str(
        r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
    );
    xml.push_str("</w:body></w:document>");
    Ok(xml)
}

fn write_table(xml: &mut String, rows: &[WorkingRow]) -> Result<()> {
    write!(
        xml,
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="{TABLE_STYLE}"/><w:tblW w:w="5000" w:type="pct"/></w:tblPr><w:tblGrid>"#
    )?;
    for _ in TABLE_HEADERS {
        xml.push_str(r#"<w:gridCol w:w="1500"/>"#);
    }
    xml.push_str("</w:tblGrid>");

    write_row(xml, TABLE_HEADERS, true)?;
    for row in rows {
        write_row(xml, row.fields(), false)?;
    }

    xml.push_str("</w:tbl>");
    Ok(())
}

fn write_row(xml: &mut String, cells: [&str; 6], bold: bool) -> Result<()> {
    xml.push_str("<w:tr>");
    for cell in cells {
        xml.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr><w:p>"#);
        if !cell.is_empty() {
            write_run(xml, cell, bold)?;
        }
        xml.push_str("</w:p></w:tc>");
    }
    xml.push_str("</w:tr>");
    Ok(())
}

fn write_run(xml: &mut String, text: &str, bold: bool) -> Result<()> {
    xml.push_str("<w:r>");
    if bold {
        xml.push_str("<w:rPr><w:b/></w:rPr>");
    }
    write!(xml, r#"<w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text))?;
    Ok(())
}

fn styles_xml() -> Result<String> {
    let mut xml = String::with_capacity(2048);
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{WORD_NS}">"#
    )?;
    write!(
        xml,
        r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{FONT_FAMILY}" w:hAnsi="{FONT_FAMILY}" w:cs="{FONT_FAMILY}" w:eastAsia="{FONT_FAMILY}"/><w:sz w:val="{FONT_SIZE_HALF_POINTS}"/><w:szCs w:val="{FONT_SIZE_HALF_POINTS}"/></w:rPr></w:rPrDefault></w:docDefaults>"#
    )?;
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/><w:rPr><w:rFonts w:ascii="{FONT_FAMILY}" w:hAnsi="{FONT_FAMILY}" w:cs="{FONT_FAMILY}"/><w:sz w:val="{FONT_SIZE_HALF_POINTS}"/><w:szCs w:val="{FONT_SIZE_HALF_POINTS}"/></w:rPr></w:style>"#
    )?;
    xml.push_str(
        r#"<w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style>"#,
    );
    write!(
        xml,
        r#"<w:style w:type="table" w:styleId="{TABLE_STYLE}"><w:name w:val="Table Grid"/><w:basedOn w:val="TableNormal"/><w:tblPr><w:tblBorders>"#
    )?;
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        write!(
            xml,
            r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#
        )?;
    }
    xml.push_str("</w:tblBorders></w:tblPr></w:style></w:styles>");
    Ok(xml)
}
