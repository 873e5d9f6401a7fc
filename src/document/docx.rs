//! WordprocessingML (`.docx`) packaging.
//!
//! Writes the minimal set of parts Word and LibreOffice need: content types,
//! package and document relationships, the main document, styles, numbering
//! definitions, core properties and the embedded media.

use super::{Block, Document, Image, ImageFormat, ListKind};
use crate::config::RenderSettings;
use crate::error::Result;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// MIME type of a `.docx` file.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// English Metric Units per inch.
const EMU_PER_INCH: f64 = 914_400.0;

/// Formatting knobs for the writer.
#[derive(Debug, Clone)]
pub struct DocxOptions {
    /// Display width of every embedded image.
    pub image_width_inches: f64,
    pub code_font: String,
    /// Hex fill of the code paragraph shading.
    pub code_shading: String,
}

impl Default for DocxOptions {
    fn default() -> Self {
        Self::from(&RenderSettings::default())
    }
}

impl From<&RenderSettings> for DocxOptions {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            image_width_inches: settings.image_width_inches,
            code_font: settings.code_font.clone(),
            code_shading: settings.code_shading.clone(),
        }
    }
}

/// Write a [`Document`] to a `.docx` file on disk.
pub fn write_docx<P: AsRef<Path>>(doc: &Document, options: &DocxOptions, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_docx_to_writer(doc, options, file)
}

/// Serialize a [`Document`] into an in-memory `.docx`.
pub fn to_docx_bytes(doc: &Document, options: &DocxOptions) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    write_docx_to_writer(doc, options, &mut buffer)?;
    Ok(buffer.into_inner())
}

/// Write a [`Document`] to any [`Write`] + [`Seek`] destination.
pub fn write_docx_to_writer<W: Write + Seek>(
    doc: &Document,
    options: &DocxOptions,
    writer: W,
) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let deflate = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    // Already-compressed media goes in as is.
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let images: Vec<&Image> = doc
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Image(image) => Some(image),
            _ => None,
        })
        .collect();

    zip.start_file("[Content_Types].xml", deflate)?;
    zip.write_all(generate_content_types(&images).as_bytes())?;

    zip.start_file("_rels/.rels", deflate)?;
    zip.write_all(PACKAGE_RELS_XML.as_bytes())?;

    zip.start_file("docProps/core.xml", deflate)?;
    zip.write_all(generate_core(doc).as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", deflate)?;
    zip.write_all(generate_document_rels(&images).as_bytes())?;

    zip.start_file("word/document.xml", deflate)?;
    zip.write_all(generate_document(doc, options).as_bytes())?;

    zip.start_file("word/styles.xml", deflate)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("word/numbering.xml", deflate)?;
    zip.write_all(NUMBERING_XML.as_bytes())?;

    for (index, image) in images.iter().enumerate() {
        zip.start_file(media_path(index, image), stored)?;
        zip.write_all(&image.data)?;
    }

    zip.finish()?;
    Ok(())
}

/// Relationship id of the nth image. rId1/rId2 are styles and numbering.
fn image_rel_id(index: usize) -> String {
    format!("rId{}", index + 3)
}

fn media_name(index: usize, image: &Image) -> String {
    format!("image{}.{}", index + 1, image.format.extension())
}

fn media_path(index: usize, image: &Image) -> String {
    format!("word/media/{}", media_name(index, image))
}

fn generate_content_types(images: &[&Image]) -> String {
    let mut types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
"#,
    );
    let mut formats: Vec<ImageFormat> = Vec::new();
    for image in images {
        if !formats.contains(&image.format) {
            formats.push(image.format);
        }
    }
    for format in formats {
        types.push_str(&format!(
            "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
            format.extension(),
            format.content_type()
        ));
    }
    types.push_str(
        r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>
"#,
    );
    types
}

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

fn generate_core(doc: &Document) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut core = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
"#,
    );
    if let Some(ref title) = doc.title {
        core.push_str(&format!("  <dc:title>{}</dc:title>\n", escape_xml(title)));
    }
    core.push_str("  <dc:creator>studykit</dc:creator>\n");
    core.push_str(&format!(
        "  <dcterms:created xsi:type=\"dcterms:W3CDTF\">{}</dcterms:created>\n",
        now
    ));
    core.push_str(&format!(
        "  <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{}</dcterms:modified>\n",
        now
    ));
    core.push_str("</cp:coreProperties>\n");
    core
}

fn generate_document_rels(images: &[&Image]) -> String {
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
"#,
    );
    for (index, image) in images.iter().enumerate() {
        rels.push_str(&format!(
            "  <Relationship Id=\"{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"media/{}\"/>\n",
            image_rel_id(index),
            media_name(index, image)
        ));
    }
    rels.push_str("</Relationships>\n");
    rels
}

fn generate_document(doc: &Document, options: &DocxOptions) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">
<w:body>
"#,
    );

    let mut image_index = 0;
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                xml.push_str(&styled_paragraph(&format!("Heading{}", level), text));
            }
            Block::Paragraph(text) => {
                xml.push_str("<w:p>");
                xml.push_str(&text_run(text, None));
                xml.push_str("</w:p>\n");
            }
            Block::ListItem { text, kind } => {
                let style = match kind {
                    ListKind::Bullet => "ListBullet",
                    ListKind::Numbered => "ListNumber",
                };
                xml.push_str(&styled_paragraph(style, text));
            }
            Block::Image(image) => {
                xml.push_str(&image_paragraph(image, image_index, options));
                image_index += 1;
            }
            Block::Code(text) => {
                xml.push_str(&format!(
                    "<w:p><w:pPr><w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/></w:pPr>",
                    escape_xml(&options.code_shading)
                ));
                xml.push_str(&text_run(text, Some(&options.code_font)));
                xml.push_str("</w:p>\n");
            }
        }
    }

    xml.push_str(
        r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>
</w:body>
</w:document>
"#,
    );
    xml
}

fn styled_paragraph(style: &str, text: &str) -> String {
    format!(
        "<w:p><w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>{}</w:p>\n",
        style,
        text_run(text, None)
    )
}

/// A single run; embedded newlines become `<w:br/>`.
fn text_run(text: &str, font: Option<&str>) -> String {
    let mut run = String::from("<w:r>");
    if let Some(font) = font {
        let font = escape_xml(font);
        run.push_str(&format!(
            "<w:rPr><w:rFonts w:ascii=\"{0}\" w:hAnsi=\"{0}\" w:cs=\"{0}\"/></w:rPr>",
            font
        ));
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run.push_str("<w:br/>");
        }
        run.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            escape_xml(line.trim_end_matches('\r'))
        ));
    }
    run.push_str("</w:r>");
    run
}

/// Inline picture scaled to the configured width, aspect ratio kept.
fn image_paragraph(image: &Image, index: usize, options: &DocxOptions) -> String {
    let cx = (options.image_width_inches * EMU_PER_INCH).round() as u64;
    let cy = cx * u64::from(image.height_px) / u64::from(image.width_px.max(1));
    let id = index + 1;
    let name = media_name(index, image);
    let rel = image_rel_id(index);

    format!(
        concat!(
            "<w:p><w:r><w:drawing>",
            "<wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">",
            "<wp:extent cx=\"{cx}\" cy=\"{cy}\"/>",
            "<wp:docPr id=\"{id}\" name=\"Picture {id}\"/>",
            "<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect=\"1\"/></wp:cNvGraphicFramePr>",
            "<a:graphic><a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:pic><pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>",
            "<pic:blipFill><a:blip r:embed=\"{rel}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>",
            "<pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>",
            "</pic:pic></a:graphicData></a:graphic></wp:inline>",
            "</w:drawing></w:r></w:p>\n"
        ),
        cx = cx,
        cy = cy,
        id = id,
        name = name,
        rel = rel,
    )
}

/// Escape text for XML and drop characters XML 1.0 cannot carry.
/// Escape text for XML, dropping characters XML 1.0 does not allow.
fn escape_xml(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || !c.is_control())
        .filter(|&c| !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
        .collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="480" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="26"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading3">
    <w:name w:val="heading 3"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="200" w:after="60"/><w:outlineLvl w:val="2"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="1F3763"/><w:sz w:val="24"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:contextualSpacing/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListNumber">
    <w:name w:val="List Number"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:numPr><w:numId w:val="2"/></w:numPr><w:contextualSpacing/></w:pPr>
  </w:style>
</w:styles>
"#;

const NUMBERING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:multiLevelType w:val="singleLevel"/>
    <w:lvl w:ilvl="0">
      <w:start w:val="1"/>
      <w:numFmt w:val="bullet"/>
      <w:lvlText w:val="•"/>
      <w:lvlJc w:val="left"/>
      <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
    </w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:multiLevelType w:val="singleLevel"/>
    <w:lvl w:ilvl="0">
      <w:start w:val="1"/>
      <w:numFmt w:val="decimal"/>
      <w:lvlText w:val="%1."/>
      <w:lvlJc w:val="left"/>
      <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
    </w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>
"#;
