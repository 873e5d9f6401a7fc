//! In-memory document model.
//!
//! A [`Document`] is a flat, ordered list of [`Block`]s. The renderer builds
//! one from HTML; [`docx`] packages it as a WordprocessingML file.

pub mod docx;

pub use docx::{to_docx_bytes, write_docx, write_docx_to_writer, DocxOptions, DOCX_MIME};

use crate::error::{Result, StudyError};
use std::io::Cursor;

/// Kind of list a list item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
}

/// Raster formats that can be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension used inside the package.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// An embedded image with its pixel size.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
}

impl Image {
    /// Sniff format and dimensions from raw bytes.
    ///
    /// Only PNG and JPEG are accepted; anything else is an error.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let reader = image::ImageReader::new(Cursor::new(&data)).with_guessed_format()?;
        let format = match reader.format() {
            Some(image::ImageFormat::Png) => ImageFormat::Png,
            Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            other => {
                return Err(StudyError::Render(format!(
                    "Unsupported image format: {:?}",
                    other
                )))
            }
        };
        let (width_px, height_px) = reader.into_dimensions()?;
        if width_px == 0 || height_px == 0 {
            return Err(StudyError::Render("Image has zero size".to_string()));
        }
        Ok(Self {
            data,
            format,
            width_px,
            height_px,
        })
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// One semantic unit of the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Heading with level 1-3.
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { text: String, kind: ListKind },
    Image(Image),
    /// Preformatted code, line breaks preserved.
    Code(String),
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }

    pub fn list_item(text: impl Into<String>, kind: ListKind) -> Self {
        Block::ListItem {
            text: text.into(),
            kind,
        }
    }
}

/// Ordered sequence of blocks, optionally titled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of embedded images.
    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Image(_)))
            .count()
    }
}
