//! Document model produced by the OCR stage.
//!
//! These types are the boundary between the OCR adapter and everything
//! downstream: the image publisher reads [`EmbeddedImage`]s, the Markdown
//! assembler reads [`OcrPage`]s. They are read-only once created.

use serde::{Deserialize, Serialize};

/// The PDF being converted: its bytes plus a human-readable name.
///
/// Read once from disk and moved into the OCR adapter for the upload.
#[derive(Clone)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// One page of OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// Zero-based page index in the source document.
    pub index: usize,
    /// Markdown text recognised on the page.
    pub markdown: String,
    /// Images detected on the page, in encounter order.
    #[serde(default)]
    pub images: Vec<EmbeddedImage>,
    pub dimensions: Option<PageDimensions>,
}

impl OcrPage {
    /// 1-indexed page number used in headings and file names.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Rendered size of a page as reported by the OCR service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub dpi: u32,
    pub width: u32,
    pub height: u32,
}

/// A raster region detected within a page.
///
/// `id` is unique within one document only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub id: String,
    /// Inline payload, possibly prefixed with a `data:image/...;base64,` URI header.
    pub image_base64: Option<String>,
    pub bbox: Option<BoundingBox>,
}

impl EmbeddedImage {
    pub fn has_inline_bytes(&self) -> bool {
        self.image_base64
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// Top-left / bottom-right corners in page-pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top_left_x: i64,
    pub top_left_y: i64,
    pub bottom_right_x: i64,
    pub bottom_right_y: i64,
}

impl BoundingBox {
    pub fn width(&self) -> i64 {
        self.bottom_right_x - self.top_left_x
    }

    pub fn height(&self) -> i64 {
        self.bottom_right_y - self.top_left_y
    }
}

/// Flatten every page's images into one list, preserving page then image order.
pub fn all_images(pages: &[OcrPage]) -> Vec<&EmbeddedImage> {
    pages.iter().flat_map(|p| p.images.iter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, payload: Option<&str>) -> EmbeddedImage {
        EmbeddedImage {
            id: id.to_string(),
            image_base64: payload.map(str::to_string),
            bbox: None,
        }
    }

    #[test]
    fn inline_bytes_detection() {
        assert!(image("a", Some("iVBORw0KGgo=")).has_inline_bytes());
        assert!(!image("b", None).has_inline_bytes());
        assert!(!image("c", Some("  \n")).has_inline_bytes());
    }

    #[test]
    fn all_images_keeps_encounter_order() {
        let pages = vec![
            OcrPage {
                index: 0,
                markdown: String::new(),
                images: vec![image("p0-a", None), image("p0-b", None)],
                dimensions: None,
            },
            OcrPage {
                index: 1,
                markdown: String::new(),
                images: vec![image("p1-a", None)],
                dimensions: None,
            },
        ];
        let ids: Vec<&str> = all_images(&pages).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["p0-a", "p0-b", "p1-a"]);
    }

    #[test]
    fn bbox_extent() {
        let b = BoundingBox {
            top_left_x: 10,
            top_left_y: 20,
            bottom_right_x: 110,
            bottom_right_y: 70,
        };
        assert_eq!(b.width(), 100);
        assert_eq!(b.height(), 50);
    }

    #[test]
    fn source_document_debug_hides_bytes() {
        let doc = SourceDocument::new("paper.pdf", vec![0u8; 2048]);
        let dbg = format!("{doc:?}");
        assert!(dbg.contains("paper.pdf"));
        assert!(dbg.contains("<2048 bytes>"));
    }
}
