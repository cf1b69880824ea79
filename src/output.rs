//! Types produced by the publish and assemble stages, and the final
//! [`ConversionOutput`] returned to callers.

use crate::document::OcrPage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// An image that was decoded and uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImage {
    pub id: String,
    /// Object key within the bucket, e.g. `paper/2024-05-01/img-0.jpeg.png`.
    pub key: String,
    /// Public URL the Markdown links to.
    pub url: String,
}

/// Images published during one run, looked up by exact id.
///
/// Keeps publication order for reporting. Ids are document-scoped; a repeated
/// id resolves to the URL recorded last, which is identical because keys are
/// derived from the id and the run date only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageMap {
    published: Vec<PublishedImage>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: PublishedImage) {
        self.by_id.insert(image.id.clone(), self.published.len());
        self.published.push(image);
    }

    pub fn url(&self, id: &str) -> Option<&str> {
        self.by_id
            .get(id)
            .map(|&i| self.published[i].url.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublishedImage> {
        self.published.iter()
    }
}

impl FromIterator<PublishedImage> for ImageMap {
    fn from_iter<I: IntoIterator<Item = PublishedImage>>(iter: I) -> Self {
        let mut map = ImageMap::new();
        for image in iter {
            map.insert(image);
        }
        map
    }
}

/// Markdown lines for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub lines: Vec<String>,
}

impl RenderedPage {
    pub fn file_name(&self) -> String {
        format!("page-{}.md", self.page_num)
    }

    pub fn to_markdown(&self) -> String {
        self.lines.join("\n")
    }
}

/// Per-page Markdown plus the combined document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub pages: Vec<RenderedPage>,
    pub combined: String,
}

/// Name of the combined Markdown file.
pub const COMBINED_FILE_NAME: &str = "all-pages.md";

/// Aggregate statistics for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: usize,
    /// Images reported by OCR across all pages.
    pub images_seen: usize,
    pub images_published: usize,
    /// Images without inline bytes or with undecodable payloads.
    pub images_skipped: usize,
    pub files_written: usize,
    pub ocr_duration_ms: u64,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub pages: Vec<OcrPage>,
    pub images: ImageMap,
    pub document: RenderedDocument,
    /// Files written to the output directory, in write order.
    pub files: Vec<PathBuf>,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(id: &str, url: &str) -> PublishedImage {
        PublishedImage {
            id: id.to_string(),
            key: format!("paper/2024-01-01/{id}.png"),
            url: url.to_string(),
        }
    }

    #[test]
    fn lookup_is_exact() {
        let map: ImageMap = vec![published("img-1", "https://cdn/a.png")]
            .into_iter()
            .collect();
        assert_eq!(map.url("img-1"), Some("https://cdn/a.png"));
        assert_eq!(map.url("IMG-1"), None);
        assert_eq!(map.url("img-1 "), None);
        assert!(!map.contains("img-10"));
    }

    #[test]
    fn keeps_publication_order() {
        let map: ImageMap = vec![
            published("b", "https://cdn/b.png"),
            published("a", "https://cdn/a.png"),
        ]
        .into_iter()
        .collect();
        let ids: Vec<&str> = map.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn rendered_page_file_name_is_one_indexed() {
        let page = RenderedPage {
            page_num: 3,
            lines: vec!["# Page 3".into(), "text".into()],
        };
        assert_eq!(page.file_name(), "page-3.md");
        assert_eq!(page.to_markdown(), "# Page 3\ntext");
    }
}
