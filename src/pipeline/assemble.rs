//! Markdown assembly: OCR text plus published image links, written to disk.
//!
//! Each page becomes:
//!
//! ```text
//! # Page <n>
//! <OCR markdown, verbatim>
//! ![<id>](<url>)      ← one line per published image, in page order
//! ```
//!
//! written to `page-<n>.md`. The same lines, each page followed by a blank
//! line, form `all-pages.md`, which is written last.
//!
//! Files are written one at a time, each via temp file + rename, so a file is
//! either complete or absent. If a write fails the remaining files are not
//! written and pages already on disk are left in place.

use crate::document::OcrPage;
use crate::error::{messages, Paper2MdError};
use crate::output::{ImageMap, RenderedDocument, RenderedPage, COMBINED_FILE_NAME};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// A failed file write, with the path it was aimed at.
#[derive(Debug, Error)]
#[error("failed to write '{path}': {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Render one page. Images missing from `images` are omitted.
pub fn render_page(page: &OcrPage, images: &ImageMap) -> RenderedPage {
    let mut lines = Vec::with_capacity(2 + page.images.len());
    lines.push(format!("# Page {}", page.page_num()));
    lines.push(page.markdown.clone());
    for image in &page.images {
        if let Some(url) = images.url(&image.id) {
            lines.push(format!("![{}]({})", image.id, url));
        }
    }
    RenderedPage {
        page_num: page.page_num(),
        lines,
    }
}

/// Render every page in index order and build the combined document.
pub fn render_document(pages: &[OcrPage], images: &ImageMap) -> RenderedDocument {
    let mut ordered: Vec<&OcrPage> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);

    let mut combined_lines: Vec<String> = Vec::new();
    let rendered: Vec<RenderedPage> = ordered
        .into_iter()
        .map(|page| {
            let r = render_page(page, images);
            combined_lines.extend(r.lines.iter().cloned());
            combined_lines.push(String::new());
            r
        })
        .collect();

    RenderedDocument {
        pages: rendered,
        combined: combined_lines.join("\n"),
    }
}

/// Render and write `page-<n>.md` for every page, then `all-pages.md`.
///
/// Returns the rendered document and the paths written, in write order.
pub async fn assemble(
    pages: &[OcrPage],
    images: &ImageMap,
    out_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<(RenderedDocument, Vec<PathBuf>), Paper2MdError> {
    let document = render_document(pages, images);
    let total = document.pages.len();
    let mut written = Vec::with_capacity(total + 1);

    for page in &document.pages {
        let path = out_dir.join(page.file_name());
        write_atomic(&path, &page.to_markdown()).await?;
        debug!("Wrote {}", path.display());
        if let Some(cb) = progress {
            cb.on_page_written(page.page_num, total);
        }
        written.push(path);
    }

    let combined_path = out_dir.join(COMBINED_FILE_NAME);
    write_atomic(&combined_path, &document.combined).await?;
    written.push(combined_path);

    info!(
        "Wrote {} page files and {} to {}",
        total,
        COMBINED_FILE_NAME,
        out_dir.display()
    );
    Ok((document, written))
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), Paper2MdError> {
    let tmp_path = path.with_extension("md.tmp");
    let fail = |source: std::io::Error| {
        Paper2MdError::system(
            messages::WRITE_FAILED,
            WriteError {
                path: path.to_path_buf(),
                source,
            },
        )
    };

    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    Ok(())
}
