//! OCR stage: turn the source PDF into ordered [`OcrPage`]s.
//!
//! The Mistral flow takes three requests:
//!
//! ```text
//! POST /files            (multipart, purpose=ocr)   → file id
//! GET  /files/{id}/url   (?expiry=<hours>)          → signed URL
//! POST /ocr              (document_url, inline b64) → pages
//! ```
//!
//! Whatever goes wrong (unreadable file, network error, non-2xx status,
//! unexpected JSON) the stage reports a single "OCR processing failed"
//! system error. The specific [`OcrError`] is kept as its cause. Nothing is
//! retried.

use crate::config::ConversionConfig;
use crate::document::{BoundingBox, EmbeddedImage, OcrPage, PageDimensions, SourceDocument};
use crate::error::{messages, Paper2MdError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// One request in the OCR flow, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStep {
    Upload,
    SignedUrl,
    Process,
}

impl fmt::Display for OcrStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OcrStep::Upload => "file upload",
            OcrStep::SignedUrl => "signed URL request",
            OcrStep::Process => "OCR request",
        })
    }
}

/// Detailed cause behind an "OCR processing failed" error.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{step} failed: {source}")]
    Request {
        step: OcrStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} returned HTTP {status}: {body}")]
    Status {
        step: OcrStep,
        status: u16,
        body: String,
    },

    #[error("{step} returned an unexpected response: {detail}")]
    Malformed { step: OcrStep, detail: String },
}

/// A backend that can OCR a whole document.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Return the document's pages in page order, with inline image payloads.
    async fn process(&self, document: SourceDocument) -> Result<Vec<OcrPage>, OcrError>;
}

/// Read `path` and OCR it through `provider`.
///
/// Pages are returned sorted by index regardless of the order the service
/// listed them in.
pub async fn run_ocr(
    provider: &dyn OcrProvider,
    path: &Path,
) -> Result<Vec<OcrPage>, Paper2MdError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        Paper2MdError::system(
            messages::OCR_FAILED,
            OcrError::Read {
                path: path.to_path_buf(),
                source,
            },
        )
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    let document = SourceDocument::new(name, bytes);
    info!("Submitting '{}' ({} bytes) for OCR", document.name, document.len());

    let mut pages = provider
        .process(document)
        .await
        .map_err(|e| Paper2MdError::system(messages::OCR_FAILED, e))?;

    pages.sort_by_key(|p| p.index);
    Ok(pages)
}

/// [`OcrProvider`] for the Mistral OCR API.
pub struct MistralOcrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    expiry_hours: u32,
}

impl fmt::Debug for MistralOcrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralOcrClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("expiry_hours", &self.expiry_hours)
            .finish()
    }
}

impl MistralOcrClient {
    pub fn new(api_key: impl Into<String>, config: &ConversionConfig) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(OcrError::Client)?;

        Ok(Self {
            http,
            base_url: config.ocr_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.ocr_model.clone(),
            expiry_hours: config.signed_url_expiry_hours,
        })
    }

    async fn upload(&self, document: SourceDocument) -> Result<String, OcrError> {
        let step = OcrStep::Upload;
        let part = Part::bytes(document.bytes)
            .file_name(document.name)
            .mime_str("application/pdf")
            .map_err(|source| OcrError::Request { step, source })?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|source| OcrError::Request { step, source })?;

        let uploaded: UploadedFile = read_json(step, response).await?;
        debug!("Uploaded document as file {}", uploaded.id);
        Ok(uploaded.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, OcrError> {
        let step = OcrStep::SignedUrl;
        let response = self
            .http
            .get(format!("{}/files/{}/url", self.base_url, file_id))
            .query(&[("expiry", self.expiry_hours)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|source| OcrError::Request { step, source })?;

        let signed: SignedUrl = read_json(step, response).await?;
        debug!("Signed URL valid for {}h", self.expiry_hours);
        Ok(signed.url)
    }

    async fn ocr(&self, document_url: &str) -> Result<OcrResponse, OcrError> {
        let step = OcrStep::Process;
        let request = OcrRequest {
            model: &self.model,
            document: DocumentRef::DocumentUrl { document_url },
            include_image_base64: true,
        };

        let response = self
            .http
            .post(format!("{}/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| OcrError::Request { step, source })?;

        read_json(step, response).await
    }
}

#[async_trait]
impl OcrProvider for MistralOcrClient {
    async fn process(&self, document: SourceDocument) -> Result<Vec<OcrPage>, OcrError> {
        let file_id = self.upload(document).await?;
        let url = self.signed_url(&file_id).await?;
        let response = self.ocr(&url).await?;

        if let Some(ref usage) = response.usage_info {
            info!(
                "OCR processed {} pages ({} bytes) with {}",
                usage.pages_processed.unwrap_or(response.pages.len() as u64),
                usage.doc_size_bytes.unwrap_or(0),
                self.model
            );
        }

        Ok(response.pages.into_iter().map(OcrPage::from).collect())
    }
}

/// Check status, then decode the body as JSON.
async fn read_json<T: DeserializeOwned>(
    step: OcrStep,
    response: reqwest::Response,
) -> Result<T, OcrError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| OcrError::Request { step, source })?;

    if !status.is_success() {
        return Err(OcrError::Status {
            step,
            status: status.as_u16(),
            body: truncate(&body, 500),
        });
    }

    serde_json::from_str(&body).map_err(|e| OcrError::Malformed {
        step,
        detail: e.to_string(),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}\u{2026}")
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentRef<'a>,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DocumentRef<'a> {
    DocumentUrl { document_url: &'a str },
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    pages: Vec<WirePage>,
    #[serde(default)]
    usage_info: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    pages_processed: Option<u64>,
    doc_size_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    index: usize,
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    images: Vec<WireImage>,
    #[serde(default)]
    dimensions: Option<PageDimensions>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    id: String,
    top_left_x: Option<f64>,
    top_left_y: Option<f64>,
    bottom_right_x: Option<f64>,
    bottom_right_y: Option<f64>,
    #[serde(default)]
    image_base64: Option<String>,
}

impl From<WirePage> for OcrPage {
    fn from(page: WirePage) -> Self {
        OcrPage {
            index: page.index,
            markdown: page.markdown,
            images: page.images.into_iter().map(EmbeddedImage::from).collect(),
            dimensions: page.dimensions,
        }
    }
}

impl From<WireImage> for EmbeddedImage {
    fn from(image: WireImage) -> Self {
        let bbox = match (
            image.top_left_x,
            image.top_left_y,
            image.bottom_right_x,
            image.bottom_right_y,
        ) {
            (Some(tlx), Some(tly), Some(brx), Some(bry)) => Some(BoundingBox {
                top_left_x: tlx.round() as i64,
                top_left_y: tly.round() as i64,
                bottom_right_x: brx.round() as i64,
                bottom_right_y: bry.round() as i64,
            }),
            _ => None,
        };

        EmbeddedImage {
            id: image.id,
            image_base64: image.image_base64,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::error::Error as _;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_response() -> serde_json::Value {
        json!({
            "pages": [
                {
                    "index": 1,
                    "markdown": "Second page",
                    "images": [],
                    "dimensions": { "dpi": 200, "height": 2200, "width": 1700 }
                },
                {
                    "index": 0,
                    "markdown": "# Title\n\n![img-0.jpeg](img-0.jpeg)",
                    "images": [{
                        "id": "img-0.jpeg",
                        "top_left_x": 100, "top_left_y": 200,
                        "bottom_right_x": 500, "bottom_right_y": 600,
                        "image_base64": "data:image/jpeg;base64,AAAA"
                    }],
                    "dimensions": { "dpi": 200, "height": 2200, "width": 1700 }
                }
            ],
            "model": "mistral-ocr-2505",
            "usage_info": { "pages_processed": 2, "doc_size_bytes": 1234 }
        })
    }

    #[test]
    fn wire_page_converts_to_domain() {
        let response: OcrResponse = serde_json::from_value(sample_response()).unwrap();
        let pages: Vec<OcrPage> = response.pages.into_iter().map(OcrPage::from).collect();
        let first = &pages[1];
        assert_eq!(first.index, 0);
        assert_eq!(first.images.len(), 1);
        let img = &first.images[0];
        assert_eq!(img.id, "img-0.jpeg");
        assert_eq!(img.image_base64.as_deref(), Some("data:image/jpeg;base64,AAAA"));
        assert_eq!(img.bbox.unwrap().width(), 400);
        assert_eq!(first.dimensions.unwrap().dpi, 200);
    }

    #[test]
    fn image_without_payload_or_coordinates() {
        let wire: WireImage = serde_json::from_value(json!({
            "id": "img-9.png",
            "top_left_x": null, "top_left_y": null,
            "bottom_right_x": null, "bottom_right_y": null,
            "image_base64": null
        }))
        .unwrap();
        let img = EmbeddedImage::from(wire);
        assert!(img.bbox.is_none());
        assert!(!img.has_inline_bytes());
    }

    #[test]
    fn request_body_shape() {
        let request = OcrRequest {
            model: "mistral-ocr-latest",
            document: DocumentRef::DocumentUrl {
                document_url: "https://signed.example/doc",
            },
            include_image_base64: true,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(
            v,
            json!({
                "model": "mistral-ocr-latest",
                "document": { "type": "document_url", "document_url": "https://signed.example/doc" },
                "include_image_base64": true
            })
        );
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        let t = truncate(&"x".repeat(20), 5);
        assert_eq!(t, "xxxxx\u{2026}");
    }

    fn client_for(server: &MockServer) -> MistralOcrClient {
        let config = ConversionConfig::builder()
            .ocr_base_url(format!("{}/v1/", server.uri()))
            .build()
            .unwrap();
        MistralOcrClient::new("test-key", &config).unwrap()
    }

    async fn mount_upload_and_url(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "file-123", "object": "file", "purpose": "ocr", "filename": "paper.pdf"
            })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/files/file-123/url"))
            .and(query_param("expiry", "24"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "https://signed.example/doc" })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn mistral_flow_returns_pages() {
        let server = MockServer::start().await;
        mount_upload_and_url(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .and(body_partial_json(json!({
                "model": "mistral-ocr-latest",
                "document": { "type": "document_url", "document_url": "https://signed.example/doc" },
                "include_image_base64": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pages = client
            .process(SourceDocument::new("paper.pdf", b"%PDF-1.7".to_vec()))
            .await
            .expect("OCR should succeed");
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn service_error_is_reported_with_step() {
        let server = MockServer::start().await;
        mount_upload_and_url(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .process(SourceDocument::new("paper.pdf", b"%PDF".to_vec()))
            .await
            .unwrap_err();
        match err {
            OcrError::Status { step, status, ref body } => {
                assert_eq!(step, OcrStep::Process);
                assert_eq!(status, 500);
                assert!(body.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_upload_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .process(SourceDocument::new("paper.pdf", b"%PDF".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OcrError::Malformed {
                step: OcrStep::Upload,
                ..
            }
        ));
    }

    struct FixedPages(Mutex<Option<Vec<OcrPage>>>);

    #[async_trait]
    impl OcrProvider for FixedPages {
        async fn process(&self, _document: SourceDocument) -> Result<Vec<OcrPage>, OcrError> {
            Ok(self.0.lock().unwrap().take().unwrap_or_default())
        }
    }

    fn page(index: usize) -> OcrPage {
        OcrPage {
            index,
            markdown: format!("page {index}"),
            images: vec![],
            dimensions: None,
        }
    }

    #[tokio::test]
    async fn run_ocr_sorts_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();

        let provider = FixedPages(Mutex::new(Some(vec![page(2), page(0), page(1)])));
        let pages = run_ocr(&provider, &pdf).await.unwrap();
        let indices: Vec<usize> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn unreadable_file_is_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FixedPages(Mutex::new(None));
        let err = run_ocr(&provider, &dir.path().join("gone.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::System);
        assert_eq!(err.to_string(), "OCR processing failed");
        let cause = err.source().expect("cause chained");
        assert!(cause.to_string().contains("gone.pdf"));
    }
}
