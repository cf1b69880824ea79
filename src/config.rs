//! Configuration for a conversion run.
//!
//! Two layers:
//!
//! * [`Settings`] — the six required values (OCR API key and object-storage
//!   credentials). Read once at startup from the environment, never
//!   defaulted, and passed explicitly to the stages that need them.
//! * [`ConversionConfig`] — optional tunables with sensible defaults, built
//!   via [`ConversionConfigBuilder`]. Also the injection point for
//!   pre-built OCR/storage backends and a progress callback.

use crate::error::Paper2MdError;
use crate::pipeline::ocr::OcrProvider;
use crate::progress::ProgressCallback;
use crate::storage::ImageStore;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

pub const ENV_OCR_API_KEY: &str = "MISTRAL_OCR_API_KEY";
pub const ENV_STORAGE_ENDPOINT: &str = "S3_ENDPOINT";
pub const ENV_ACCESS_KEY_ID: &str = "S3_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "S3_SECRET_ACCESS_KEY";
pub const ENV_BUCKET: &str = "S3_BUCKET";
pub const ENV_PUBLIC_BASE_URL: &str = "S3_PUBLIC_URL";
/// Optional; see [`ConversionConfig::storage_region`].
pub const ENV_REGION: &str = "S3_REGION";

pub const DEFAULT_OCR_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";
pub const DEFAULT_KEY_PREFIX: &str = "paper";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Lookup function used to read [`Settings`]; `std::env::var` in production.
pub type SettingsLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Required values for OCR and object storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub ocr_api_key: String,
    pub storage_endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub public_base_url: String,
}

impl Settings {
    /// Read all six values from the process environment.
    pub fn from_env() -> Result<Self, Paper2MdError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all six values through `lookup`, failing on the first missing one.
    ///
    /// Values are checked in a fixed order; empty or whitespace-only values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Paper2MdError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| -> Result<String, Paper2MdError> {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => Err(Paper2MdError::validation(format!(
                    "Missing required configuration value: {name}"
                ))),
            }
        };

        Ok(Self {
            ocr_api_key: get(ENV_OCR_API_KEY)?,
            storage_endpoint: get(ENV_STORAGE_ENDPOINT)?,
            access_key_id: get(ENV_ACCESS_KEY_ID)?,
            secret_access_key: get(ENV_SECRET_ACCESS_KEY)?,
            bucket: get(ENV_BUCKET)?,
            public_base_url: get(ENV_PUBLIC_BASE_URL)?,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("ocr_api_key", &"<redacted>")
            .field("storage_endpoint", &self.storage_endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// Tunables for a conversion run.
///
/// # Example
/// ```rust
/// use paper2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .upload_concurrency(4)
///     .key_prefix("papers")
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_concurrency, 4);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Base URL of the OCR API. Default: `https://api.mistral.ai/v1`.
    pub ocr_base_url: String,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub ocr_model: String,

    /// Lifetime of the signed document URL handed to the OCR endpoint, in hours. Default: 24.
    pub signed_url_expiry_hours: u32,

    /// Per-request timeout for OCR HTTP calls, in seconds. Default: 300.
    ///
    /// OCR of a long document is a single synchronous request; the service
    /// can take minutes on a few hundred pages.
    pub request_timeout_secs: u64,

    /// Storage region passed to the S3 client. Default: `S3_REGION` or `us-east-1`.
    ///
    /// Most S3-compatible services (MinIO, R2) ignore it but the SDK requires one.
    pub storage_region: Option<String>,

    /// First segment of every object key. Default: `paper`.
    pub key_prefix: String,

    /// Maximum in-flight uploads. Default: 1 (serial, in encounter order).
    pub upload_concurrency: usize,

    /// Date used in object keys. Default: today's UTC date, fixed at the start of the run.
    pub run_date: Option<NaiveDate>,

    /// Source for [`Settings`]. If None, the process environment is used.
    pub settings_lookup: Option<SettingsLookup>,

    /// Pre-constructed OCR backend. Takes precedence over the Mistral client built from [`Settings`].
    pub ocr_provider: Option<Arc<dyn OcrProvider>>,

    /// Pre-constructed object store. Takes precedence over the S3 client built from [`Settings`].
    pub image_store: Option<Arc<dyn ImageStore>>,

    /// Receives stage and per-item events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ocr_base_url: DEFAULT_OCR_BASE_URL.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            signed_url_expiry_hours: 24,
            request_timeout_secs: 300,
            storage_region: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            upload_concurrency: 1,
            run_date: None,
            settings_lookup: None,
            ocr_provider: None,
            image_store: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("ocr_base_url", &self.ocr_base_url)
            .field("ocr_model", &self.ocr_model)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("storage_region", &self.storage_region)
            .field("key_prefix", &self.key_prefix)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("run_date", &self.run_date)
            .field("settings_lookup", &self.settings_lookup.as_ref().map(|_| "<fn>"))
            .field("ocr_provider", &self.ocr_provider.as_ref().map(|_| "<dyn OcrProvider>"))
            .field("image_store", &self.image_store.as_ref().map(|_| "<dyn ImageStore>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load [`Settings`] through the configured lookup, or the environment.
    pub fn load_settings(&self) -> Result<Settings, Paper2MdError> {
        match self.settings_lookup {
            Some(ref lookup) => Settings::from_lookup(|name| lookup(name)),
            None => Settings::from_env(),
        }
    }

    /// Region for the S3 client: explicit setting, then `S3_REGION`, then `us-east-1`.
    pub fn resolved_region(&self) -> String {
        if let Some(ref region) = self.storage_region {
            return region.clone();
        }
        let from_lookup = match self.settings_lookup {
            Some(ref lookup) => lookup(ENV_REGION),
            None => std::env::var(ENV_REGION).ok(),
        };
        from_lookup
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn storage_region(mut self, region: impl Into<String>) -> Self {
        self.config.storage_region = Some(region.into());
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn upload_concurrency(mut self, n: usize) -> Self {
        self.config.upload_concurrency = n;
        self
    }

    pub fn run_date(mut self, date: NaiveDate) -> Self {
        self.config.run_date = Some(date);
        self
    }

    pub fn settings_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.config.settings_lookup = Some(Arc::new(lookup));
        self
    }

    pub fn ocr_provider(mut self, provider: Arc<dyn OcrProvider>) -> Self {
        self.config.ocr_provider = Some(provider);
        self
    }

    pub fn image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.config.image_store = Some(store);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Paper2MdError> {
        let c = &self.config;
        if c.ocr_model.trim().is_empty() {
            return Err(Paper2MdError::validation("OCR model must not be empty"));
        }
        if c.ocr_base_url.trim().is_empty() {
            return Err(Paper2MdError::validation("OCR base URL must not be empty"));
        }
        let prefix = c.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(Paper2MdError::validation("Key prefix must not be empty"));
        }
        if c.upload_concurrency == 0 {
            return Err(Paper2MdError::validation("Upload concurrency must be ≥ 1"));
        }
        if c.signed_url_expiry_hours == 0 {
            return Err(Paper2MdError::validation(
                "Signed URL expiry must be at least 1 hour",
            ));
        }
        let prefix = prefix.to_string();
        let mut config = self.config;
        config.key_prefix = prefix;
        Ok(config)
    }
}
