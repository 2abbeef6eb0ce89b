//! Where the default dataset comes from.
//!
//! Sources only hand back text. Parsing and validation happen in the gateway so that every
//! source fails the same way.

use crate::config::Settings;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const BUNDLED_DATASET: &str = include_str!("../../data/default_views.json");

#[async_trait::async_trait]
pub trait DefaultDatasetSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self) -> Result<String>;
}

/// Dataset compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledDefaults {
    text: Cow<'static, str>,
}

impl BundledDefaults {
    pub fn new() -> Self {
        Self {
            text: Cow::Borrowed(BUNDLED_DATASET),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Cow::Owned(text.into()),
        }
    }
}

impl Default for BundledDefaults {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DefaultDatasetSource for BundledDefaults {
    fn source_name(&self) -> &'static str {
        "bundled"
    }

    async fn fetch(&self) -> Result<String> {
        Ok(self.text.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FileDefaults {
    path: PathBuf,
}

impl FileDefaults {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl DefaultDatasetSource for FileDefaults {
    fn source_name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read default dataset {}", self.path.display()))
    }
}

/// One-shot GET that bypasses HTTP caches. No retries: a failure is reported and the user
/// re-triggers the action.
#[derive(Debug, Clone)]
pub struct HttpDefaults {
    http: reqwest::Client,
    url: String,
}

impl HttpDefaults {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build default dataset http client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers
    }
}

#[async_trait::async_trait]
impl DefaultDatasetSource for HttpDefaults {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self) -> Result<String> {
        let res = self
            .http
            .get(&self.url)
            .headers(Self::headers())
            .send()
            .await
            .context("default dataset request failed")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("default dataset HTTP {status} from {}", self.url);
        }

        res.text()
            .await
            .context("failed to read default dataset response")
    }
}

/// URL beats file path beats the bundled copy.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn DefaultDatasetSource>> {
    if let Some(url) = &settings.default_dataset_url {
        let timeout = settings.fetch_timeout_secs.map(Duration::from_secs);
        return Ok(Arc::new(HttpDefaults::new(url.clone(), timeout)?));
    }
    if let Some(path) = &settings.default_dataset_path {
        return Ok(Arc::new(FileDefaults::new(path.clone())));
    }
    Ok(Arc::new(BundledDefaults::new()))
}
