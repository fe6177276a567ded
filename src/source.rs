//! Where the page comes from: a saved file or a live URL.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::error::{ExtractError, FetchError, InputError};
use crate::models::{DocumentOrigin, RawDocument, Site};
use crate::utils::decode::charset_from_content_type;
use crate::utils::http::{fetch_with_retry, RetryPolicy};

const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Url(Url),
    File(PathBuf),
}

impl Input {
    pub fn site(&self) -> Site {
        match self {
            Input::Url(url) => Site::detect(url.as_str()),
            Input::File(path) => Site::detect(&path.to_string_lossy()),
        }
    }
}

/// Validates user input: URLs by scheme prefix and configured domain
/// substring, files by `.html`/`.htm` extension.
pub fn classify_input(raw: &str, config: &Config) -> Result<Input, InputError> {
    let raw = raw.trim().trim_matches('"');
    if raw.is_empty() {
        return Err(InputError::Empty);
    }

    let lower = raw.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = Url::parse(raw).map_err(|source| InputError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        let host = url.host_str().unwrap_or_default().to_lowercase();
        let supported = config.sites.is_empty()
            || config
                .sites
                .values()
                .any(|site| host.contains(&site.domain.to_lowercase()));
        if !supported {
            return Err(InputError::UnsupportedDomain {
                url: raw.to_string(),
                expected: config.supported_domains(),
            });
        }
        return Ok(Input::Url(url));
    }

    if lower.contains("://") {
        return Err(InputError::UnsupportedScheme {
            input: raw.to_string(),
        });
    }

    let path = PathBuf::from(raw);
    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HTML_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
    if !is_html {
        return Err(InputError::UnsupportedFile {
            path: raw.to_string(),
        });
    }
    Ok(Input::File(path))
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<RawDocument, ExtractError>;
    fn describe(&self) -> String;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load(&self) -> Result<RawDocument, ExtractError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| InputError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
        info!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(RawDocument::new(
            bytes,
            DocumentOrigin::File(self.path.display().to_string()),
        ))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

pub struct UrlSource {
    client: Client,
    url: Url,
    policy: RetryPolicy,
}

impl UrlSource {
    pub fn new(client: Client, url: Url, policy: RetryPolicy) -> Self {
        Self { client, url, policy }
    }
}

#[async_trait]
impl DocumentSource for UrlSource {
    async fn load(&self) -> Result<RawDocument, ExtractError> {
        let url = self.url.as_str();
        let response = fetch_with_retry(&self.client, url, self.policy).await?;

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type);

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        info!("Fetched {} bytes from {}", bytes.len(), url);

        Ok(RawDocument::new(bytes.to_vec(), DocumentOrigin::Url(url.to_string())).with_charset(charset))
    }

    fn describe(&self) -> String {
        format!("URL {}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_urls() {
        let config = Config::default();
        let input = classify_input("https://www.sephora.com.tr/makyaj-c302", &config).unwrap();
        assert!(matches!(input, Input::Url(_)));
        assert_eq!(input.site(), Site::Sephora);

        let input = classify_input(" https://www.levelshoes.com/women/shoes ", &config).unwrap();
        assert_eq!(input.site(), Site::LevelShoes);
    }

    #[test]
    fn rejects_other_domains_and_schemes() {
        let config = Config::default();
        assert!(matches!(
            classify_input("https://example.com/shoes", &config),
            Err(InputError::UnsupportedDomain { .. })
        ));
        assert!(matches!(
            classify_input("ftp://www.sephora.com/x.html", &config),
            Err(InputError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn accepts_html_files_only() {
        let config = Config::default();
        assert_eq!(
            classify_input("Makeup Essentials ≡ Sephora.HTML", &config).unwrap(),
            Input::File(PathBuf::from("Makeup Essentials ≡ Sephora.HTML"))
        );
        assert!(matches!(
            classify_input("brands.csv", &config),
            Err(InputError::UnsupportedFile { .. })
        ));
        assert!(matches!(classify_input("  ", &config), Err(InputError::Empty)));
    }

    #[tokio::test]
    async fn file_source_reads_bytes() {
        let path = std::env::temp_dir().join(format!("facet_source_test_{}.html", std::process::id()));
        tokio::fs::write(&path, b"<html></html>").await.unwrap();

        let document = FileSource::new(&path).load().await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(document.bytes, b"<html></html>");
        assert!(matches!(document.origin, DocumentOrigin::File(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_input_error() {
        let result = FileSource::new("/nonexistent/page.html").load().await;
        assert!(matches!(result, Err(ExtractError::Input(InputError::Read { .. }))));
    }
}
