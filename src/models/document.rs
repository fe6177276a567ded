use std::fmt;

/// Bytes of a fetched or uploaded page, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    /// Charset declared by the transport (HTTP `Content-Type`), if any.
    pub charset: Option<String>,
    pub origin: DocumentOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOrigin {
    Url(String),
    File(String),
    Inline,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, origin: DocumentOrigin) -> Self {
        Self {
            bytes: bytes.into(),
            charset: None,
            origin,
        }
    }

    pub fn with_charset(mut self, charset: Option<String>) -> Self {
        self.charset = charset;
        self
    }

    /// Convenience for tests and tooling that already hold text.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec(), DocumentOrigin::Inline)
    }
}

impl fmt::Display for DocumentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentOrigin::Url(url) => write!(f, "{}", url),
            DocumentOrigin::File(path) => write!(f, "{}", path),
            DocumentOrigin::Inline => write!(f, "<inline>"),
        }
    }
}
