use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ExtractError {
    /// A hint the user can act on.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            ExtractError::Input(InputError::UnsupportedDomain { .. }) => {
                Some("Check that the URL points at a supported store, or upload the saved page instead.")
            }
            ExtractError::Input(InputError::UnsupportedFile { .. }) => {
                Some("Save the page from the browser as .html and pass that file.")
            }
            ExtractError::Input(_) => Some("Pass an http(s) URL or the path of a saved .html file."),
            ExtractError::Fetch(FetchError::Blocked { .. }) => Some(
                "The store refused the request (likely bot protection). Open the page in a browser, \
                 save it as .html and pass the file instead.",
            ),
            ExtractError::Fetch(_) => {
                Some("Try again later, or save the page from a browser and pass the .html file.")
            }
            ExtractError::Decode(_) => Some("Re-save the page with UTF-8 encoding."),
            ExtractError::Parse(_) => Some("Re-save the page after it has fully loaded."),
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no URL or file given")]
    Empty,

    #[error("\"{input}\" is neither an http(s) URL nor an .html/.htm file")]
    UnsupportedScheme { input: String },

    #[error("invalid URL \"{url}\": {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL \"{url}\" does not belong to a supported site ({expected})")]
    UnsupportedDomain { url: String, expected: String },

    #[error("\"{path}\" is not an .html or .htm file")]
    UnsupportedFile { path: String },

    #[error("failed to read \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request blocked by {url} (HTTP 403)")]
    Blocked { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transport failures, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Connect { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Request { source, .. } => source.is_request() || source.is_body(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("page bytes are neither valid UTF-8, {declared} nor Latin-1")]
    Undecodable { declared: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("the document is empty")]
    EmptyDocument,

    #[error("the document contains no HTML markup")]
    NoMarkup,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write \"{path}\": {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
