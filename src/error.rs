use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while producing the digest.
///
/// Fetch and parse errors are per-feed and never abort a run; only
/// [`Error::Io`] from the writer is fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection-level failure (DNS, refused, TLS, broken body)
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// No response within the configured deadline
    #[error("Request timed out")]
    Timeout,
    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),
    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),
    #[error("HTTP error: status {0}")]
    Status(u16),
    /// Feed body is not well-formed XML
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
