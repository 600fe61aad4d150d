use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Domain unreachable: {domain} ({attempts} probes failed without a response)")]
    DomainUnreachable { domain: String, attempts: usize },
}

impl From<url::ParseError> for ScanError {
    fn from(err: url::ParseError) -> Self {
        ScanError::InvalidUrl(err.to_string())
    }
}

impl From<quick_xml::Error> for ScanError {
    fn from(err: quick_xml::Error) -> Self {
        ScanError::ParseError(format!("XML parse error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
