use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("browser driver error: {0}")]
    Driver(String),
    #[error("login requires an account identifier and password")]
    MissingCredentials,
}

impl ExtractorError {
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    pub fn driver(reason: impl std::fmt::Display) -> Self {
        Self::Driver(reason.to_string())
    }
}

impl From<quick_xml::Error> for ExtractorError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(format!("malformed xml: {err}"))
    }
}

impl From<chromiumoxide::error::CdpError> for ExtractorError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::driver(err)
    }
}
