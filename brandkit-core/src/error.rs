use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrandError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Compositing error: {0}")]
    Compositing(String),

    #[error("Placement advisor error: {0}")]
    Advisor(String),

    #[error("Image generation error: {0}")]
    Generation(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BrandError>;
