use thiserror::Error;

/// Custom error types for the options-chain library
#[derive(Error, Debug)]
pub enum OptionsError {
    /// The price service answered with a non-2xx status; carries its `detail` text.
    #[error("{0}")]
    NotFound(String),

    /// Transport failure or timeout talking to the price service.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A transition was requested that the current selection state cannot honor.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Pricing inputs the service would reject.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

impl OptionsError {
    /// Text shown next to the field whose request failed.
    ///
    /// Service messages are passed through verbatim, transport failures are
    /// collapsed into a generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            OptionsError::NotFound(detail) => detail.clone(),
            OptionsError::Network(_) => {
                "Could not reach the price service. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OptionsError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, OptionsError>;
