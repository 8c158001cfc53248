use thiserror::Error;

/// Any failure from the generation API.
///
/// The chat controller treats every variant the same way; the split only
/// exists so logs say what actually went wrong.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("no API key configured (set GEMINI_API_KEY or press Ctrl+K)")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid accent color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
}
