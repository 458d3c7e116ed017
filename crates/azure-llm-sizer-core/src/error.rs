#[derive(Debug, thiserror::Error)]
pub enum SizerError {
    #[error("unknown precision '{0}' (expected one of fp32, fp16, bf16, int8, int4)")]
    UnknownPrecision(String),

    #[error("invalid context length '{0}' (expected e.g. 4096 or 128k)")]
    InvalidContext(String),

    #[error("unknown sort option '{0}' (expected size_desc, size_asc or name)")]
    UnknownSort(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid catalog entry {entry}: {reason}")]
    InvalidCatalog { entry: String, reason: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, SizerError>;
