use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Can't read file: {0}")]
    FileReadError(String),

    #[error("Error parsing GFF line {line}: {reason}")]
    FeatureParseError { line: String, reason: String },

    #[error("Invalid feature coordinates {start}-{end}: expected 1 <= start <= end")]
    InvalidInterval { start: u32, end: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
