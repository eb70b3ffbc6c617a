use thiserror::Error;

/// Rejected buffer splice. The buffer is left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("range {start}..{end} is outside buffer of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("offset {offset} is not on a char boundary")]
    NotCharBoundary { offset: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("no file was selected")]
    NoFile,

    #[error("failed to read file: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("editor config must list at least one model")]
    NoModels,
}
