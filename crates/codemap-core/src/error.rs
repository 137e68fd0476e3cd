use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodemapError>;

/// Every way a lifecycle, search, or backend operation can fail.
///
/// The first three variants are raised locally before anything reaches the
/// backend. The last three wrap backend or network failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodemapError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no active project")]
    NoProject,

    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("import failed: {0}")]
    Import(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("clear failed: {0}")]
    Clear(String),
}
