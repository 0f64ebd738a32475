// Error taxonomy for graph building, persistence and analysis.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Reuse-mode resolution was requested against an empty card mapping.
    #[error("card mapping is empty; fit it on the training records before building an eval graph")]
    EmptyMapping,

    /// Encoding was requested before any category levels were fitted.
    #[error("feature encoder has no fitted category levels")]
    UnfittedEncoder,

    #[error("{what} has {actual} rows, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{relation} edge ({src}, {dst}) is out of bounds for {src_count} x {dst_count} nodes")]
    EdgeOutOfBounds {
        relation: &'static str,
        src: usize,
        dst: usize,
        src_count: usize,
        dst_count: usize,
    },

    #[error("reverse edges are not the element-wise swap of forward edges")]
    AsymmetricEdges,

    #[error("card identifier {0:?} appears more than once in mapping")]
    DuplicateEntity(String),

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("artifact version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl GraphError {
    /// Configuration errors abort the pipeline; everything else is reported per call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GraphError::EmptyMapping | GraphError::UnfittedEncoder | GraphError::Config(_)
        )
    }
}
