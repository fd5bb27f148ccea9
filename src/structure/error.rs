use thiserror::Error;

/// Failures that abort a single document. Everything else the extractor meets
/// is recovered in place and reported as a warning in [`super::ExtractStats`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document {doc_id}: no document tree was produced")]
    MissingTree { doc_id: String },

    #[error("document {doc_id}: document tree violates the block contract")]
    InvalidTree {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document {doc_id}: malformed markup at byte {position}: {message}")]
    Markup {
        doc_id: String,
        position: u64,
        message: String,
    },
}

impl ExtractError {
    pub fn doc_id(&self) -> &str {
        match self {
            Self::MissingTree { doc_id }
            | Self::InvalidTree { doc_id, .. }
            | Self::Markup { doc_id, .. } => doc_id,
        }
    }
}
