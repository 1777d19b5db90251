use thiserror::Error;

/// Failure taxonomy for the fetch-and-extract pipeline.
///
/// Transport problems are retried inside [`crate::fetch`] up to the attempt
/// budget; anything that reaches a caller as this type is terminal for that
/// operation. Field-level parse problems never surface here at all, they
/// collapse to `None` on the affected field.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be retrieved (network error, non-success
    /// status, bot challenge) within the attempt budget.
    #[error("kunde inte hämta sidan efter {attempts} försök: {reason}")]
    Transport { attempts: u32, reason: String },

    /// The document was retrieved but no fallback strategy produced records.
    #[error("{0}")]
    ExtractionEmpty(String),

    /// A stats operation referenced a match number the coupon does not hold.
    #[error("hittar ingen match med nummer {0} i kupongen")]
    MatchNotFound(u8),
}

impl PipelineError {
    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Transport { .. })
    }
}
