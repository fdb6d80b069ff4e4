// Error type shared by every generation stage.
//
// The rhythm chain, the pitch selectors and the phrase assembler all report
// failures through `GenerationError`. Configuration problems are caught
// before any sampling starts; chain failures abort the run in progress and
// no partial phrase is handed back.

use crate::duration::DurationSymbol;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The walk reached a duration symbol that has no row in the table.
    #[error("duration symbol {0} has no entry in the transition table")]
    UnknownState(DurationSymbol),

    /// Every outgoing weight from this state is zero.
    #[error("duration symbol {0} has no outgoing transition with positive weight")]
    EmptyDistribution(DurationSymbol),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GenerationError::InvalidConfiguration(msg.into())
    }
}
