use thiserror::Error;

use crate::providers::ProviderError;

/// Fatal errors for one `send_message` call. Tool failures never end up
/// here; they are folded into the transcript instead.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Model call failed: {0}")]
    Model(#[from] ProviderError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
