use cml_crypto::TransactionHash;

use brook_explorer::NetworkError;

use crate::deployment::ValidatorRole;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),
    #[error("stale pool state: got {actual}, expected at least {expected}")]
    StaleState { actual: u64, expected: u64 },
    #[error("no reference script registered for {0:?}")]
    ReferenceNotFound(ValidatorRole),
    #[error("ledger rejected transaction: {0}")]
    LedgerRejected(String),
    #[error("transaction {0} not confirmed in time")]
    Timeout(TransactionHash),
    #[error("network failure: {0}")]
    Network(String),
}

impl EngineError {
    /// Whether a retry against refreshed chain state can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StaleState { .. } | EngineError::LedgerRejected(_) | EngineError::Network(_)
        )
    }
}

impl From<NetworkError> for EngineError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Client(e) => EngineError::Network(e),
            NetworkError::Rejected(e) => EngineError::LedgerRejected(e),
            NetworkError::ConfirmationTimeout(tx) => EngineError::Timeout(tx),
        }
    }
}
