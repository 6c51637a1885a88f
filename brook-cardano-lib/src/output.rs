use cml_chain::transaction::TransactionOutput;

use crate::OutputRef;

/// A transaction output pinned to its on-chain location.
#[derive(Debug, Clone)]
pub struct FinalizedTxOut(pub TransactionOutput, pub OutputRef);

impl FinalizedTxOut {
    pub fn reference(&self) -> OutputRef {
        self.1
    }
}
