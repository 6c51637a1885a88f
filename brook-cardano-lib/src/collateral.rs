use cml_chain::builders::input_builder::{InputBuilderResult, SingleInputBuilder};
use cml_chain::builders::tx_builder::TransactionUnspentOutput;
use derive_more::{From, Into};

/// A pure-ADA UTxO at the operator's key address, pledged as collateral
/// whenever a transaction spends a script input.
#[derive(Clone, Debug, Into, From)]
pub struct Collateral(TransactionUnspentOutput);

impl From<Collateral> for InputBuilderResult {
    fn from(Collateral(utxo): Collateral) -> Self {
        SingleInputBuilder::new(utxo.input, utxo.output)
            .payment_key()
            .expect("collateral must sit at a key address")
    }
}
