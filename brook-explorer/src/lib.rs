use cml_chain::address::Address;
use cml_chain::builders::tx_builder::TransactionUnspentOutput;
use cml_crypto::TransactionHash;

use brook_cardano_lib::{NetworkId, OutputRef, Token};

pub mod client;
pub mod constants;
pub mod data;

use crate::constants::{MAINNET_PREFIX, PREPROD_PREFIX};
use crate::Network::{Mainnet, Preprod};

#[derive(serde::Deserialize, Copy, Clone)]
pub enum Network {
    Preprod,
    Mainnet,
}

impl From<NetworkId> for Network {
    fn from(value: NetworkId) -> Self {
        match <u8>::from(value) {
            0 => Preprod,
            _ => Mainnet,
        }
    }
}

impl From<Network> for String {
    fn from(value: Network) -> Self {
        match value {
            Preprod => PREPROD_PREFIX.to_string(),
            Mainnet => MAINNET_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network client failure: {0}")]
    Client(String),
    #[error("node rejected request: {0}")]
    Rejected(String),
    #[error("transaction {0} not confirmed in time")]
    ConfirmationTimeout(TransactionHash),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::Client(err.to_string())
    }
}

pub trait CardanoNetwork {
    async fn utxo_by_ref(&self, oref: OutputRef) -> Option<TransactionUnspentOutput>;
    /// Finds the unspent output currently holding the given token.
    async fn utxo_by_asset(&self, token: Token) -> Option<TransactionUnspentOutput>;
    async fn utxos_by_address(
        &self,
        address: Address,
        offset: u32,
        limit: u16,
    ) -> Vec<TransactionUnspentOutput>;
    async fn submit_tx(&self, cbor: &[u8]) -> Result<(), NetworkError>;
    async fn chain_tip_slot_number(&self) -> Result<u64, NetworkError>;
    /// Polls the network until the first output of the given transaction appears on-chain.
    async fn wait_for_transaction_confirmation(
        &self,
        tx_hash: TransactionHash,
    ) -> Result<(), NetworkError>;
}
