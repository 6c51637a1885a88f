use std::time::Duration;

use cml_chain::address::Address;
use cml_chain::builders::tx_builder::TransactionUnspentOutput;
use cml_crypto::{RawBytesEncoding, TransactionHash};
use serde::de::DeserializeOwned;

use brook_cardano_lib::{OutputRef, Token};

use crate::constants::{CONFIRMATION_POLL_DELAY_SECS, MAX_CONFIRMATION_POLLS};
use crate::data::{ExplorerConfig, FullTxOut, Items};
use crate::{CardanoNetwork, NetworkError};

#[derive(Clone)]
pub struct Explorer {
    config: ExplorerConfig,
    client: reqwest::Client,
}

impl Explorer {
    pub fn new(config: ExplorerConfig) -> Self {
        Explorer {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn get_request<T: DeserializeOwned>(&self, url: String) -> Option<T> {
        self.client
            .get(url)
            .send()
            .await
            .ok()?
            .json::<T>()
            .await
            .ok()
    }
}

impl CardanoNetwork for Explorer {
    async fn utxo_by_ref(&self, oref: OutputRef) -> Option<TransactionUnspentOutput> {
        let request_url = format!(
            "{}/cardano/{}/v1/outputs/{}:{}",
            self.config.url,
            self.config.network,
            oref.tx_hash().to_hex(),
            oref.index()
        );
        let utxo = self.get_request::<FullTxOut>(request_url).await?;
        utxo.try_into().ok()
    }

    async fn utxo_by_asset(&self, token: Token) -> Option<TransactionUnspentOutput> {
        let Token(policy, name) = token;
        let request_url = format!(
            "{}/cardano/{}/v1/outputs/unspent/byAsset/{}{}?offset=0&limit=1",
            self.config.url,
            self.config.network,
            policy.to_hex(),
            hex::encode(name.bytes())
        );
        let utxo = self
            .get_request::<Items<FullTxOut>>(request_url)
            .await?
            .get_items()
            .into_iter()
            .next()?;
        utxo.try_into().ok()
    }

    // explorer indexes unspent outputs by payment cred, not by full address
    async fn utxos_by_address(
        &self,
        address: Address,
        offset: u32,
        limit: u16,
    ) -> Vec<TransactionUnspentOutput> {
        let payment_cred = match address.payment_cred() {
            Some(cml_chain::certs::StakeCredential::PubKey { hash, .. }) => hash.to_hex(),
            Some(cml_chain::certs::StakeCredential::Script { hash, .. }) => hash.to_hex(),
            None => return vec![],
        };
        let request_url = format!(
            "{}/cardano/{}/v1/outputs/unspent/byPaymentCred/{}/?offset={}&limit={}",
            self.config.url, self.config.network, payment_cred, offset, limit
        );
        self.get_request::<Items<FullTxOut>>(request_url)
            .await
            .map_or(Vec::new(), |items| items.get_items())
            .into_iter()
            .filter_map(|utxo| utxo.try_into().ok())
            .collect()
    }

    async fn submit_tx(&self, cbor: &[u8]) -> Result<(), NetworkError> {
        let request_url = format!(
            "{}/cardano/{}/v1/transactions/submit",
            self.config.url, self.config.network
        );
        let response = self
            .client
            .post(request_url)
            .header("Content-Type", "application/cbor")
            .body(cbor.to_vec())
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let details = response.text().await.unwrap_or_default();
            Err(NetworkError::Rejected(details))
        }
    }

    async fn chain_tip_slot_number(&self) -> Result<u64, NetworkError> {
        let request_url = format!(
            "{}/cardano/{}/v1/networkParams/slotNumber",
            self.config.url, self.config.network
        );
        self.get_request::<u64>(request_url)
            .await
            .ok_or_else(|| NetworkError::Client("failed to fetch chain tip".to_string()))
    }

    async fn wait_for_transaction_confirmation(
        &self,
        tx_hash: TransactionHash,
    ) -> Result<(), NetworkError> {
        for _ in 0..MAX_CONFIRMATION_POLLS {
            if self
                .utxo_by_ref(OutputRef::new(tx_hash, 0))
                .await
                .is_some()
            {
                return Ok(());
            }
            log::info!("waiting for confirmation of {}", tx_hash.to_hex());
            tokio::time::sleep(Duration::from_secs(CONFIRMATION_POLL_DELAY_SECS)).await;
        }
        Err(NetworkError::ConfirmationTimeout(tx_hash))
    }
}
