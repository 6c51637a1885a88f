use cml_chain::address::{Address, EnterpriseAddress};
use cml_chain::certs::Credential;
use cml_crypto::{Bip32PrivateKey, Ed25519KeyHash, PrivateKey};
use derive_more::{From, Into};

use brook_cardano_lib::NetworkId;

#[derive(Debug, Clone, Into, From)]
pub struct OperatorRewardAddress(pub Address);

impl OperatorRewardAddress {
    pub fn address(self) -> Address {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Into, From)]
pub struct OperatorCred(pub Ed25519KeyHash);

impl From<OperatorCred> for Credential {
    fn from(value: OperatorCred) -> Self {
        Credential::new_pub_key(value.0)
    }
}

pub fn operator_creds(operator_sk_raw: &str, network_id: NetworkId) -> (PrivateKey, Address, OperatorCred) {
    let operator_prv_bip32 = Bip32PrivateKey::from_bech32(operator_sk_raw).expect("wallet error");
    let operator_prv = operator_prv_bip32.to_raw_key();
    let operator_pkh = operator_prv.to_public().hash();
    let main_address = Address::Enterprise(EnterpriseAddress::new(
        network_id.into(),
        Credential::new_pub_key(operator_pkh),
    ));
    (operator_prv, main_address, operator_pkh.into())
}
