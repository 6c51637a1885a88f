use cml_chain::address::{Address, BaseAddress, EnterpriseAddress};
use cml_chain::assets::MultiAsset;
use cml_chain::certs::Credential;
use cml_chain::transaction::TransactionOutput;
use cml_chain::{Coin, Value};
use cml_crypto::Ed25519KeyHash;

use brook_cardano_lib::ledger::IntoLedger;
use brook_cardano_lib::{AssetClass, NetworkId, TaggedAmount, TaggedAssetClass, Token};

use crate::constants::REFUND_FEE_LOVELACE;
use crate::data::order::Quote;

fn redeemer_address(
    network_id: NetworkId,
    redeemer_pkh: Ed25519KeyHash,
    redeemer_stake_pkh: Option<Ed25519KeyHash>,
) -> Address {
    match redeemer_stake_pkh {
        Some(stake_pkh) => BaseAddress::new(
            network_id.into(),
            Credential::new_pub_key(redeemer_pkh),
            Credential::new_pub_key(stake_pkh),
        )
        .to_address(),
        None => EnterpriseAddress::new(network_id.into(), Credential::new_pub_key(redeemer_pkh)).to_address(),
    }
}

/// Reward output paid to the order's redeemer on successful execution.
#[derive(Debug, Clone)]
pub struct SwapOutput {
    pub quote_asset: TaggedAssetClass<Quote>,
    pub quote_amount: TaggedAmount<Quote>,
    pub ada_residue: Coin,
    pub redeemer_pkh: Ed25519KeyHash,
    pub redeemer_stake_pkh: Option<Ed25519KeyHash>,
}

impl IntoLedger<TransactionOutput, NetworkId> for SwapOutput {
    fn into_ledger(self, network_id: NetworkId) -> TransactionOutput {
        let addr = redeemer_address(network_id, self.redeemer_pkh, self.redeemer_stake_pkh);
        let mut ma = MultiAsset::new();
        let coin = match self.quote_asset.untag() {
            AssetClass::Native => self.ada_residue + self.quote_amount.untag(),
            AssetClass::Token(Token(policy, name)) => {
                ma.set(policy, name.into(), self.quote_amount.untag());
                self.ada_residue
            }
        };
        TransactionOutput::new(addr, Value::new(coin, ma), None, None)
    }
}

/// Output returning the full order value to the redeemer, less the refund fee.
/// Order admission requires the value to cover the fee.
#[derive(Debug, Clone)]
pub struct RefundOutput {
    pub value: Value,
    pub redeemer_pkh: Ed25519KeyHash,
    pub redeemer_stake_pkh: Option<Ed25519KeyHash>,
}

impl IntoLedger<TransactionOutput, NetworkId> for RefundOutput {
    fn into_ledger(self, network_id: NetworkId) -> TransactionOutput {
        let addr = redeemer_address(network_id, self.redeemer_pkh, self.redeemer_stake_pkh);
        let mut value = self.value;
        value.coin -= REFUND_FEE_LOVELACE;
        TransactionOutput::new(addr, value, None, None)
    }
}

#[cfg(test)]
mod tests {
    use cml_chain::Value;
    use cml_crypto::Ed25519KeyHash;

    use brook_cardano_lib::ledger::IntoLedger;
    use brook_cardano_lib::transaction::TransactionOutputExtension;
    use brook_cardano_lib::value::ValueExtension;
    use brook_cardano_lib::{AssetClass, NetworkId, TaggedAmount, TaggedAssetClass};

    use crate::constants::REFUND_FEE_LOVELACE;
    use crate::data::operation_output::{RefundOutput, SwapOutput};
    use crate::data::pool::tests::token;

    #[test]
    fn native_quote_is_merged_into_coin() {
        let out = SwapOutput {
            quote_asset: TaggedAssetClass::new(AssetClass::Native),
            quote_amount: TaggedAmount::new(5_000_000),
            ada_residue: 1_500_000,
            redeemer_pkh: Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: None,
        };
        let ledger_out = out.into_ledger(NetworkId::from(1u8));
        assert_eq!(ledger_out.value().coin, 6_500_000);
    }

    #[test]
    fn token_quote_is_paid_as_multiasset() {
        let quote = token(1, "tok");
        let out = SwapOutput {
            quote_asset: TaggedAssetClass::new(quote),
            quote_amount: TaggedAmount::new(42),
            ada_residue: 1_500_000,
            redeemer_pkh: Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: Some(Ed25519KeyHash::from([2u8; 28])),
        };
        let ledger_out = out.into_ledger(NetworkId::from(1u8));
        assert_eq!(ledger_out.value().coin, 1_500_000);
        assert_eq!(ledger_out.value().amount_of(quote), Some(42));
    }

    #[test]
    fn refund_withholds_flat_fee() {
        let out = RefundOutput {
            value: Value::from(10_000_000),
            redeemer_pkh: Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: None,
        };
        let ledger_out = out.into_ledger(NetworkId::from(1u8));
        assert_eq!(ledger_out.value().coin, 10_000_000 - REFUND_FEE_LOVELACE);
    }
}
