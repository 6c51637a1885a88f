use cml_chain::address::Address;
use cml_chain::builders::tx_builder::TransactionUnspentOutput;
use cml_chain::plutus::PlutusData;
use cml_chain::transaction::{DatumOption, TransactionInput, TransactionOutput};
use cml_chain::{PolicyId, Value as CMLValue};
use cml_core::serialization::Deserialize as CMLDeserialize;
use cml_crypto::{DatumHash, TransactionHash};
use serde::Deserialize;

use brook_cardano_lib::value::ValueExtension;
use brook_cardano_lib::AssetClass::{Native, Token as TokenClass};
use brook_cardano_lib::{AssetName, Token};

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerConfig {
    pub url: String,
    pub network: String,
}

#[derive(Debug)]
pub struct ParsingError(pub String);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTxOut {
    tx_hash: String,
    index: u64,
    addr: String,
    value: Value,
    data: Option<String>,
    data_hash: Option<String>,
}

impl TryInto<TransactionUnspentOutput> for FullTxOut {
    type Error = ParsingError;
    fn try_into(self) -> Result<TransactionUnspentOutput, Self::Error> {
        let datum = if let Some(hash) = self.data_hash {
            Some(DatumOption::new_hash(
                DatumHash::from_hex(hash.as_str()).map_err(|e| ParsingError(e.to_string()))?,
            ))
        } else if let Some(datum) = self.data {
            let raw = hex::decode(datum).map_err(|e| ParsingError(e.to_string()))?;
            Some(DatumOption::new_datum(
                PlutusData::from_cbor_bytes(&raw).map_err(|e| ParsingError(e.to_string()))?,
            ))
        } else {
            None
        };
        let input = TransactionInput::new(
            TransactionHash::from_hex(self.tx_hash.as_str()).map_err(|e| ParsingError(e.to_string()))?,
            self.index,
        );
        let output = TransactionOutput::new(
            Address::from_bech32(self.addr.as_str()).map_err(|e| ParsingError(format!("{:?}", e)))?,
            self.value.try_into()?,
            datum,
            None, // explorer doesn't serve script refs
        );
        Ok(TransactionUnspentOutput::new(input, output))
    }
}

#[derive(Deserialize)]
pub struct Value(Vec<ValueEntity>);

impl TryInto<CMLValue> for Value {
    type Error = ParsingError;

    fn try_into(self) -> Result<CMLValue, Self::Error> {
        let mut value = CMLValue::zero();
        for entity in self.0 {
            if entity.name.is_empty() && entity.policy_id.is_empty() {
                value.add_unsafe(Native, entity.quantity);
            } else {
                let policy_id = PolicyId::from_hex(entity.policy_id.as_str())
                    .map_err(|e| ParsingError(e.to_string()))?;
                let name_raw = hex::decode(entity.name).map_err(|e| ParsingError(e.to_string()))?;
                let asset_name = AssetName::try_from(name_raw)
                    .map_err(|_| ParsingError("asset name exceeds 32 bytes".to_string()))?;
                value.add_unsafe(TokenClass(Token(policy_id, asset_name)), entity.quantity);
            }
        }
        Ok(value)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueEntity {
    policy_id: String,
    name: String,
    quantity: u64,
}

#[derive(Deserialize)]
pub struct Items<T> {
    items: Vec<T>,
    total: u64,
}

impl<T> Items<T> {
    pub fn get_items(self) -> Vec<T> {
        self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
