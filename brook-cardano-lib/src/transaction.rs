use cml_chain::address::Address;
use cml_chain::transaction::{DatumOption, ScriptRef, TransactionOutput};
use cml_chain::Value;
use cml_crypto::ScriptHash;

use crate::address::AddressExtension;

pub trait TransactionOutputExtension {
    fn address(&self) -> &Address;
    fn value(&self) -> &Value;
    fn value_mut(&mut self) -> &mut Value;
    fn datum(&self) -> Option<DatumOption>;
    fn into_datum(self) -> Option<DatumOption>;
    fn script_hash(&self) -> Option<ScriptHash>;
    fn script_ref(&self) -> Option<&ScriptRef>;
    fn update_value(&mut self, value: Value);
}

impl TransactionOutputExtension for TransactionOutput {
    fn address(&self) -> &Address {
        match self {
            Self::AlonzoFormatTxOut(tx_out) => &tx_out.address,
            Self::ConwayFormatTxOut(tx_out) => &tx_out.address,
        }
    }
    fn value(&self) -> &Value {
        match self {
            Self::AlonzoFormatTxOut(tx_out) => &tx_out.amount,
            Self::ConwayFormatTxOut(tx_out) => &tx_out.amount,
        }
    }
    fn value_mut(&mut self) -> &mut Value {
        match self {
            Self::AlonzoFormatTxOut(tx_out) => &mut tx_out.amount,
            Self::ConwayFormatTxOut(tx_out) => &mut tx_out.amount,
        }
    }
    fn datum(&self) -> Option<DatumOption> {
        match self {
            Self::AlonzoFormatTxOut(tx_out) => tx_out.datum_hash.map(DatumOption::new_hash),
            Self::ConwayFormatTxOut(tx_out) => tx_out.datum_option.clone(),
        }
    }
    fn into_datum(self) -> Option<DatumOption> {
        match self {
            Self::AlonzoFormatTxOut(tx_out) => tx_out.datum_hash.map(DatumOption::new_hash),
            Self::ConwayFormatTxOut(tx_out) => tx_out.datum_option,
        }
    }
    fn script_hash(&self) -> Option<ScriptHash> {
        self.address().script_hash()
    }
    fn script_ref(&self) -> Option<&ScriptRef> {
        match self {
            Self::AlonzoFormatTxOut(_) => None,
            Self::ConwayFormatTxOut(tx_out) => tx_out.script_reference.as_ref(),
        }
    }
    fn update_value(&mut self, value: Value) {
        match self {
            Self::AlonzoFormatTxOut(ref mut out) => {
                out.amount = value;
            }
            Self::ConwayFormatTxOut(ref mut out) => {
                out.amount = value;
            }
        }
    }
}
