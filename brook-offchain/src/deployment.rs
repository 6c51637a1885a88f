use std::collections::HashMap;

use cml_chain::address::EnterpriseAddress;
use cml_chain::builders::tx_builder::TransactionUnspentOutput;
use cml_chain::certs::Credential;
use cml_chain::min_ada::min_ada_required;
use cml_chain::plutus::PlutusV2Script;
use cml_chain::transaction::TransactionOutput;
use cml_chain::{Script, Value};
use cml_crypto::ScriptHash;

use brook_cardano_lib::ex_units::ExUnits;
use brook_cardano_lib::protocol_params::COINS_PER_UTXO_BYTE;
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::{NetworkId, OutputRef};
use brook_explorer::CardanoNetwork;

use crate::error::EngineError;

/// Ex-units reserved for a spend when the on-chain budget is not known upfront.
pub const DEFAULT_EX_BUDGET: ExUnits = ExUnits {
    mem: 600_000,
    steps: 200_000_000,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ValidatorRole {
    Pool,
    Swap,
    Deposit,
    Redeem,
}

impl ValidatorRole {
    pub const ALL: [ValidatorRole; 4] = [
        ValidatorRole::Pool,
        ValidatorRole::Swap,
        ValidatorRole::Deposit,
        ValidatorRole::Redeem,
    ];
}

/// On-chain locations of the UTxOs carrying reference scripts.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSources {
    pub pool_script: OutputRef,
    pub swap_script: OutputRef,
    pub deposit_script: OutputRef,
    pub redeem_script: OutputRef,
}

impl ReferenceSources {
    fn source(&self, role: ValidatorRole) -> OutputRef {
        match role {
            ValidatorRole::Pool => self.pool_script,
            ValidatorRole::Swap => self.swap_script,
            ValidatorRole::Deposit => self.deposit_script,
            ValidatorRole::Redeem => self.redeem_script,
        }
    }
}

/// Hex-encoded CBOR of the protocol validators.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolScripts {
    pub pool_script: String,
    pub swap_script: String,
    pub deposit_script: String,
    pub redeem_script: String,
}

impl ProtocolScripts {
    fn script(&self, role: ValidatorRole) -> &str {
        match role {
            ValidatorRole::Pool => &self.pool_script,
            ValidatorRole::Swap => &self.swap_script,
            ValidatorRole::Deposit => &self.deposit_script,
            ValidatorRole::Redeem => &self.redeem_script,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployedValidator {
    pub hash: ScriptHash,
    pub reference_utxo: TransactionUnspentOutput,
    pub ex_budget: ExUnits,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    validators: HashMap<ValidatorRole, DeployedValidator>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    pub fn register(&mut self, role: ValidatorRole, validator: DeployedValidator) {
        self.validators.insert(role, validator);
    }

    pub fn lookup(&self, role: ValidatorRole) -> Result<&DeployedValidator, EngineError> {
        self.validators
            .get(&role)
            .ok_or(EngineError::ReferenceNotFound(role))
    }

    /// Resolves every reference UTxO and attaches the corresponding script to it.
    /// The explorer does not serve script refs, so the script body comes from config.
    pub async fn pull<Net: CardanoNetwork>(
        sources: ReferenceSources,
        scripts: ProtocolScripts,
        network: &Net,
    ) -> Result<ScriptRegistry, EngineError> {
        let mut registry = ScriptRegistry::new();
        for role in ValidatorRole::ALL {
            let oref = sources.source(role);
            let utxo = network.utxo_by_ref(oref).await.ok_or_else(|| {
                EngineError::Network(format!("reference utxo {} for {:?} not found", oref, role))
            })?;
            let script = decode_plutus_v2(scripts.script(role))?;
            let hash = script.hash();
            let output_with_ref = TransactionOutput::new(
                utxo.output.address().clone(),
                utxo.output.value().clone(),
                utxo.output.datum(),
                Some(script),
            );
            registry.register(
                role,
                DeployedValidator {
                    hash,
                    reference_utxo: TransactionUnspentOutput::new(utxo.input, output_with_ref),
                    ex_budget: DEFAULT_EX_BUDGET,
                },
            );
        }
        Ok(registry)
    }
}

pub fn decode_plutus_v2(script_hex: &str) -> Result<Script, EngineError> {
    let raw = hex::decode(script_hex)
        .map_err(|e| EngineError::InvalidInput(format!("malformed script hex: {}", e)))?;
    Ok(Script::new_plutus_v2(PlutusV2Script::new(raw)))
}

/// Builds the output that publishes a validator as a reference script.
/// The UTxO is paid to the script's own address so it stays discoverable.
pub fn deploy_reference_output(
    script_hex: &str,
    network_id: NetworkId,
) -> Result<TransactionOutput, EngineError> {
    let script = decode_plutus_v2(script_hex)?;
    let hash = script.hash();
    let addr = EnterpriseAddress::new(network_id.into(), Credential::new_script(hash)).to_address();
    let mut output = TransactionOutput::new(addr, Value::zero(), None, Some(script));
    // Coin affects serialized size, so settle min-ADA in two passes.
    for _ in 0..2 {
        let min_ada = min_ada_required(&output, COINS_PER_UTXO_BYTE)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        output.update_value(Value::from(min_ada));
    }
    Ok(output)
}
