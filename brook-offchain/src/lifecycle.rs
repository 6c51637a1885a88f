use std::path::Path;

use cml_chain::address::{Address, EnterpriseAddress};
use cml_chain::assets::MultiAsset;
use cml_chain::builders::input_builder::InputBuilderResult;
use cml_chain::builders::mint_builder::SingleMintBuilder;
use cml_chain::builders::output_builder::TransactionOutputBuilder;
use cml_chain::builders::tx_builder::{ChangeSelectionAlgo, SignedTxBuilder};
use cml_chain::builders::witness_builder::NativeScriptWitnessInfo;
use cml_chain::certs::Credential;
use cml_chain::min_ada::min_ada_required;
use cml_chain::transaction::{DatumOption, NativeScript, TransactionOutput};
use cml_chain::Value;
use cml_crypto::{Ed25519KeyHash, RawBytesEncoding, ScriptHash};
use serde_with::{serde_as, DisplayFromStr};

use brook_cardano_lib::plutus_data::IntoPlutusData;
use brook_cardano_lib::protocol_params::COINS_PER_UTXO_BYTE;
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::value::ValueExtension;
use brook_cardano_lib::{AssetClass, AssetName, NetworkId, OutputRef, TaggedAmount, TaggedAssetClass, Token};

use crate::constants::{CREATOR_LP_SLICE, MAX_LP_CAP, TOKEN_PAIR_POOL_LOVELACE};
use crate::data::pool::CpmmPoolConfig;
use crate::error::EngineError;

/// A token minted during pool setup. Quantities are serialized as decimal
/// strings so the document survives JSON tooling that clips u64.
#[serde_as]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MintedToken {
    pub policy_id: String,
    pub asset_name: String,
    #[serde_as(as = "DisplayFromStr")]
    pub quantity: u64,
}

impl MintedToken {
    pub fn new(token: Token, quantity: u64) -> Self {
        Self {
            policy_id: token.0.to_hex(),
            asset_name: hex::encode(token.1.bytes()),
            quantity,
        }
    }

    pub fn token(&self) -> Result<Token, EngineError> {
        let policy = ScriptHash::from_hex(&self.policy_id)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        let name_raw =
            hex::decode(&self.asset_name).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        let name = AssetName::try_from(name_raw)
            .map_err(|_| EngineError::InvalidInput("asset name exceeds 32 bytes".to_string()))?;
        Ok(Token(policy, name))
    }
}

/// Checkpoint of the sequential pool setup, persisted after every confirmed
/// step so an interrupted run can resume where it stopped.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolSetupProgress {
    pub lp_token: Option<MintedToken>,
    pub identity_token: Option<MintedToken>,
    pub tradable_token: Option<MintedToken>,
    pub pool_utxo: Option<OutputRef>,
}

impl PoolSetupProgress {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| EngineError::InvalidInput(e.to_string())),
            Err(_) => Ok(Self::default()),
        }
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| EngineError::Network(e.to_string()))
    }
}

/// Minting policy requiring only the operator's signature. The policy stays
/// usable after setup, which keeps the setup tokens burnable.
pub fn one_shot_policy(pk_hash: Ed25519KeyHash) -> NativeScript {
    NativeScript::new_script_all(vec![NativeScript::new_script_pubkey(pk_hash)])
}

/// Mints `quantity` of `token_name` under the operator's native policy.
pub fn mint_pool_asset(
    token_name: &str,
    quantity: u64,
    pk_hash: Ed25519KeyHash,
    input_utxo: InputBuilderResult,
    change_address: &Address,
) -> Result<(SignedTxBuilder, MintedToken), EngineError> {
    let policy = one_shot_policy(pk_hash);
    let policy_hash = policy.hash();
    let asset_name = cml_chain::assets::AssetName::try_from(token_name.as_bytes().to_vec())
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let mut tx_builder = brook_cardano_lib::protocol_params::constant_tx_builder();
    let mint_result = SingleMintBuilder::new_single_asset(asset_name.clone(), quantity as i64)
        .native_script(policy, NativeScriptWitnessInfo::Vkeys(vec![pk_hash]));
    tx_builder
        .add_mint(mint_result)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .add_input(input_utxo)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let mut output_multiasset = MultiAsset::new();
    output_multiasset.set(policy_hash, asset_name.clone(), quantity);

    let mut output_result = TransactionOutputBuilder::new()
        .with_address(change_address.clone())
        .next()
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?
        .with_value(Value::new(5_000_000, output_multiasset.clone()))
        .build()
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    let min_ada = min_ada_required(&output_result.output, COINS_PER_UTXO_BYTE)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    output_result.output.update_value(Value::new(min_ada, output_multiasset));
    tx_builder
        .add_output(output_result)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let signed_tx_builder = tx_builder
        .build(ChangeSelectionAlgo::Default, change_address)
        .map_err(|e| EngineError::LedgerRejected(e.to_string()))?;
    let token = Token(policy_hash, AssetName::from(asset_name));
    Ok((signed_tx_builder, MintedToken::new(token, quantity)))
}

/// Burns a previously minted setup token. The input must carry the full
/// quantity being burned.
pub fn burn_pool_asset(
    minted: &MintedToken,
    pk_hash: Ed25519KeyHash,
    input_utxo: InputBuilderResult,
    change_address: &Address,
) -> Result<SignedTxBuilder, EngineError> {
    let policy = one_shot_policy(pk_hash);
    let token = minted.token()?;
    if token.0 != policy.hash() {
        return Err(EngineError::InvalidInput(format!(
            "token {} was not minted under the operator's policy",
            token
        )));
    }
    let asset_name = cml_chain::assets::AssetName::from(token.1);

    let mut tx_builder = brook_cardano_lib::protocol_params::constant_tx_builder();
    let burn_result = SingleMintBuilder::new_single_asset(asset_name, -(minted.quantity as i64))
        .native_script(policy, NativeScriptWitnessInfo::Vkeys(vec![pk_hash]));
    tx_builder
        .add_mint(burn_result)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .add_input(input_utxo)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .build(ChangeSelectionAlgo::Default, change_address)
        .map_err(|e| EngineError::LedgerRejected(e.to_string()))
}

pub struct PoolSeed {
    pub nft: Token,
    pub lp: Token,
    pub asset_x: AssetClass,
    pub asset_y: AssetClass,
    pub reserves_x: u64,
    pub reserves_y: u64,
    pub lp_fee_num: u64,
    pub lq_lower_bound: u64,
}

/// Seeds a new pool: the pool UTxO goes to the pool validator with the inline
/// datum, the creator receives their LP slice in a second output.
pub fn create_pool(
    seed: PoolSeed,
    pool_script: ScriptHash,
    inputs: Vec<InputBuilderResult>,
    creator_address: &Address,
    network_id: NetworkId,
) -> Result<SignedTxBuilder, EngineError> {
    if seed.reserves_x == 0 || seed.reserves_y == 0 {
        return Err(EngineError::InvalidInput(
            "initial reserves must be positive".to_string(),
        ));
    }
    let conf = CpmmPoolConfig {
        pool_nft: TaggedAssetClass::new(seed.nft.into()),
        asset_x: TaggedAssetClass::new(seed.asset_x),
        asset_y: TaggedAssetClass::new(seed.asset_y),
        asset_lq: TaggedAssetClass::new(seed.lp.into()),
        lp_fee_num: seed.lp_fee_num,
        stake_admin_policies: vec![],
        lq_lower_bound: TaggedAmount::new(seed.lq_lower_bound),
    };

    let mut pool_value = Value::new(0, MultiAsset::new());
    pool_value.add_unsafe(seed.asset_x, seed.reserves_x);
    pool_value.add_unsafe(seed.asset_y, seed.reserves_y);
    pool_value.add_unsafe(seed.nft.into(), 1);
    pool_value.add_unsafe(seed.lp.into(), MAX_LP_CAP - CREATOR_LP_SLICE);
    if !seed.asset_x.is_native() && !seed.asset_y.is_native() {
        pool_value.coin = TOKEN_PAIR_POOL_LOVELACE;
    }

    let pool_address =
        EnterpriseAddress::new(network_id.into(), Credential::new_script(pool_script)).to_address();
    let pool_output = TransactionOutput::new(
        pool_address,
        pool_value,
        Some(DatumOption::new_datum(conf.into_pd())),
        None,
    );

    let mut creator_ma = MultiAsset::new();
    let Token(lp_policy, lp_name) = seed.lp;
    creator_ma.set(lp_policy, lp_name.into(), CREATOR_LP_SLICE);
    let mut creator_output = TransactionOutputBuilder::new()
        .with_address(creator_address.clone())
        .next()
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?
        .with_value(Value::new(5_000_000, creator_ma.clone()))
        .build()
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    let min_ada = min_ada_required(&creator_output.output, COINS_PER_UTXO_BYTE)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    creator_output.output.update_value(Value::new(min_ada, creator_ma));

    let mut tx_builder = brook_cardano_lib::protocol_params::constant_tx_builder();
    for input in inputs {
        tx_builder
            .add_input(input)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    }
    tx_builder
        .add_output(cml_chain::builders::output_builder::SingleOutputBuilderResult::new(pool_output))
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .add_output(creator_output)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .build(ChangeSelectionAlgo::Default, creator_address)
        .map_err(|e| EngineError::LedgerRejected(e.to_string()))
}
