use std::time::Duration;

use cml_chain::builders::input_builder::SingleInputBuilder;
use cml_chain::builders::output_builder::SingleOutputBuilderResult;
use cml_chain::builders::redeemer_builder::RedeemerWitnessKey;
use cml_chain::builders::tx_builder::{ChangeSelectionAlgo, SignedTxBuilder};
use cml_chain::builders::witness_builder::{PartialPlutusWitness, PlutusScriptWitness};
use cml_chain::plutus::RedeemerTag;
use cml_chain::transaction::Transaction;
use cml_core::serialization::Serialize;
use cml_crypto::Ed25519KeyHash;
use futures_timer::Delay;
use log::{info, warn};

use brook_cardano_lib::collateral::Collateral;
use brook_cardano_lib::hash::hash_transaction_canonical;
use brook_cardano_lib::ledger::{IntoLedger, TryFromLedger};
use brook_cardano_lib::output::FinalizedTxOut;
use brook_cardano_lib::protocol_params::constant_tx_builder;
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::{NetworkId, OutputRef, Token};
use brook_explorer::CardanoNetwork;

use crate::constants::REFUND_FEE_LOVELACE;
use crate::creds::OperatorRewardAddress;
use crate::data::operation_output::RefundOutput;
use crate::data::order::{OrderAction, OrderRedeemer, SwapOrder};
use crate::data::pool::{CpmmPool, ImmutablePoolUtxo, PoolAction, PoolRedeemer};
use crate::data::{Bundled, PoolId, Predicted};
use crate::deployment::{ScriptRegistry, ValidatorRole};
use crate::error::EngineError;
use crate::prover::TxProver;

const RETRY_DELAY_SECS: u64 = 3;

#[derive(Clone)]
pub struct ExecutionContext {
    pub operator_reward_address: OperatorRewardAddress,
    pub scripts: ScriptRegistry,
    pub collateral: Collateral,
    pub network_id: NetworkId,
}

/// Input indices as the ledger sees them: inputs of a transaction are
/// ordered by tx hash bytes, then by output index.
pub fn order_input_indexes(pool_ref: OutputRef, order_ref: OutputRef) -> (u64, u64) {
    if pool_ref < order_ref {
        (0, 1)
    } else {
        (1, 0)
    }
}

/// Assembles the settlement transaction spending the pool and the order.
/// On `Apply` the order is executed against the pool; on `Refund` the pool
/// value is carried over unchanged and the order value goes back to its owner.
pub fn execute_swap(
    Bundled(pool, FinalizedTxOut(pool_utxo, pool_ref)): Bundled<CpmmPool, FinalizedTxOut>,
    Bundled(order, FinalizedTxOut(order_utxo, order_ref)): Bundled<SwapOrder, FinalizedTxOut>,
    action: OrderAction,
    ctx: &ExecutionContext,
) -> Result<(SignedTxBuilder, Predicted<Bundled<CpmmPool, FinalizedTxOut>>), EngineError> {
    info!(target: "offchain", "running order {} against pool {}", order_ref, pool_ref);

    let (pool_in_idx, order_in_idx) = order_input_indexes(pool_ref, order_ref);

    let pool_validator = ctx.scripts.lookup(ValidatorRole::Pool)?.clone();
    let order_validator = ctx.scripts.lookup(ValidatorRole::Swap)?.clone();

    let pool_redeemer = PoolRedeemer {
        pool_input_index: pool_in_idx,
        action: PoolAction::Swap,
    };
    let pool_script = PartialPlutusWitness::new(
        PlutusScriptWitness::Ref(pool_validator.hash),
        pool_redeemer.to_plutus_data(),
    );
    let immut_pool = ImmutablePoolUtxo::from(&pool_utxo);
    let pool_in = SingleInputBuilder::new(pool_ref.into(), pool_utxo.clone())
        .plutus_script_inline_datum(pool_script, Vec::<Ed25519KeyHash>::new().into())
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let order_redeemer = OrderRedeemer {
        pool_input_index: pool_in_idx,
        order_input_index: order_in_idx,
        output_index: 1,
        action,
    };
    let order_script = PartialPlutusWitness::new(
        PlutusScriptWitness::Ref(order_validator.hash),
        order_redeemer.to_plutus_data(),
    );
    // Refunds must be authorized by the order owner.
    let order_signers = match action {
        OrderAction::Apply => Vec::new(),
        OrderAction::Refund => vec![order.redeemer_pkh],
    };
    let order_in = SingleInputBuilder::new(order_ref.into(), order_utxo.clone())
        .plutus_script_inline_datum(order_script, order_signers.into())
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let (next_pool, user_out) = match action {
        OrderAction::Apply => {
            let (next_pool, swap_out) = pool.apply_swap(order)?;
            (next_pool, swap_out.into_ledger(ctx.network_id))
        }
        OrderAction::Refund => {
            let order_value = order_utxo.value().clone();
            if order_value.coin < REFUND_FEE_LOVELACE {
                return Err(EngineError::InvalidInput(format!(
                    "order {} cannot cover the {} lovelace refund fee",
                    order_ref, REFUND_FEE_LOVELACE
                )));
            }
            let refund_out = RefundOutput {
                value: order_value,
                redeemer_pkh: order.redeemer_pkh,
                redeemer_stake_pkh: order.redeemer_stake_pkh,
            };
            (pool, refund_out.into_ledger(ctx.network_id))
        }
    };
    let pool_out = next_pool.into_ledger(immut_pool);

    let mut tx_builder = constant_tx_builder();

    tx_builder
        .add_collateral(ctx.collateral.clone().into())
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    tx_builder.add_reference_input(order_validator.reference_utxo);
    tx_builder.add_reference_input(pool_validator.reference_utxo);

    tx_builder
        .add_input(pool_in)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .add_input(order_in)
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    tx_builder.set_exunits(
        RedeemerWitnessKey::new(RedeemerTag::Spend, pool_in_idx),
        pool_validator.ex_budget.into(),
    );
    tx_builder.set_exunits(
        RedeemerWitnessKey::new(RedeemerTag::Spend, order_in_idx),
        order_validator.ex_budget.into(),
    );

    tx_builder
        .add_output(SingleOutputBuilderResult::new(pool_out.clone()))
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
    tx_builder
        .add_output(SingleOutputBuilderResult::new(user_out))
        .map_err(|e| EngineError::InvalidInput(e.to_string()))?;

    let tx = tx_builder
        .build(
            ChangeSelectionAlgo::Default,
            &ctx.operator_reward_address.clone().address(),
        )
        .map_err(|e| EngineError::LedgerRejected(e.to_string()))?;

    let tx_hash = hash_transaction_canonical(&tx.body());

    let next_pool_ref = OutputRef::new(tx_hash, 0);
    let predicted_pool = Predicted(Bundled(next_pool, FinalizedTxOut(pool_out, next_pool_ref)));

    Ok((tx, predicted_pool))
}

/// Settles a swap order against the live pool state: fetches the pool by its
/// NFT, assembles the transaction and submits it, retrying on stale state or
/// transient failures with a refreshed pool snapshot.
pub async fn settle_swap<Net, Prover>(
    network: &Net,
    prover: &Prover,
    pool_id: PoolId,
    order: Bundled<SwapOrder, FinalizedTxOut>,
    action: OrderAction,
    ctx: &ExecutionContext,
    max_attempts: u32,
) -> Result<Predicted<Bundled<CpmmPool, FinalizedTxOut>>, EngineError>
where
    Net: CardanoNetwork,
    Prover: TxProver<SignedTxBuilder, Transaction>,
{
    let pool_script_hash = ctx.scripts.lookup(ValidatorRole::Pool)?.hash;
    let mut last_err = EngineError::Network("no settlement attempts made".to_string());
    for attempt in 0..max_attempts {
        let pool_utxo = network
            .utxo_by_asset(Token::from(pool_id))
            .await
            .ok_or_else(|| EngineError::Network(format!("pool {} not found on-chain", pool_id)))?;
        let pool_ref = OutputRef::from(pool_utxo.input.clone());
        let pool = CpmmPool::try_from_ledger(&pool_utxo.output, &pool_script_hash).ok_or_else(|| {
            EngineError::InvalidInput(format!("utxo {} is not a valid pool", pool_ref))
        })?;
        let pool_bundle = Bundled(pool, FinalizedTxOut(pool_utxo.output, pool_ref));

        let result = execute_swap(pool_bundle, order.clone(), action, ctx).and_then(|(tx, predicted)| {
            let signed = prover.prove(tx);
            Ok((signed, predicted))
        });
        match result {
            Ok((signed, predicted)) => match network.submit_tx(&signed.to_cbor_bytes()).await {
                Ok(()) => return Ok(predicted),
                Err(err) => last_err = err.into(),
            },
            Err(err) => last_err = err,
        }
        if !last_err.is_retryable() {
            return Err(last_err);
        }
        warn!(
            target: "offchain",
            "settlement attempt {} failed: {}, retrying",
            attempt + 1,
            last_err
        );
        Delay::new(Duration::from_secs(RETRY_DELAY_SECS)).await;
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use cml_chain::address::EnterpriseAddress;
    use cml_chain::builders::tx_builder::TransactionUnspentOutput;
    use cml_chain::certs::Credential;
    use cml_chain::plutus::PlutusV2Script;
    use cml_chain::transaction::{TransactionInput, TransactionOutput};
    use cml_chain::{Script, Value};
    use cml_crypto::{Bip32PrivateKey, ScriptHash, TransactionHash};

    use brook_cardano_lib::collateral::Collateral;
    use brook_cardano_lib::ledger::{IntoLedger, TryFromLedger};
    use brook_cardano_lib::output::FinalizedTxOut;
    use brook_cardano_lib::transaction::TransactionOutputExtension;
    use brook_cardano_lib::{AssetClass, NetworkId, OutputRef};

    use crate::creds::operator_creds;
    use crate::data::order::{build_swap_order, OrderAction, SwapOrder};
    use crate::data::pool::tests::{gen_pool, token};
    use crate::data::pool::ImmutablePoolUtxo;
    use crate::data::Bundled;
    use crate::deployment::{DeployedValidator, ScriptRegistry, ValidatorRole, DEFAULT_EX_BUDGET};
    use crate::executor::{execute_swap, order_input_indexes, ExecutionContext};

    #[test]
    fn input_indexes_follow_output_ref_order() {
        let a = OutputRef::new(TransactionHash::from([0u8; 32]), 1);
        let b = OutputRef::new(TransactionHash::from([1u8; 32]), 0);
        assert_eq!(order_input_indexes(a, b), (0, 1));
        assert_eq!(order_input_indexes(b, a), (1, 0));
    }

    fn deployed(script_byte: u8) -> (ScriptHash, DeployedValidator) {
        let script = Script::new_plutus_v2(PlutusV2Script::new(vec![script_byte, 0x01, 0x00]));
        let hash = script.hash();
        let addr = EnterpriseAddress::new(0, Credential::new_script(hash)).to_address();
        let ref_utxo = TransactionUnspentOutput::new(
            TransactionInput::new(TransactionHash::from([script_byte; 32]), 0),
            TransactionOutput::new(addr, Value::from(20_000_000), None, Some(script)),
        );
        (
            hash,
            DeployedValidator {
                hash,
                reference_utxo: ref_utxo,
                ex_budget: DEFAULT_EX_BUDGET,
            },
        )
    }

    fn test_context() -> (ExecutionContext, ScriptHash, ScriptHash) {
        let sk_bech32 = Bip32PrivateKey::generate_ed25519_bip32().to_bech32();
        let (_, operator_addr, _) = operator_creds(sk_bech32.as_str(), NetworkId::from(0u8));

        let (pool_hash, pool_validator) = deployed(0x4e);
        let (order_hash, order_validator) = deployed(0x4f);
        let mut scripts = ScriptRegistry::new();
        scripts.register(ValidatorRole::Pool, pool_validator);
        scripts.register(ValidatorRole::Swap, order_validator);

        let collateral_utxo = TransactionUnspentOutput::new(
            TransactionInput::new(TransactionHash::from([9u8; 32]), 0),
            TransactionOutput::new(operator_addr.clone(), Value::from(10_000_000), None, None),
        );

        let ctx = ExecutionContext {
            operator_reward_address: operator_addr.into(),
            scripts,
            collateral: Collateral::from(collateral_utxo),
            network_id: NetworkId::from(0u8),
        };
        (ctx, pool_hash, order_hash)
    }

    fn pool_and_order(
        pool_hash: ScriptHash,
        order_hash: ScriptHash,
    ) -> (Bundled<crate::data::pool::CpmmPool, FinalizedTxOut>, Bundled<SwapOrder, FinalizedTxOut>) {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);

        let pool_addr = EnterpriseAddress::new(0, Credential::new_script(pool_hash)).to_address();
        let pool_utxo = pool.into_ledger(ImmutablePoolUtxo {
            address: pool_addr,
            value: pool.reserves_x.untag(),
            datum_option: None,
            script_reference: None,
        });
        let pool_ref = OutputRef::new(TransactionHash::from([2u8; 32]), 0);

        let order_addr = EnterpriseAddress::new(0, Credential::new_script(order_hash)).to_address();
        let redeemer_pkh = cml_crypto::Ed25519KeyHash::from([3u8; 28]);
        let order_utxo = build_swap_order(
            &pool,
            AssetClass::Native,
            10_000_000,
            3,
            50_000_000,
            redeemer_pkh,
            None,
            order_addr,
        )
        .unwrap();
        let order_ref = OutputRef::new(TransactionHash::from([4u8; 32]), 0);
        let order = SwapOrder::try_from_ledger(&order_utxo, &(order_ref, order_hash)).unwrap();

        (
            Bundled(pool, FinalizedTxOut(pool_utxo, pool_ref)),
            Bundled(order, FinalizedTxOut(order_utxo, order_ref)),
        )
    }

    #[test]
    fn settlement_tx_places_pool_first_and_reward_second() {
        let (ctx, pool_hash, order_hash) = test_context();
        let (pool_bundle, order_bundle) = pool_and_order(pool_hash, order_hash);
        let pool_before = pool_bundle.0;

        let (tx, predicted) =
            execute_swap(pool_bundle, order_bundle, OrderAction::Apply, &ctx).unwrap();

        let outputs = tx.body().outputs;
        assert!(outputs.len() >= 2);
        let next_pool = predicted.0 .0;
        assert_eq!(next_pool.reserves_x.untag(), pool_before.reserves_x.untag() + 10_000_000);
        assert!(next_pool.reserves_y.untag() < pool_before.reserves_y.untag());
        assert_eq!(predicted.0 .1 .1.index(), 0);
    }

    #[test]
    fn refund_of_underfunded_order_is_rejected() {
        let (ctx, pool_hash, order_hash) = test_context();
        let (pool_bundle, order_bundle) = pool_and_order(pool_hash, order_hash);
        let Bundled(order, FinalizedTxOut(_, order_ref)) = order_bundle;
        let order_addr = EnterpriseAddress::new(0, Credential::new_script(order_hash)).to_address();
        let poor_utxo = TransactionOutput::new(order_addr, Value::from(1_500_000), None, None);
        let err = execute_swap(
            pool_bundle,
            Bundled(order, FinalizedTxOut(poor_utxo, order_ref)),
            OrderAction::Refund,
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::EngineError::InvalidInput(_)));
    }

    #[test]
    fn refund_keeps_pool_untouched_and_returns_order_value() {
        let (ctx, pool_hash, order_hash) = test_context();
        let (pool_bundle, order_bundle) = pool_and_order(pool_hash, order_hash);
        let pool_before = pool_bundle.0;
        let order_value = order_bundle.1 .0.value().clone();

        let (tx, predicted) =
            execute_swap(pool_bundle, order_bundle, OrderAction::Refund, &ctx).unwrap();

        let next_pool = predicted.0 .0;
        assert_eq!(next_pool, pool_before);
        let outputs = tx.body().outputs;
        let reward = &outputs[1];
        assert_eq!(
            reward.value().coin,
            order_value.coin - crate::constants::REFUND_FEE_LOVELACE
        );
    }
}
