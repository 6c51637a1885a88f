use cml_chain::address::Address;
use cml_chain::assets::MultiAsset;
use cml_chain::plutus::{ConstrPlutusData, PlutusData};
use cml_chain::transaction::{ConwayFormatTxOut, DatumOption, ScriptRef, TransactionOutput};
use cml_chain::utils::BigInteger;
use cml_chain::{Coin, PolicyId, Value};
use cml_crypto::{RawBytesEncoding, ScriptHash};
use num_rational::Ratio;

use brook_cardano_lib::ledger::{IntoLedger, TryFromLedger};
use brook_cardano_lib::plutus_data::{
    ConstrPlutusDataExtension, DatumExtension, IntoPlutusData, PlutusDataExtension,
};
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::types::TryFromPData;
use brook_cardano_lib::value::ValueExtension;
use brook_cardano_lib::{TaggedAmount, TaggedAssetClass};

use crate::constants::{
    EXECUTOR_REBATE_NATIVE_PAIR, EXECUTOR_REBATE_TOKEN_PAIR, FEE_DEN, MAX_LP_CAP,
};
use crate::data::operation_output::SwapOutput;
use crate::data::order::{Base, PoolNft, Quote, SwapOrder};
use crate::data::PoolId;
use crate::error::EngineError;
use crate::pool_math::cpmm_output_amount;

pub struct Rx;

pub struct Ry;

pub struct Lq;

#[derive(Copy, Clone)]
pub enum PoolAction {
    Deposit,
    Redeem,
    Swap,
    Destroy,
}

impl PoolAction {
    fn as_code(self) -> u64 {
        match self {
            PoolAction::Deposit => 0,
            PoolAction::Redeem => 1,
            PoolAction::Swap => 2,
            PoolAction::Destroy => 3,
        }
    }
}

pub struct PoolRedeemer {
    pub pool_input_index: u64,
    pub action: PoolAction,
}

impl PoolRedeemer {
    pub fn to_plutus_data(self) -> PlutusData {
        PlutusData::ConstrPlutusData(ConstrPlutusData::new(
            0,
            vec![
                PlutusData::Integer(BigInteger::from(self.action.as_code())),
                PlutusData::Integer(BigInteger::from(self.pool_input_index)),
            ],
        ))
    }
}

pub struct CpmmPoolConfig {
    pub pool_nft: TaggedAssetClass<PoolNft>,
    pub asset_x: TaggedAssetClass<Rx>,
    pub asset_y: TaggedAssetClass<Ry>,
    pub asset_lq: TaggedAssetClass<Lq>,
    pub lp_fee_num: u64,
    pub stake_admin_policies: Vec<PolicyId>,
    pub lq_lower_bound: TaggedAmount<Rx>,
}

impl TryFromPData for CpmmPoolConfig {
    fn try_from_pd(data: PlutusData) -> Option<Self> {
        let mut cpd = data.into_constr_pd()?;
        let pool_nft = TaggedAssetClass::try_from_pd(cpd.take_field(0)?)?;
        let asset_x = TaggedAssetClass::try_from_pd(cpd.take_field(1)?)?;
        let asset_y = TaggedAssetClass::try_from_pd(cpd.take_field(2)?)?;
        let asset_lq = TaggedAssetClass::try_from_pd(cpd.take_field(3)?)?;
        let lp_fee_num = cpd.take_field(4)?.into_u64()?;
        let stake_admin_policies = cpd
            .take_field(5)?
            .into_vec()?
            .into_iter()
            .map(|pd| {
                pd.into_bytes()
                    .and_then(|bytes| PolicyId::from_raw_bytes(&bytes).ok())
            })
            .collect::<Option<Vec<_>>>()?;
        let lq_lower_bound = TaggedAmount::new(cpd.take_field(6).and_then(|pd| pd.into_u64()).unwrap_or(0));
        Some(Self {
            pool_nft,
            asset_x,
            asset_y,
            asset_lq,
            lp_fee_num,
            stake_admin_policies,
            lq_lower_bound,
        })
    }
}

impl IntoPlutusData for CpmmPoolConfig {
    fn into_pd(self) -> PlutusData {
        let stake_admins = self
            .stake_admin_policies
            .into_iter()
            .map(|policy| PlutusData::new_bytes(policy.to_raw_bytes().to_vec()))
            .collect();
        PlutusData::ConstrPlutusData(ConstrPlutusData::new(
            0,
            vec![
                self.pool_nft.into_pd(),
                self.asset_x.into_pd(),
                self.asset_y.into_pd(),
                self.asset_lq.into_pd(),
                self.lp_fee_num.into_pd(),
                PlutusData::new_list(stake_admins),
                self.lq_lower_bound.into_pd(),
            ],
        ))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CpmmPool {
    pub id: PoolId,
    pub reserves_x: TaggedAmount<Rx>,
    pub reserves_y: TaggedAmount<Ry>,
    pub liquidity: TaggedAmount<Lq>,
    pub asset_x: TaggedAssetClass<Rx>,
    pub asset_y: TaggedAssetClass<Ry>,
    pub asset_lq: TaggedAssetClass<Lq>,
    pub lp_fee: Ratio<u64>,
    pub lq_lower_bound: TaggedAmount<Rx>,
}

impl CpmmPool {
    pub fn output_amount(
        &self,
        base_asset: TaggedAssetClass<Base>,
        base_amount: TaggedAmount<Base>,
    ) -> Option<TaggedAmount<Quote>> {
        cpmm_output_amount(
            self.asset_x,
            self.reserves_x,
            self.reserves_y,
            base_asset,
            base_amount,
            self.lp_fee,
        )
    }

    pub fn has_native_leg(&self) -> bool {
        self.asset_x.is_native() || self.asset_y.is_native()
    }

    /// Applies a swap order to the pool, producing the successor pool state
    /// and the reward output owed to the order's redeemer.
    pub fn apply_swap(mut self, order: SwapOrder) -> Result<(Self, SwapOutput), EngineError> {
        if order.pool_id != self.id {
            return Err(EngineError::InvalidInput(format!(
                "order targets pool {}, not {}",
                order.pool_id, self.id
            )));
        }
        if order.pool_fee_num != *self.lp_fee.numer() {
            return Err(EngineError::InvalidInput(format!(
                "order was quoted against fee {}, pool charges {}",
                order.pool_fee_num,
                self.lp_fee.numer()
            )));
        }
        let quote_amount = self
            .output_amount(order.base_asset, order.base_amount)
            .ok_or(EngineError::DivisionByZero("cpmm_output_amount"))?;
        if quote_amount < order.min_quote_amount {
            return Err(EngineError::StaleState {
                actual: quote_amount.untag(),
                expected: order.min_quote_amount.untag(),
            });
        }
        if order.quote_asset.untag() == self.asset_x.untag() {
            self.reserves_x -= quote_amount.retag();
            self.reserves_y += order.base_amount.retag();
        } else {
            self.reserves_y -= quote_amount.retag();
            self.reserves_x += order.base_amount.retag();
        }
        let ex_fee = order.fee.get_fee(quote_amount.untag());
        if ex_fee > order.ada_deposit {
            return Err(EngineError::InvalidInput(format!(
                "executor fee {} exceeds order deposit {}",
                ex_fee, order.ada_deposit
            )));
        }
        let rebate = if self.has_native_leg() {
            EXECUTOR_REBATE_NATIVE_PAIR
        } else {
            EXECUTOR_REBATE_TOKEN_PAIR
        };
        let ada_residue = order.ada_deposit - ex_fee + rebate;
        let swap_output = SwapOutput {
            quote_asset: order.quote_asset,
            quote_amount,
            ada_residue,
            redeemer_pkh: order.redeemer_pkh,
            redeemer_stake_pkh: order.redeemer_stake_pkh,
        };
        Ok((self, swap_output))
    }
}

/// Parts of the pool UTxO the settlement transaction carries over verbatim.
pub struct ImmutablePoolUtxo {
    pub address: Address,
    pub value: Coin,
    pub datum_option: Option<DatumOption>,
    pub script_reference: Option<ScriptRef>,
}

impl From<&TransactionOutput> for ImmutablePoolUtxo {
    fn from(out: &TransactionOutput) -> Self {
        Self {
            address: out.address().clone(),
            value: out.value().coin,
            datum_option: out.datum(),
            script_reference: out.script_ref().cloned(),
        }
    }
}

impl TryFromLedger<TransactionOutput, ScriptHash> for CpmmPool {
    fn try_from_ledger(repr: &TransactionOutput, pool_script: &ScriptHash) -> Option<Self> {
        if repr.script_hash()? != *pool_script {
            return None;
        }
        let value = repr.value();
        let conf = CpmmPoolConfig::try_from_pd(repr.datum()?.into_pd()?)?;
        let liquidity_neg = value.amount_of(conf.asset_lq.into())?;
        Some(CpmmPool {
            id: PoolId::try_from(conf.pool_nft).ok()?,
            reserves_x: TaggedAmount::new(value.amount_of(conf.asset_x.into())?),
            reserves_y: TaggedAmount::new(value.amount_of(conf.asset_y.into())?),
            liquidity: TaggedAmount::new(MAX_LP_CAP - liquidity_neg),
            asset_x: conf.asset_x,
            asset_y: conf.asset_y,
            asset_lq: conf.asset_lq,
            lp_fee: Ratio::new_raw(conf.lp_fee_num, FEE_DEN),
            lq_lower_bound: conf.lq_lower_bound,
        })
    }
}

impl IntoLedger<TransactionOutput, ImmutablePoolUtxo> for CpmmPool {
    fn into_ledger(self, immut_pool: ImmutablePoolUtxo) -> TransactionOutput {
        let mut ma = MultiAsset::new();
        let coins = if self.asset_x.is_native() {
            let brook_cardano_lib::Token(policy, name) = self.asset_y.untag().into_token().unwrap();
            ma.set(policy, name.into(), self.reserves_y.untag());
            self.reserves_x.untag()
        } else if self.asset_y.is_native() {
            let brook_cardano_lib::Token(policy, name) = self.asset_x.untag().into_token().unwrap();
            ma.set(policy, name.into(), self.reserves_x.untag());
            self.reserves_y.untag()
        } else {
            let brook_cardano_lib::Token(policy_x, name_x) = self.asset_x.untag().into_token().unwrap();
            ma.set(policy_x, name_x.into(), self.reserves_x.untag());
            let brook_cardano_lib::Token(policy_y, name_y) = self.asset_y.untag().into_token().unwrap();
            ma.set(policy_y, name_y.into(), self.reserves_y.untag());
            immut_pool.value
        };
        let brook_cardano_lib::Token(policy_lq, name_lq) = self.asset_lq.untag().into_token().unwrap();
        let brook_cardano_lib::Token(nft_policy, nft_name) = self.id.into();
        ma.set(policy_lq, name_lq.into(), MAX_LP_CAP - self.liquidity.untag());
        ma.set(nft_policy, nft_name.into(), 1);

        TransactionOutput::new_conway_format_tx_out(ConwayFormatTxOut {
            address: immut_pool.address,
            amount: Value::new(coins, ma),
            datum_option: immut_pool.datum_option,
            script_reference: immut_pool.script_reference,
            encodings: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use cml_chain::PolicyId;
    use num_rational::Ratio;

    use brook_cardano_lib::plutus_data::IntoPlutusData;
    use brook_cardano_lib::types::TryFromPData;
    use brook_cardano_lib::{AssetClass, AssetName, TaggedAmount, TaggedAssetClass, Token};

    use crate::constants::{
        EXECUTOR_REBATE_NATIVE_PAIR, EXECUTOR_REBATE_TOKEN_PAIR, EX_FEE_PER_TOKEN_DEN, FEE_DEN,
    };
    use crate::data::order::{OnChainSwapConfig, SwapOrder};
    use crate::data::pool::{CpmmPool, CpmmPoolConfig};
    use crate::data::{ExecutorFeePerToken, OnChainOrderId, PoolId};
    use crate::error::EngineError;

    pub(crate) fn token(tag: u8, name: &str) -> AssetClass {
        AssetClass::Token(Token(
            PolicyId::from([tag; 28]),
            AssetName::utf8_unsafe(name.to_string()),
        ))
    }

    pub(crate) fn gen_pool(asset_x: AssetClass, asset_y: AssetClass, rx: u64, ry: u64) -> CpmmPool {
        CpmmPool {
            id: PoolId::from(token(9, "pool_nft").into_token().unwrap()),
            reserves_x: TaggedAmount::new(rx),
            reserves_y: TaggedAmount::new(ry),
            liquidity: TaggedAmount::new(1_000_000_000),
            asset_x: TaggedAssetClass::new(asset_x),
            asset_y: TaggedAssetClass::new(asset_y),
            asset_lq: TaggedAssetClass::new(token(8, "lq")),
            lp_fee: Ratio::new_raw(997, FEE_DEN),
            lq_lower_bound: TaggedAmount::new(0),
        }
    }

    fn gen_swap(pool: &CpmmPool, base: AssetClass, quote: AssetClass, amount: u64, min_quote: u64) -> SwapOrder {
        SwapOrder {
            id: OnChainOrderId::new(cml_crypto::TransactionHash::from([0u8; 32]), 0),
            pool_id: pool.id,
            base_asset: TaggedAssetClass::new(base),
            base_amount: TaggedAmount::new(amount),
            quote_asset: TaggedAssetClass::new(quote),
            ada_deposit: 2_000_000,
            min_quote_amount: TaggedAmount::new(min_quote),
            pool_fee_num: *pool.lp_fee.numer(),
            fee: ExecutorFeePerToken::new(
                Ratio::new(EX_FEE_PER_TOKEN_DEN / 10_000, EX_FEE_PER_TOKEN_DEN),
                AssetClass::Native,
            ),
            redeemer_pkh: cml_crypto::Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: None,
        }
    }

    #[test]
    fn apply_swap_moves_reserves_both_ways() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 9_000_000_000);
        let (next, out) = pool.apply_swap(order).unwrap();
        assert_eq!(out.quote_amount.untag(), 9_871_580_343);
        assert_eq!(next.reserves_x.untag(), 1_010_000_000);
        assert_eq!(next.reserves_y.untag(), 1_000_000_000_000 - 9_871_580_343);
    }

    #[test]
    fn apply_swap_reward_carries_residue_and_rebate() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 9_000_000_000);
        let ex_fee = order.fee.get_fee(9_871_580_343);
        let (_, out) = pool.apply_swap(order).unwrap();
        assert_eq!(out.ada_residue, 2_000_000 - ex_fee + EXECUTOR_REBATE_NATIVE_PAIR);
    }

    #[test]
    fn apply_swap_token_pair_rebate() {
        let tok_a = token(1, "a");
        let tok_b = token(2, "b");
        let pool = gen_pool(tok_a, tok_b, 500_000_000, 2_000_000_000);
        let order = gen_swap(&pool, tok_a, tok_b, 25_000, 1);
        let (next, out) = pool.apply_swap(order).unwrap();
        assert_eq!(out.quote_amount.untag(), 99_695);
        assert_eq!(next.reserves_x.untag(), 500_025_000);
        assert!(out.ada_residue >= EXECUTOR_REBATE_TOKEN_PAIR);
    }

    #[test]
    fn apply_swap_below_min_quote_is_stale_state() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 9_871_580_344);
        let err = pool.apply_swap(order).unwrap_err();
        assert!(matches!(err, EngineError::StaleState { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn apply_swap_rejects_foreign_pool_order() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let mut order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 1);
        order.pool_id = PoolId::from(token(7, "other_nft").into_token().unwrap());
        let err = pool.apply_swap(order).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn apply_swap_rejects_stale_pool_fee() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let mut order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 1);
        order.pool_fee_num = 990;
        let err = pool.apply_swap(order).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn apply_swap_excessive_fee_is_rejected() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, 1_000_000_000_000);
        let mut order = gen_swap(&pool, AssetClass::Native, tok, 10_000_000, 9_000_000_000);
        order.fee = ExecutorFeePerToken::new(
            Ratio::new(EX_FEE_PER_TOKEN_DEN, EX_FEE_PER_TOKEN_DEN),
            AssetClass::Native,
        );
        let err = pool.apply_swap(order).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn pool_config_pd_roundtrip() {
        let conf = CpmmPoolConfig {
            pool_nft: TaggedAssetClass::new(token(9, "pool_nft")),
            asset_x: TaggedAssetClass::new(AssetClass::Native),
            asset_y: TaggedAssetClass::new(token(1, "tok")),
            asset_lq: TaggedAssetClass::new(token(8, "lq")),
            lp_fee_num: 997,
            stake_admin_policies: vec![PolicyId::from([5u8; 28])],
            lq_lower_bound: TaggedAmount::new(10_000),
        };
        let parsed = CpmmPoolConfig::try_from_pd(conf.into_pd()).unwrap();
        assert_eq!(parsed.lp_fee_num, 997);
        assert_eq!(parsed.asset_x.untag(), AssetClass::Native);
        assert_eq!(parsed.asset_y.untag(), token(1, "tok"));
        assert_eq!(parsed.stake_admin_policies, vec![PolicyId::from([5u8; 28])]);
        assert_eq!(parsed.lq_lower_bound.untag(), 10_000);
    }

    #[test]
    fn swap_config_pd_roundtrip() {
        let conf = OnChainSwapConfig {
            base: TaggedAssetClass::new(AssetClass::Native),
            base_amount: TaggedAmount::new(10_000_000),
            quote: TaggedAssetClass::new(token(1, "tok")),
            min_quote_amount: TaggedAmount::new(9_000_000_000),
            pool_nft: TaggedAssetClass::new(token(9, "pool_nft")),
            pool_fee_num: 997,
            ex_fee_per_token_num: 1_000_000,
            ex_fee_per_token_denom: EX_FEE_PER_TOKEN_DEN,
            redeemer_pkh: cml_crypto::Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: Some(cml_crypto::Ed25519KeyHash::from([2u8; 28])),
        };
        let parsed = OnChainSwapConfig::try_from_pd(conf.into_pd()).unwrap();
        assert_eq!(parsed.base_amount.untag(), 10_000_000);
        assert_eq!(parsed.min_quote_amount.untag(), 9_000_000_000);
        assert_eq!(parsed.pool_fee_num, 997);
        assert_eq!(parsed.ex_fee_per_token_num, 1_000_000);
        assert_eq!(
            parsed.redeemer_stake_pkh,
            Some(cml_crypto::Ed25519KeyHash::from([2u8; 28]))
        );
    }
}
