use cml_chain::address::Address;
use cml_chain::assets::MultiAsset;
use cml_chain::plutus::{ConstrPlutusData, PlutusData};
use cml_chain::transaction::{DatumOption, TransactionOutput};
use cml_chain::utils::BigInteger;
use cml_chain::{Coin, Value};
use cml_crypto::{Ed25519KeyHash, RawBytesEncoding, ScriptHash};
use num_rational::Ratio;

use brook_cardano_lib::ledger::TryFromLedger;
use brook_cardano_lib::plutus_data::{
    ConstrPlutusDataExtension, DatumExtension, IntoPlutusData, PlutusDataExtension,
};
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::types::TryFromPData;
use brook_cardano_lib::value::ValueExtension;
use brook_cardano_lib::{AssetClass, OutputRef, TaggedAmount, TaggedAssetClass};

use crate::constants::{
    EX_FEE_PER_TOKEN_DEN, MIN_SAFE_ADA_VALUE, REFUND_FEE_LOVELACE, SWAP_ORDER_ADA_DEPOSIT,
};
use crate::data::pool::CpmmPool;
use crate::data::{ExecutorFeePerToken, OnChainOrderId, PoolId};
use crate::error::EngineError;

pub struct Base;

pub struct Quote;

pub struct PoolNft;

#[derive(Copy, Clone)]
pub enum OrderAction {
    Apply,
    Refund,
}

impl OrderAction {
    fn as_code(self) -> u64 {
        match self {
            OrderAction::Apply => 0,
            OrderAction::Refund => 1,
        }
    }
}

pub struct OrderRedeemer {
    pub pool_input_index: u64,
    pub order_input_index: u64,
    pub output_index: u64,
    pub action: OrderAction,
}

impl OrderRedeemer {
    pub fn to_plutus_data(self) -> PlutusData {
        PlutusData::ConstrPlutusData(ConstrPlutusData::new(
            0,
            vec![
                PlutusData::Integer(BigInteger::from(self.pool_input_index)),
                PlutusData::Integer(BigInteger::from(self.order_input_index)),
                PlutusData::Integer(BigInteger::from(self.output_index)),
                PlutusData::Integer(BigInteger::from(self.action.as_code())),
            ],
        ))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SwapOrder {
    pub id: OnChainOrderId,
    pub pool_id: PoolId,
    pub base_asset: TaggedAssetClass<Base>,
    pub base_amount: TaggedAmount<Base>,
    pub quote_asset: TaggedAssetClass<Quote>,
    pub ada_deposit: Coin,
    pub min_quote_amount: TaggedAmount<Quote>,
    /// Pool fee the order was quoted against. Settlement rejects the order
    /// if it no longer matches the pool.
    pub pool_fee_num: u64,
    pub fee: ExecutorFeePerToken,
    pub redeemer_pkh: Ed25519KeyHash,
    pub redeemer_stake_pkh: Option<Ed25519KeyHash>,
}

impl TryFromLedger<TransactionOutput, (OutputRef, ScriptHash)> for SwapOrder {
    fn try_from_ledger(repr: &TransactionOutput, ctx: &(OutputRef, ScriptHash)) -> Option<Self> {
        let (order_ref, order_script) = ctx;
        if repr.script_hash()? != *order_script {
            return None;
        }
        let value = repr.value().clone();
        let conf = OnChainSwapConfig::try_from_pd(repr.datum()?.into_pd()?)?;
        let real_base_input = value.amount_of(conf.base.untag()).unwrap_or(0);
        let (min_base, ada_deposit) = if conf.base.is_native() {
            let min = conf.base_amount.untag()
                + ((conf.min_quote_amount.untag() as u128) * conf.ex_fee_per_token_num
                    / conf.ex_fee_per_token_denom) as u64;
            let ada = real_base_input.checked_sub(conf.base_amount.untag())?;
            (min, ada)
        } else {
            (conf.base_amount.untag(), value.coin)
        };
        // The UTxO must also be able to pay the flat fee if the order ends up refunded.
        if real_base_input < min_base || ada_deposit < MIN_SAFE_ADA_VALUE || value.coin < REFUND_FEE_LOVELACE
        {
            return None;
        }
        Some(SwapOrder {
            id: OnChainOrderId::from(*order_ref),
            pool_id: PoolId::try_from(conf.pool_nft).ok()?,
            base_asset: conf.base,
            base_amount: conf.base_amount,
            quote_asset: conf.quote,
            ada_deposit,
            min_quote_amount: conf.min_quote_amount,
            pool_fee_num: conf.pool_fee_num,
            fee: ExecutorFeePerToken::new(
                Ratio::new(conf.ex_fee_per_token_num, conf.ex_fee_per_token_denom),
                AssetClass::Native,
            ),
            redeemer_pkh: conf.redeemer_pkh,
            redeemer_stake_pkh: conf.redeemer_stake_pkh,
        })
    }
}

pub struct OnChainSwapConfig {
    pub base: TaggedAssetClass<Base>,
    pub base_amount: TaggedAmount<Base>,
    pub quote: TaggedAssetClass<Quote>,
    pub min_quote_amount: TaggedAmount<Quote>,
    pub pool_nft: TaggedAssetClass<PoolNft>,
    pub pool_fee_num: u64,
    pub ex_fee_per_token_num: u128,
    pub ex_fee_per_token_denom: u128,
    pub redeemer_pkh: Ed25519KeyHash,
    pub redeemer_stake_pkh: Option<Ed25519KeyHash>,
}

impl TryFromPData for OnChainSwapConfig {
    fn try_from_pd(data: PlutusData) -> Option<Self> {
        let mut cpd = data.into_constr_pd()?;
        let stake_pkh: Option<Ed25519KeyHash> = cpd
            .take_field(7)
            .and_then(|pd| pd.into_constr_pd())
            .and_then(|mut cpd_spkh| cpd_spkh.take_field(0))
            .and_then(|pd| pd.into_bytes())
            .and_then(|bytes| <[u8; 28]>::try_from(bytes).ok())
            .map(Ed25519KeyHash::from);

        Some(OnChainSwapConfig {
            base: TaggedAssetClass::try_from_pd(cpd.take_field(0)?)?,
            base_amount: TaggedAmount::try_from_pd(cpd.take_field(8)?)?,
            quote: TaggedAssetClass::try_from_pd(cpd.take_field(1)?)?,
            min_quote_amount: TaggedAmount::try_from_pd(cpd.take_field(9)?)?,
            pool_nft: TaggedAssetClass::try_from_pd(cpd.take_field(2)?)?,
            pool_fee_num: cpd.take_field(3)?.into_u64()?,
            ex_fee_per_token_num: cpd.take_field(4)?.into_u64()?.into(),
            ex_fee_per_token_denom: cpd.take_field(5)?.into_u64()?.into(),
            redeemer_pkh: Ed25519KeyHash::from(<[u8; 28]>::try_from(cpd.take_field(6)?.into_bytes()?).ok()?),
            redeemer_stake_pkh: stake_pkh,
        })
    }
}

impl IntoPlutusData for OnChainSwapConfig {
    fn into_pd(self) -> PlutusData {
        let stake_pkh_pd = match self.redeemer_stake_pkh {
            Some(pkh) => PlutusData::ConstrPlutusData(ConstrPlutusData::new(
                0,
                vec![PlutusData::new_bytes(pkh.to_raw_bytes().to_vec())],
            )),
            None => PlutusData::ConstrPlutusData(ConstrPlutusData::new(1, Vec::new())),
        };
        PlutusData::ConstrPlutusData(ConstrPlutusData::new(
            0,
            vec![
                self.base.into_pd(),
                self.quote.into_pd(),
                self.pool_nft.into_pd(),
                self.pool_fee_num.into_pd(),
                PlutusData::Integer(BigInteger::from(self.ex_fee_per_token_num)),
                PlutusData::Integer(BigInteger::from(self.ex_fee_per_token_denom)),
                PlutusData::new_bytes(self.redeemer_pkh.to_raw_bytes().to_vec()),
                stake_pkh_pd,
                self.base_amount.into_pd(),
                self.min_quote_amount.into_pd(),
            ],
        ))
    }
}

/// Builds an order UTxO selling `base_amount` of `base_asset` into the given pool.
/// `slippage_pct` caps how far the execution price may drift from the quoted one.
pub fn build_swap_order(
    pool: &CpmmPool,
    base_asset: AssetClass,
    base_amount: u64,
    slippage_pct: u64,
    ex_fee: u64,
    redeemer_pkh: Ed25519KeyHash,
    redeemer_stake_pkh: Option<Ed25519KeyHash>,
    order_address: Address,
) -> Result<TransactionOutput, EngineError> {
    if slippage_pct > 100 {
        return Err(EngineError::InvalidInput(format!(
            "slippage must be within [0, 100], got {}",
            slippage_pct
        )));
    }
    if base_amount == 0 {
        return Err(EngineError::InvalidInput("base amount must be positive".to_string()));
    }
    let quote_asset = if base_asset == pool.asset_x.untag() {
        pool.asset_y.untag()
    } else if base_asset == pool.asset_y.untag() {
        pool.asset_x.untag()
    } else {
        return Err(EngineError::InvalidInput(format!(
            "asset {} is not traded by pool {}",
            base_asset, pool.id
        )));
    };
    let expected_quote = pool
        .output_amount(TaggedAssetClass::new(base_asset), TaggedAmount::new(base_amount))
        .ok_or(EngineError::DivisionByZero("cpmm_output_amount"))?;
    // Widened so quotes close to u64::MAX survive the percentage scaling.
    let min_quote_amount =
        ((expected_quote.untag() as u128) * ((100 - slippage_pct) as u128) / 100) as u64;
    if min_quote_amount == 0 {
        return Err(EngineError::DivisionByZero("ex_fee_per_token"));
    }
    let ex_fee_per_token_num = (ex_fee as u128) * EX_FEE_PER_TOKEN_DEN / (min_quote_amount as u128);

    let conf = OnChainSwapConfig {
        base: TaggedAssetClass::new(base_asset),
        base_amount: TaggedAmount::new(base_amount),
        quote: TaggedAssetClass::new(quote_asset),
        min_quote_amount: TaggedAmount::new(min_quote_amount),
        pool_nft: TaggedAssetClass::new(AssetClass::from(brook_cardano_lib::Token::from(pool.id))),
        pool_fee_num: *pool.lp_fee.numer(),
        ex_fee_per_token_num,
        ex_fee_per_token_denom: EX_FEE_PER_TOKEN_DEN,
        redeemer_pkh,
        redeemer_stake_pkh,
    };

    let mut coin = SWAP_ORDER_ADA_DEPOSIT + ex_fee;
    let mut ma = MultiAsset::new();
    match base_asset {
        AssetClass::Native => coin += base_amount,
        AssetClass::Token(brook_cardano_lib::Token(policy, name)) => {
            ma.set(policy, name.into(), base_amount);
        }
    }

    Ok(TransactionOutput::new(
        order_address,
        Value::new(coin, ma),
        Some(DatumOption::new_datum(conf.into_pd())),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use cml_chain::address::EnterpriseAddress;
    use cml_chain::assets::MultiAsset;
    use cml_chain::certs::Credential;
    use cml_chain::transaction::{DatumOption, TransactionOutput};
    use cml_chain::Value;
    use cml_crypto::{Ed25519KeyHash, ScriptHash, TransactionHash};

    use brook_cardano_lib::ledger::TryFromLedger;
    use brook_cardano_lib::plutus_data::IntoPlutusData;
    use brook_cardano_lib::{AssetClass, OutputRef, TaggedAmount, TaggedAssetClass, Token};

    use crate::constants::EX_FEE_PER_TOKEN_DEN;
    use crate::data::order::{build_swap_order, OnChainSwapConfig, SwapOrder};
    use crate::data::pool::tests::{gen_pool, token};

    fn token_base_order(coin: u64) -> (TransactionOutput, ScriptHash) {
        let base = token(1, "tok");
        let conf = OnChainSwapConfig {
            base: TaggedAssetClass::new(base),
            base_amount: TaggedAmount::new(1_000),
            quote: TaggedAssetClass::new(AssetClass::Native),
            min_quote_amount: TaggedAmount::new(1),
            pool_nft: TaggedAssetClass::new(token(9, "pool_nft")),
            pool_fee_num: 997,
            ex_fee_per_token_num: 1_000_000,
            ex_fee_per_token_denom: EX_FEE_PER_TOKEN_DEN,
            redeemer_pkh: Ed25519KeyHash::from([1u8; 28]),
            redeemer_stake_pkh: None,
        };
        let script = ScriptHash::from([5u8; 28]);
        let addr = EnterpriseAddress::new(0, Credential::new_script(script)).to_address();
        let mut ma = MultiAsset::new();
        let Token(policy, name) = base.into_token().unwrap();
        ma.set(policy, name.into(), 1_000);
        let out = TransactionOutput::new(
            addr,
            Value::new(coin, ma),
            Some(DatumOption::new_datum(conf.into_pd())),
            None,
        );
        (out, script)
    }

    #[test]
    fn order_below_refund_fee_is_not_admitted() {
        let oref = OutputRef::new(TransactionHash::from([0u8; 32]), 0);
        let (poor, script) = token_base_order(1_500_000);
        assert!(SwapOrder::try_from_ledger(&poor, &(oref, script)).is_none());
        let (funded, script) = token_base_order(2_500_000);
        let parsed = SwapOrder::try_from_ledger(&funded, &(oref, script)).unwrap();
        assert_eq!(parsed.ada_deposit, 2_500_000);
    }

    #[test]
    fn min_quote_survives_large_reserves() {
        let tok = token(1, "tok");
        let pool = gen_pool(AssetClass::Native, tok, 1_000_000_000, u64::MAX - 1);
        let script = ScriptHash::from([5u8; 28]);
        let addr = EnterpriseAddress::new(0, Credential::new_script(script)).to_address();
        let out = build_swap_order(
            &pool,
            AssetClass::Native,
            10_000_000,
            1,
            1_000_000,
            Ed25519KeyHash::from([1u8; 28]),
            None,
            addr,
        )
        .unwrap();
        let oref = OutputRef::new(TransactionHash::from([0u8; 32]), 0);
        let parsed = SwapOrder::try_from_ledger(&out, &(oref, script)).unwrap();
        let expected = pool
            .output_amount(TaggedAssetClass::new(AssetClass::Native), TaggedAmount::new(10_000_000))
            .unwrap()
            .untag();
        assert_eq!(parsed.min_quote_amount.untag(), ((expected as u128) * 99 / 100) as u64);
    }
}
