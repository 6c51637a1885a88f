use std::fmt::{Display, Formatter};

use cml_chain::transaction::TransactionInput;
use cml_crypto::TransactionHash;
use num_rational::Ratio;

use brook_cardano_lib::{AssetClass, OutputRef, TaggedAssetClass, Token};

use crate::data::order::PoolNft;

pub mod operation_output;
pub mod order;
pub mod pool;

/// A domain entity paired with its on-chain representation.
#[derive(Debug, Clone)]
pub struct Bundled<T, Bearer>(pub T, pub Bearer);

/// State predicted from a transaction that is not yet confirmed.
#[derive(Debug, Clone)]
pub struct Predicted<T>(pub T);

#[repr(transparent)]
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    derive_more::From,
    derive_more::Into,
    derive_more::Display,
)]
pub struct OnChainOrderId(OutputRef);

impl From<TransactionInput> for OnChainOrderId {
    fn from(value: TransactionInput) -> Self {
        Self(OutputRef::from(value))
    }
}

impl OnChainOrderId {
    pub fn new(tx: TransactionHash, index: u64) -> Self {
        Self((tx, index).into())
    }
}

/// Identity of a pool, its NFT.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, derive_more::From, derive_more::Into)]
pub struct PoolId(Token);

impl Display for PoolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<TaggedAssetClass<PoolNft>> for PoolId {
    type Error = ();
    fn try_from(value: TaggedAssetClass<PoolNft>) -> Result<Self, Self::Error> {
        Ok(PoolId(AssetClass::from(value).into_token().ok_or(())?))
    }
}

/// Executor fee charged per unit of quote asset paid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExecutorFeePerToken(Ratio<u128>, pub AssetClass);

impl ExecutorFeePerToken {
    pub fn new(rational: Ratio<u128>, ac: AssetClass) -> Self {
        Self(rational, ac)
    }
    pub fn get_fee(&self, output_amount: u64) -> u64 {
        ((*self.0.numer()) * (output_amount as u128) / (*self.0.denom())) as u64
    }
    pub fn value(&self) -> Ratio<u128> {
        self.0
    }
}
