use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::num::ParseIntError;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use cml_chain::plutus::PlutusData;
use cml_chain::transaction::TransactionInput;
use cml_chain::PolicyId;
use cml_crypto::{RawBytesEncoding, TransactionHash};
use derivative::Derivative;

use crate::plutus_data::{ConstrPlutusDataExtension, IntoPlutusData, PlutusDataExtension};
use crate::types::TryFromPData;

pub mod address;
pub mod collateral;
pub mod ex_units;
pub mod hash;
pub mod ledger;
pub mod output;
pub mod plutus_data;
pub mod protocol_params;
pub mod transaction;
pub mod types;
pub mod value;

/// An asset name as stored on-chain: up to 32 bytes. We keep the original
/// length alongside a padded buffer so the type stays `Copy`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AssetName(u8, [u8; 32]);

impl AssetName {
    pub fn utf8_unsafe(tn: String) -> Self {
        Self::try_from(tn.into_bytes()).expect("asset name exceeds 32 bytes")
    }

    pub fn bytes(&self) -> &[u8] {
        &self.1[..self.0 as usize]
    }

    pub fn padded_bytes(&self) -> [u8; 32] {
        self.1
    }
}

impl Display for AssetName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(hex::encode(self.bytes()).as_str())
    }
}

impl From<(u8, [u8; 32])> for AssetName {
    fn from((len, raw): (u8, [u8; 32])) -> Self {
        Self(len, raw)
    }
}

impl From<AssetName> for cml_chain::assets::AssetName {
    fn from(value: AssetName) -> Self {
        cml_chain::assets::AssetName {
            inner: value.bytes().to_vec(),
            encodings: None,
        }
    }
}

impl From<cml_chain::assets::AssetName> for AssetName {
    fn from(value: cml_chain::assets::AssetName) -> Self {
        let mut padded = [0u8; 32];
        padded[..value.inner.len()].copy_from_slice(&value.inner);
        Self(value.inner.len() as u8, padded)
    }
}

impl TryFrom<Vec<u8>> for AssetName {
    type Error = ();
    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() > 32 {
            return Err(());
        }
        let mut padded = [0u8; 32];
        padded[..value.len()].copy_from_slice(&value);
        Ok(Self(value.len() as u8, padded))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Token(pub PolicyId, pub AssetName);

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AssetClass {
    Native,
    Token(Token),
}

impl AssetClass {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetClass::Native)
    }

    pub fn into_token(self) -> Option<Token> {
        match self {
            AssetClass::Token(tkn) => Some(tkn),
            AssetClass::Native => None,
        }
    }
}

impl From<Token> for AssetClass {
    fn from(value: Token) -> Self {
        AssetClass::Token(value)
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Native => f.write_str("lovelace"),
            AssetClass::Token(tkn) => tkn.fmt(f),
        }
    }
}

impl<T> From<TaggedAssetClass<T>> for AssetClass {
    fn from(value: TaggedAssetClass<T>) -> Self {
        value.0
    }
}

impl TryFromPData for AssetClass {
    fn try_from_pd(data: PlutusData) -> Option<Self> {
        let mut cpd = data.into_constr_pd()?;
        let policy_bytes = cpd.take_field(0)?.into_bytes()?;
        // The native asset is encoded as a pair of empty byte strings.
        if policy_bytes.is_empty() {
            return Some(AssetClass::Native);
        }
        let policy_id = PolicyId::from_raw_bytes(&policy_bytes).ok()?;
        let asset_name = AssetName::try_from(cpd.take_field(1)?.into_bytes()?).ok()?;
        Some(AssetClass::Token(Token(policy_id, asset_name)))
    }
}

impl IntoPlutusData for AssetClass {
    fn into_pd(self) -> PlutusData {
        let (policy_bytes, name_bytes) = match self {
            AssetClass::Native => (vec![], vec![]),
            AssetClass::Token(Token(policy, name)) => {
                (policy.to_raw_bytes().to_vec(), name.bytes().to_vec())
            }
        };
        PlutusData::ConstrPlutusData(cml_chain::plutus::ConstrPlutusData::new(
            0,
            vec![PlutusData::new_bytes(policy_bytes), PlutusData::new_bytes(name_bytes)],
        ))
    }
}

#[repr(transparent)]
#[derive(Derivative)]
#[derivative(
    Debug(bound = ""),
    Copy(bound = ""),
    Clone(bound = ""),
    Eq(bound = ""),
    PartialEq(bound = ""),
    Ord(bound = ""),
    PartialOrd(bound = ""),
    Hash(bound = "")
)]
pub struct TaggedAssetClass<T>(AssetClass, PhantomData<T>);

impl<T> TaggedAssetClass<T> {
    pub fn new(ac: AssetClass) -> Self {
        Self(ac, PhantomData)
    }

    pub fn is_native(&self) -> bool {
        self.0.is_native()
    }

    pub fn untag(self) -> AssetClass {
        self.0
    }
}

impl<T> TryFromPData for TaggedAssetClass<T> {
    fn try_from_pd(data: PlutusData) -> Option<Self> {
        Some(Self(AssetClass::try_from_pd(data)?, PhantomData))
    }
}

impl<T> IntoPlutusData for TaggedAssetClass<T> {
    fn into_pd(self) -> PlutusData {
        self.0.into_pd()
    }
}

#[repr(transparent)]
#[derive(Derivative)]
#[derivative(
    Debug(bound = ""),
    Copy(bound = ""),
    Clone(bound = ""),
    Eq(bound = ""),
    PartialEq(bound = ""),
    Ord(bound = ""),
    PartialOrd(bound = ""),
    Hash(bound = "")
)]
pub struct TaggedAmount<T>(u64, PhantomData<T>);

impl<T> TaggedAmount<T> {
    pub fn new(value: u64) -> Self {
        Self(value, PhantomData)
    }

    pub fn untag(self) -> u64 {
        self.0
    }

    pub fn retag<T1>(self) -> TaggedAmount<T1> {
        TaggedAmount(self.0, PhantomData)
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self::new)
    }

    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self::new)
    }
}

impl<T> Add for TaggedAmount<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0, PhantomData)
    }
}

impl<T> Sub for TaggedAmount<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0, PhantomData)
    }
}

impl<T> AddAssign for TaggedAmount<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl<T> SubAssign for TaggedAmount<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl<T> AsMut<u64> for TaggedAmount<T> {
    fn as_mut(&mut self) -> &mut u64 {
        &mut self.0
    }
}

impl<T> TryFromPData for TaggedAmount<T> {
    fn try_from_pd(data: PlutusData) -> Option<Self> {
        Some(Self(data.into_u64()?, PhantomData))
    }
}

impl<T> IntoPlutusData for TaggedAmount<T> {
    fn into_pd(self) -> PlutusData {
        self.0.into_pd()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OutputRef(TransactionHash, u64);

impl OutputRef {
    pub fn new(hash: TransactionHash, index: u64) -> Self {
        Self(hash, index)
    }

    pub fn tx_hash(&self) -> TransactionHash {
        self.0
    }

    pub fn index(&self) -> u64 {
        self.1
    }
}

impl From<(TransactionHash, u64)> for OutputRef {
    fn from((hash, index): (TransactionHash, u64)) -> Self {
        Self(hash, index)
    }
}

impl From<TransactionInput> for OutputRef {
    fn from(value: TransactionInput) -> Self {
        Self(value.transaction_id, value.index)
    }
}

impl From<OutputRef> for TransactionInput {
    fn from(OutputRef(hash, index): OutputRef) -> Self {
        TransactionInput::new(hash, index)
    }
}

impl Display for OutputRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.0.to_hex(), self.1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseOutputRefError {
    #[error("malformed output reference, expected <tx_hash>#<index>")]
    Malformed,
    #[error("invalid tx hash")]
    InvalidHash,
    #[error("invalid output index: {0}")]
    InvalidIndex(#[from] ParseIntError),
}

impl FromStr for OutputRef {
    type Err = ParseOutputRefError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (raw_hash, raw_index) = s.split_once('#').ok_or(ParseOutputRefError::Malformed)?;
        let hash = TransactionHash::from_hex(raw_hash).map_err(|_| ParseOutputRefError::InvalidHash)?;
        Ok(Self(hash, raw_index.parse()?))
    }
}

impl TryFrom<&str> for OutputRef {
    type Error = ParseOutputRefError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for OutputRef {
    type Error = ParseOutputRefError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl serde::Serialize for OutputRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> serde::Deserialize<'de> for OutputRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

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
    serde::Serialize,
    serde::Deserialize,
    derive_more::From,
    derive_more::Into,
)]
pub struct NetworkId(u8);
