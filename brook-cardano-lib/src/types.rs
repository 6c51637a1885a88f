use cml_chain::plutus::PlutusData;

/// Decoding of a domain value from an on-chain datum.
/// Returns `None` when the datum does not have the expected shape.
pub trait TryFromPData: Sized {
    fn try_from_pd(data: PlutusData) -> Option<Self>;
}
