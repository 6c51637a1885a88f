use num_rational::Ratio;
use primitive_types::U512;

use brook_cardano_lib::{TaggedAmount, TaggedAssetClass};

use crate::data::order::{Base, Quote};
use crate::data::pool::{Rx, Ry};

/// Constant-product swap output. The fee is charged on the input:
/// `quote = reserves_out * base * fee_num / (reserves_in * fee_den + base * fee_num)`.
/// Intermediate products exceed 128 bits for realistic reserves, so the math
/// is carried out in 512-bit integers.
pub fn cpmm_output_amount(
    asset_x: TaggedAssetClass<Rx>,
    reserves_x: TaggedAmount<Rx>,
    reserves_y: TaggedAmount<Ry>,
    base_asset: TaggedAssetClass<Base>,
    base_amount: TaggedAmount<Base>,
    lp_fee: Ratio<u64>,
) -> Option<TaggedAmount<Quote>> {
    let (reserves_in, reserves_out) = if base_asset.untag() == asset_x.untag() {
        (reserves_x.untag(), reserves_y.untag())
    } else {
        (reserves_y.untag(), reserves_x.untag())
    };
    let base = U512::from(base_amount.untag());
    let fee_num = U512::from(*lp_fee.numer());
    let fee_den = U512::from(*lp_fee.denom());
    let denominator = U512::from(reserves_in) * fee_den + base * fee_num;
    if denominator.is_zero() {
        return None;
    }
    let quote = U512::from(reserves_out) * base * fee_num / denominator;
    // quote is strictly less than reserves_out, so it always fits into u64.
    Some(TaggedAmount::new(quote.as_u64()))
}

#[cfg(test)]
mod tests {
    use num_rational::Ratio;

    use brook_cardano_lib::{AssetClass, AssetName, TaggedAmount, TaggedAssetClass, Token};
    use cml_chain::PolicyId;

    use super::cpmm_output_amount;

    fn token(tag: u8, name: &str) -> AssetClass {
        AssetClass::Token(Token(
            PolicyId::from([tag; 28]),
            AssetName::utf8_unsafe(name.to_string()),
        ))
    }

    #[test]
    fn output_amount_matches_known_quote() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let quote = cpmm_output_amount(
            asset_x,
            TaggedAmount::new(1_000_000_000),
            TaggedAmount::new(1_000_000_000_000),
            TaggedAssetClass::new(AssetClass::Native),
            TaggedAmount::new(10_000_000),
            Ratio::new_raw(997, 1000),
        )
        .unwrap();
        assert_eq!(quote.untag(), 9_871_580_343);
    }

    #[test]
    fn output_amount_reverse_side() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let base = TaggedAssetClass::new(token(1, "tok"));
        let quote = cpmm_output_amount(
            asset_x,
            TaggedAmount::new(500_000_000),
            TaggedAmount::new(2_000_000_000),
            base,
            TaggedAmount::new(25_000),
            Ratio::new_raw(997, 1000),
        )
        .unwrap();
        assert_eq!(quote.untag(), 6231);
    }

    #[test]
    fn dust_input_yields_zero() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let quote = cpmm_output_amount(
            asset_x,
            TaggedAmount::new(1_000_000_000_000),
            TaggedAmount::new(1_000),
            TaggedAssetClass::new(AssetClass::Native),
            TaggedAmount::new(1),
            Ratio::new_raw(997, 1000),
        )
        .unwrap();
        assert_eq!(quote.untag(), 0);
    }

    #[test]
    fn empty_pool_has_no_price() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let quote = cpmm_output_amount(
            asset_x,
            TaggedAmount::new(0),
            TaggedAmount::new(0),
            TaggedAssetClass::new(AssetClass::Native),
            TaggedAmount::new(0),
            Ratio::new_raw(997, 1000),
        );
        assert!(quote.is_none());
    }

    #[test]
    fn swap_preserves_constant_product() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let cases = [
            (1_000_000_000u64, 1_000_000_000_000u64, 10_000_000u64),
            (500_000_000, 2_000_000_000, 25_000),
            (1_000_000, 1_000_000, 999_999),
            (7, 11, 3),
        ];
        for (rx, ry, input) in cases {
            let quote = cpmm_output_amount(
                asset_x,
                TaggedAmount::new(rx),
                TaggedAmount::new(ry),
                TaggedAssetClass::new(AssetClass::Native),
                TaggedAmount::new(input),
                Ratio::new_raw(997, 1000),
            )
            .unwrap()
            .untag();
            let product_before = (rx as u128) * (ry as u128);
            let product_after = ((rx + input) as u128) * ((ry - quote) as u128);
            assert!(product_after >= product_before);
        }
    }

    #[test]
    fn output_is_monotone_in_input_and_fee() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        let quote = |input: u64, fee_num: u64| {
            cpmm_output_amount(
                asset_x,
                TaggedAmount::new(1_000_000_000),
                TaggedAmount::new(1_000_000_000_000),
                TaggedAssetClass::new(AssetClass::Native),
                TaggedAmount::new(input),
                Ratio::new_raw(fee_num, 1000),
            )
            .unwrap()
            .untag()
        };
        assert!(quote(20_000_000, 997) > quote(10_000_000, 997));
        assert!(quote(10_000_000, 997) > quote(10_000_000, 995));
    }

    #[test]
    fn output_never_drains_reserves() {
        let asset_x = TaggedAssetClass::new(AssetClass::Native);
        for input in [1u64, 1_000, 10_000_000, u64::MAX / 2] {
            let quote = cpmm_output_amount(
                asset_x,
                TaggedAmount::new(1_000_000),
                TaggedAmount::new(3_000_000),
                TaggedAssetClass::new(AssetClass::Native),
                TaggedAmount::new(input),
                Ratio::new_raw(997, 1000),
            )
            .unwrap();
            assert!(quote.untag() < 3_000_000);
        }
    }
}
