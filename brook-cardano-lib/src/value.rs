use cml_chain::Value;

use crate::AssetClass;
use crate::Token;

pub trait ValueExtension {
    fn amount_of(&self, ac: AssetClass) -> Option<u64>;
    /// Adds `amount` of `ac` without checking for overflow.
    fn add_unsafe(&mut self, ac: AssetClass, amount: u64);
}

impl ValueExtension for Value {
    fn amount_of(&self, ac: AssetClass) -> Option<u64> {
        match ac {
            AssetClass::Native => Some(self.coin),
            AssetClass::Token(Token(policy, an)) => self.multiasset.get(&policy, &an.into()),
        }
    }

    fn add_unsafe(&mut self, ac: AssetClass, amount: u64) {
        match ac {
            AssetClass::Native => self.coin += amount,
            AssetClass::Token(Token(policy, an)) => {
                let an = cml_chain::assets::AssetName::from(an);
                let accumulated = self.multiasset.get(&policy, &an).unwrap_or(0) + amount;
                self.multiasset.set(policy, an, accumulated);
            }
        }
    }
}
