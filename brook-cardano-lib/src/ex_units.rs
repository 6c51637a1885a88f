#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn scale(self, factor: u64) -> Self {
        Self {
            mem: self.mem * factor,
            steps: self.steps * factor,
        }
    }
}

impl From<ExUnits> for cml_chain::plutus::ExUnits {
    fn from(value: ExUnits) -> Self {
        Self {
            mem: value.mem,
            steps: value.steps,
            encodings: None,
        }
    }
}
