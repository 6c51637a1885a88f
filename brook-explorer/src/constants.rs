pub const MAINNET_PREFIX: &str = "mainnet";
pub const PREPROD_PREFIX: &str = "preprod";

pub const CONFIRMATION_POLL_DELAY_SECS: u64 = 5;
pub const MAX_CONFIRMATION_POLLS: u32 = 120;
