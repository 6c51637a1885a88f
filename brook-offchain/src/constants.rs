/// Denominator of the pool fee. A pool with `fee_num = 997` charges 0.3% on every swap input.
pub const FEE_DEN: u64 = 1000;

/// Total emission of LP tokens at pool creation. Circulating liquidity
/// is always `MAX_LP_CAP - lp_tokens_locked_in_pool`.
pub const MAX_LP_CAP: u64 = 0x7fffffffffffffff;

/// Denominator of the executor fee rate carried in swap order datums.
pub const EX_FEE_PER_TOKEN_DEN: u128 = 1_000_000_000_000_000;

/// Emission of the tradable token minted alongside a new pool.
pub const TRADABLE_TOKEN_SUPPLY: u64 = 1_000_000_000_000_000;

/// LP tokens paid out to the pool creator at seeding.
pub const CREATOR_LP_SLICE: u64 = 1000;

/// Flat fee (in lovelace) withheld from the order value on refund.
pub const REFUND_FEE_LOVELACE: u64 = 2_000_000;

/// Lovelace attached to every swap order on top of the traded value.
pub const SWAP_ORDER_ADA_DEPOSIT: u64 = 2_000_000;

/// Minimal lovelace an order UTxO must carry to be considered executable.
pub const MIN_SAFE_ADA_VALUE: u64 = 1_000_000;

/// Lovelace locked in a token/token pool UTxO to satisfy min-ADA.
pub const TOKEN_PAIR_POOL_LOVELACE: u64 = 4_000_000;

/// Lovelace added back to the reward output per executed order.
pub const EXECUTOR_REBATE_NATIVE_PAIR: u64 = 100;
pub const EXECUTOR_REBATE_TOKEN_PAIR: u64 = 100_000;
