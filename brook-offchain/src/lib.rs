pub mod constants;
pub mod creds;
pub mod data;
pub mod deployment;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod pool_math;
pub mod prover;
