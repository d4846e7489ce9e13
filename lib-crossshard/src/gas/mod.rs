//! Gas schedule boundary and intrinsic data pricing.
//!
//! # Formula
//!
//! ```text
//! data cost  = zero_bytes * tx_data_zero + nonzero_bytes * tx_data_non_zero
//! send cost  = sstore_set * payload_len
//! retry cost = 3 * sstore_set
//! ```
//!
//! # Determinism
//!
//! All pricing here is a pure function of its inputs. Intermediate arithmetic
//! is widened to u128; a result that does not fit in u64 is an out-of-gas
//! condition, never a wrap.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Intrinsic gas computation exceeded the 64-bit gas counter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("gas required exceeds allowance")]
pub struct OutOfGas;

/// Chain-wide gas prices consumed by the router.
///
/// Supplied by the gas-schedule collaborator at dispatch time; the defaults
/// mirror the mainnet schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasSchedule {
    /// Cost of a storage write that sets a slot from zero to non-zero.
    pub sstore_set: u64,
    /// Intrinsic cost of one zero byte of call data.
    pub tx_data_zero: u64,
    /// Intrinsic cost of one non-zero byte of call data.
    pub tx_data_non_zero: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            sstore_set: 20_000,
            tx_data_zero: 4,
            tx_data_non_zero: 68,
        }
    }
}

impl GasSchedule {
    /// Intrinsic cost of a byte string, exclusive of the base call cost.
    ///
    /// Prices calls whose decoding failed: the caller still pays for every
    /// byte it shipped, so the decoder cannot be spammed for free.
    pub fn intrinsic_data_gas(&self, data: &[u8]) -> Result<u64, OutOfGas> {
        let zero_bytes = data.iter().filter(|byte| **byte == 0).count() as u128;
        let nonzero_bytes = data.len() as u128 - zero_bytes;

        let cost = zero_bytes * self.tx_data_zero as u128
            + nonzero_bytes * self.tx_data_non_zero as u128;

        u64::try_from(cost).map_err(|_| OutOfGas)
    }
}
