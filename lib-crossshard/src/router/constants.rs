//! Reserved router constants.
//!
//! Everything in this module is consensus protocol. The reserved account, the
//! nonce namespace key, the header slot marker and the header field indices
//! define byte layouts that every validator must reproduce exactly; never
//! inline these values in business logic.

use once_cell::sync::Lazy;
use primitive_types::H160;
use sha3::{Digest, Keccak256};

use crate::types::{Address, StateWord};

/// The router precompile's reserved account: nineteen zero bytes then 0xF8.
pub const ROUTER_ADDRESS: Address = H160([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xF8,
]);

const _: () = assert!(
    ROUTER_ADDRESS.0[19] == 0xF8,
    "router account low byte is a consensus rule"
);

/// Version tag hashed into [`CROSS_SHARD_NONCE_KEY`].
const CROSS_SHARD_NONCE_TAG: &str = "Harmony/CrossShardNonce/v1";

/// Namespace key under which the state database keeps per-account cross-shard
/// nonces.
///
/// The router core never reads or writes this key itself; it is exported for
/// the state-database collaborator.
pub static CROSS_SHARD_NONCE_KEY: Lazy<StateWord> = Lazy::new(|| {
    StateWord::from_slice(Keccak256::digest(CROSS_SHARD_NONCE_TAG.as_bytes()).as_slice())
});

/// Marker byte at offset 20 of every header slot key.
///
/// Keeps the outbound-message header region disjoint from a future
/// received-messages map stored at the same account.
pub const HEADER_SLOT_MARKER: u8 = 0x01;

const _: () = assert!(
    HEADER_SLOT_MARKER == 0x01,
    "header slot marker is a consensus rule"
);

// =============================================================================
// HEADER FIELD INDICES
// =============================================================================
// Word offsets of the fixed header slots of a stored message. The index is the
// final byte of the slot key.

/// `from[20] ‖ gas_limit(BE 8) ‖ 0×4`
pub const SLOT_FROM_GAS_LIMIT: u8 = 0;
/// `to[20] ‖ nonce(BE 8) ‖ to_shard_id(BE 4)`
pub const SLOT_TO_NONCE_TO_SHARD: u8 = 1;
/// `gas_leftover_to[20] ‖ payload_len(BE 8) ‖ 0×4`
pub const SLOT_LEFTOVER_PAYLOAD_LEN: u8 = 2;
/// `amount(BE 32)`
pub const SLOT_AMOUNT: u8 = 3;
/// `gas_budget(BE 32)`
pub const SLOT_GAS_BUDGET: u8 = 4;
/// `gas_price(BE 32)`
pub const SLOT_GAS_PRICE: u8 = 5;
/// `payload_hash(32)`
pub const SLOT_PAYLOAD_HASH: u8 = 6;

/// Number of fixed header slots per stored message.
pub const HEADER_SLOT_COUNT: u8 = 7;

const _: () = assert!(SLOT_PAYLOAD_HASH + 1 == HEADER_SLOT_COUNT);
