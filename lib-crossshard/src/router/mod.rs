//! Cross-shard router precompile.
//!
//! A built-in contract at a reserved account that lets any contract or
//! externally-owned account emit a message bound for another shard. The
//! precompile decodes a typed call, derives a deterministic message address,
//! persists the message under a fixed slot layout, and emits a cross-shard
//! receipt for the block; a second entry point re-emits a stored message with
//! new gas parameters.
//!
//! Module map:
//!
//! - [`constants`]: reserved account, nonce namespace key, slot marker
//! - [`abi`]: selector dispatch and typed argument decoding
//! - [`receipt`]: the cross-shard receipt record and message addressing
//! - [`slots`]: the storage codec for stored messages
//! - [`executor`]: `send` / `retrySend` orchestration and gas pricing
//!
//! Every byte layout in here is a consensus rule: a disagreement between two
//! validators forks the chain.

pub mod abi;
pub mod constants;
pub mod executor;
pub mod receipt;
pub mod slots;

pub use abi::{parse_call, DecodeError, ParsedCall};
pub use constants::{CROSS_SHARD_NONCE_KEY, ROUTER_ADDRESS};
pub use executor::{
    call_router, decode_failure_gas, required_gas, run, CxReceiptSink, RouterContext, RouterError,
    RouterOutcome,
};
pub use receipt::{message_address, payload_hash, CrossShardReceipt};
pub use slots::{header_slot_key, OutboundMessage, VerifyError};
