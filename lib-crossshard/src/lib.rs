//! Cross-shard messaging precompile and delegation lockup accounting.
//!
//! Two consensus-critical cores of a sharded proof-of-stake chain's execution
//! path:
//!
//! - the [`router`] precompile, which turns a typed `send`/`retrySend` call
//!   into a content-addressed message persisted in VM state plus a
//!   cross-shard receipt for the block;
//! - the [`staking`] lockup engine, which tracks per-delegation principal and
//!   pending undelegations and decides when locked tokens become
//!   withdrawable.
//!
//! Both must be byte-exact and deterministic across all validators. The state
//! database, gas schedule and receipt collector are external collaborators,
//! pinned here only as boundary traits ([`state::StateStore`],
//! [`gas::GasSchedule`], [`router::CxReceiptSink`]).

pub mod gas;
pub mod router;
pub mod staking;
pub mod state;
pub mod types;

// Re-export core types for convenience
pub use gas::{GasSchedule, OutOfGas};
pub use router::{
    call_router, message_address, parse_call, required_gas, run, CrossShardReceipt, CxReceiptSink,
    DecodeError, OutboundMessage, ParsedCall, RouterContext, RouterError, RouterOutcome,
    VerifyError, CROSS_SHARD_NONCE_KEY, ROUTER_ADDRESS,
};
pub use staking::{Delegation, DelegationError, Undelegation};
pub use state::{MemoryState, StateStore};
pub use types::{Address, Epoch, StateWord};
