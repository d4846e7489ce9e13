//! Delegation bookkeeping invoked by staking transactions.
//!
//! The lockup engine has no dependency on the router precompile; it is
//! reached from the Undelegate and Delegate transaction handlers.

pub mod delegation;

pub use delegation::{Delegation, DelegationError, Undelegation};
