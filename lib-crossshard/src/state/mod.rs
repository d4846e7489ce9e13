//! State-database boundary.
//!
//! The router core reads and writes 32-byte storage words and consumes
//! per-caller cross-shard nonces; the database itself (journalling,
//! commit/revert, trie layout) belongs to the outer VM. This module pins that
//! seam as a trait plus an in-memory implementation for tests.

use std::collections::HashMap;

use crate::types::{Address, StateWord};

/// VM state access used by the router core.
///
/// All mutations are sequenced by the containing transaction and journalled
/// by the outer VM; the core performs no locking and never shares a store
/// across tasks.
pub trait StateStore {
    /// Read a storage word. Slots never written read as the zero word.
    fn get_state(&self, address: Address, key: StateWord) -> StateWord;

    /// Write a storage word.
    fn set_state(&mut self, address: Address, key: StateWord, value: StateWord);

    /// Return the caller's current cross-shard nonce and advance it.
    ///
    /// Two sends from the same caller within one transaction must observe
    /// distinct, consecutive values; the increment is journalled with the
    /// transaction like any other state write.
    fn take_cross_shard_nonce(&mut self, address: Address) -> u64;
}

/// HashMap-backed store for unit and integration tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    slots: HashMap<(Address, StateWord), StateWord>,
    nonces: HashMap<Address, u64>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots ever written, across all accounts.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl StateStore for MemoryState {
    fn get_state(&self, address: Address, key: StateWord) -> StateWord {
        self.slots
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    fn set_state(&mut self, address: Address, key: StateWord, value: StateWord) {
        self.slots.insert((address, key), value);
    }

    fn take_cross_shard_nonce(&mut self, address: Address) -> u64 {
        let nonce = self.nonces.entry(address).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }
}
