//! Slot layout for stored outbound messages.
//!
//! Key encoding is protocol. Each stored message occupies seven fixed header
//! words plus a payload region, all under the router account's storage:
//!
//! ```text
//! header key   = msg_addr[20] ‖ 0x01 ‖ 0x00×10 ‖ n        n ∈ 0..=6
//! payload keys = payload_hash, payload_hash + 1, …         (mod 2^256)
//! ```
//!
//! The message address keys the header rather than a transaction hash because
//! one transaction can carry several cross-shard messages, and the components
//! are stored as separate words rather than one blob. Loading re-derives the
//! address and payload hash and rejects any disagreement; that check is the
//! sole integrity guard against state corruption or a fabricated address.

use primitive_types::U256;
use thiserror::Error;
use tracing::{debug, warn};

use crate::router::constants::{
    HEADER_SLOT_COUNT, HEADER_SLOT_MARKER, ROUTER_ADDRESS, SLOT_AMOUNT, SLOT_FROM_GAS_LIMIT,
    SLOT_GAS_BUDGET, SLOT_GAS_PRICE, SLOT_LEFTOVER_PAYLOAD_LEN, SLOT_PAYLOAD_HASH,
    SLOT_TO_NONCE_TO_SHARD,
};
use crate::router::receipt::{message_address, CrossShardReceipt};
use crate::state::StateStore;
use crate::types::{address_hex, word_hex, Address, StateWord};

/// A stored message failed its integrity check on load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("unexpected message address {computed} (should be {expected})")]
    AddressMismatch { computed: String, expected: String },

    #[error("unexpected payload hash {computed} (should be {expected})")]
    HashMismatch { computed: String, expected: String },
}

/// Storage key of the `field`th header word of a message.
#[inline]
pub fn header_slot_key(msg_address: Address, field: u8) -> StateWord {
    debug_assert!(field < HEADER_SLOT_COUNT);
    let mut key = [0u8; 32];
    key[..20].copy_from_slice(msg_address.as_bytes());
    key[20] = HEADER_SLOT_MARKER;
    key[31] = field;
    StateWord::from(key)
}

#[inline]
fn read_be_u64(word: &StateWord, offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word.as_bytes()[offset..offset + 8]);
    u64::from_be_bytes(buf)
}

#[inline]
fn read_be_u32(word: &StateWord, offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&word.as_bytes()[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

/// A receipt bound to its derived identity, ready to persist or just loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub receipt: CrossShardReceipt,
    pub msg_address: Address,
    pub payload_hash: StateWord,
}

impl OutboundMessage {
    pub fn new(receipt: CrossShardReceipt) -> Self {
        let (msg_address, payload_hash) = message_address(&receipt);
        Self {
            receipt,
            msg_address,
            payload_hash,
        }
    }

    /// Write the seven header words in field order, then the payload region.
    pub fn store<S: StateStore>(&self, state: &mut S) {
        let receipt = &self.receipt;

        let mut word = [0u8; 32];
        word[..20].copy_from_slice(receipt.from.as_bytes());
        word[20..28].copy_from_slice(&receipt.gas_limit.to_be_bytes());
        self.set_header(state, SLOT_FROM_GAS_LIMIT, StateWord::from(word));

        let mut word = [0u8; 32];
        word[..20].copy_from_slice(receipt.to.as_bytes());
        word[20..28].copy_from_slice(&receipt.nonce.to_be_bytes());
        word[28..32].copy_from_slice(&receipt.to_shard_id.to_be_bytes());
        self.set_header(state, SLOT_TO_NONCE_TO_SHARD, StateWord::from(word));

        let mut word = [0u8; 32];
        word[..20].copy_from_slice(receipt.gas_leftover_to.as_bytes());
        word[20..28].copy_from_slice(&(receipt.payload.len() as u64).to_be_bytes());
        self.set_header(state, SLOT_LEFTOVER_PAYLOAD_LEN, StateWord::from(word));

        let mut word = [0u8; 32];
        receipt.amount.to_big_endian(&mut word);
        self.set_header(state, SLOT_AMOUNT, StateWord::from(word));

        let mut word = [0u8; 32];
        receipt.gas_budget.to_big_endian(&mut word);
        self.set_header(state, SLOT_GAS_BUDGET, StateWord::from(word));

        let mut word = [0u8; 32];
        receipt.gas_price.to_big_endian(&mut word);
        self.set_header(state, SLOT_GAS_PRICE, StateWord::from(word));

        self.set_header(state, SLOT_PAYLOAD_HASH, self.payload_hash);

        self.store_payload(state);

        debug!(
            msg_address = %address_hex(&self.msg_address),
            payload_len = receipt.payload.len(),
            "stored outbound cross-shard message"
        );
    }

    #[inline]
    fn set_header<S: StateStore>(&self, state: &mut S, field: u8, value: StateWord) {
        state.set_state(ROUTER_ADDRESS, header_slot_key(self.msg_address, field), value);
    }

    fn store_payload<S: StateStore>(&self, state: &mut S) {
        let mut key = U256::from_big_endian(self.payload_hash.as_bytes());
        for chunk in self.receipt.payload.chunks(32) {
            let mut word = [0u8; 32];
            word[..chunk.len()].copy_from_slice(chunk);

            let mut key_bytes = [0u8; 32];
            key.to_big_endian(&mut key_bytes);
            state.set_state(ROUTER_ADDRESS, StateWord::from(key_bytes), StateWord::from(word));

            key = key.overflowing_add(U256::one()).0;
        }
    }

    /// Read a stored message back, verifying its identity.
    ///
    /// The header does not record the source shard: a stored message belongs
    /// to the shard whose state holds it, so the executing shard's id is
    /// stamped into the reconstructed receipt before verification.
    ///
    /// Performs no writes; on mismatch of either the recomputed address or
    /// the recomputed payload hash the load fails and state is untouched.
    pub fn load<S: StateStore>(
        msg_address: Address,
        shard_id: u32,
        state: &S,
    ) -> Result<Self, VerifyError> {
        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_FROM_GAS_LIMIT));
        let from = Address::from_slice(&word.as_bytes()[..20]);
        let gas_limit = read_be_u64(&word, 20);

        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_TO_NONCE_TO_SHARD));
        let to = Address::from_slice(&word.as_bytes()[..20]);
        let nonce = read_be_u64(&word, 20);
        let to_shard_id = read_be_u32(&word, 28);

        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_LEFTOVER_PAYLOAD_LEN));
        let gas_leftover_to = Address::from_slice(&word.as_bytes()[..20]);
        let payload_len = read_be_u64(&word, 20);

        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_AMOUNT));
        let amount = U256::from_big_endian(word.as_bytes());

        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_GAS_BUDGET));
        let gas_budget = U256::from_big_endian(word.as_bytes());

        let word = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_GAS_PRICE));
        let gas_price = U256::from_big_endian(word.as_bytes());

        let payload_hash = state.get_state(ROUTER_ADDRESS, header_slot_key(msg_address, SLOT_PAYLOAD_HASH));
        let payload = load_payload(state, payload_hash, payload_len);

        let message = Self {
            receipt: CrossShardReceipt {
                from,
                to,
                shard_id,
                to_shard_id,
                nonce,
                amount,
                gas_price,
                gas_budget,
                gas_limit,
                gas_leftover_to,
                payload,
            },
            msg_address,
            payload_hash,
        };

        message.verify()?;
        Ok(message)
    }

    fn verify(&self) -> Result<(), VerifyError> {
        let (computed_address, computed_hash) = message_address(&self.receipt);

        if computed_address != self.msg_address {
            warn!(
                computed = %address_hex(&computed_address),
                expected = %address_hex(&self.msg_address),
                "stored message failed address verification"
            );
            return Err(VerifyError::AddressMismatch {
                computed: address_hex(&computed_address),
                expected: address_hex(&self.msg_address),
            });
        }

        if computed_hash != self.payload_hash {
            warn!(
                computed = %word_hex(&computed_hash),
                expected = %word_hex(&self.payload_hash),
                "stored message failed payload hash verification"
            );
            return Err(VerifyError::HashMismatch {
                computed: word_hex(&computed_hash),
                expected: word_hex(&self.payload_hash),
            });
        }

        Ok(())
    }
}

fn load_payload<S: StateStore>(state: &S, payload_hash: StateWord, payload_len: u64) -> Vec<u8> {
    let mut payload = vec![0u8; payload_len as usize];
    let mut key = U256::from_big_endian(payload_hash.as_bytes());
    for chunk in payload.chunks_mut(32) {
        let mut key_bytes = [0u8; 32];
        key.to_big_endian(&mut key_bytes);
        let word = state.get_state(ROUTER_ADDRESS, StateWord::from(key_bytes));
        chunk.copy_from_slice(&word.as_bytes()[..chunk.len()]);
        key = key.overflowing_add(U256::one()).0;
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryState;

    const SHARD: u32 = 2;

    fn sample_receipt(payload: Vec<u8>) -> CrossShardReceipt {
        CrossShardReceipt {
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            shard_id: SHARD,
            to_shard_id: 3,
            nonce: 7,
            amount: U256::from(1_000_000u64),
            gas_price: U256::from(100u64),
            gas_budget: U256::from(200u64),
            gas_limit: 21_000,
            gas_leftover_to: Address::repeat_byte(0x33),
            payload,
        }
    }

    #[test]
    fn test_header_slot_key_shape() {
        let msg_address = Address::repeat_byte(0xAB);
        let key = header_slot_key(msg_address, SLOT_GAS_PRICE);
        let bytes = key.as_bytes();

        assert_eq!(&bytes[..20], msg_address.as_bytes());
        assert_eq!(bytes[20], HEADER_SLOT_MARKER);
        assert_eq!(&bytes[21..31], &[0u8; 10][..]);
        assert_eq!(bytes[31], SLOT_GAS_PRICE);
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut state = MemoryState::new();
        let message = OutboundMessage::new(sample_receipt(b"a payload spanning multiple storage words!".to_vec()));
        message.store(&mut state);

        let loaded = OutboundMessage::load(message.msg_address, SHARD, &state).expect("load verifies");
        assert_eq!(loaded, message);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let mut state = MemoryState::new();
        let message = OutboundMessage::new(sample_receipt(Vec::new()));
        message.store(&mut state);

        // 7 header slots and no payload words
        assert_eq!(state.slot_count(), 7);
        // slot 6 still records the hash of the empty string
        let stored = state.get_state(
            ROUTER_ADDRESS,
            header_slot_key(message.msg_address, SLOT_PAYLOAD_HASH),
        );
        assert_eq!(
            hex::encode(stored.as_bytes()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );

        let loaded = OutboundMessage::load(message.msg_address, SHARD, &state).expect("load verifies");
        assert!(loaded.receipt.payload.is_empty());
    }

    #[test]
    fn test_payload_word_count() {
        let mut state = MemoryState::new();
        // 33 bytes: two payload words, second mostly zero padding
        let message = OutboundMessage::new(sample_receipt(vec![0x5A; 33]));
        message.store(&mut state);
        assert_eq!(state.slot_count(), 7 + 2);
    }

    #[test]
    fn test_load_of_absent_message_fails_verification() {
        let state = MemoryState::new();
        let err = OutboundMessage::load(Address::repeat_byte(0x99), SHARD, &state).unwrap_err();
        assert!(matches!(err, VerifyError::AddressMismatch { .. }));
    }

    #[test]
    fn test_corrupted_payload_fails_verification() {
        let mut state = MemoryState::new();
        let message = OutboundMessage::new(sample_receipt(b"tamper with me".to_vec()));
        message.store(&mut state);

        // flip a byte in the first payload word
        let mut word = state.get_state(ROUTER_ADDRESS, message.payload_hash);
        word.0[0] ^= 0xFF;
        state.set_state(ROUTER_ADDRESS, message.payload_hash, word);

        let err = OutboundMessage::load(message.msg_address, SHARD, &state).unwrap_err();
        match err {
            VerifyError::HashMismatch { computed, expected } => {
                assert_ne!(computed, expected);
                assert!(computed.starts_with("0x") && expected.starts_with("0x"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_corrupted_header_fails_with_address_mismatch() {
        let mut state = MemoryState::new();
        let message = OutboundMessage::new(sample_receipt(b"header tamper".to_vec()));
        message.store(&mut state);

        let key = header_slot_key(message.msg_address, SLOT_AMOUNT);
        let mut word = state.get_state(ROUTER_ADDRESS, key);
        word.0[31] ^= 0x01;
        state.set_state(ROUTER_ADDRESS, key, word);

        let err = OutboundMessage::load(message.msg_address, SHARD, &state).unwrap_err();
        assert!(matches!(err, VerifyError::AddressMismatch { .. }));
    }
}
