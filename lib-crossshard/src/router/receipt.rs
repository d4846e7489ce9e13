//! Cross-shard receipt record and message addressing.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::types::{Address, StateWord};

/// One cross-shard message, emitted on the source shard and later consumed on
/// the destination shard to effect the transfer or call.
///
/// Receipts are collected per block, not per transaction; a single
/// transaction may emit several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossShardReceipt {
    /// Originator on the source shard.
    pub from: Address,
    /// Recipient on the destination shard.
    pub to: Address,
    /// Source shard.
    pub shard_id: u32,
    /// Destination shard.
    pub to_shard_id: u32,
    /// Cross-shard nonce of `from`, consumed when the message is sent.
    pub nonce: u64,
    /// Value transferred.
    pub amount: U256,
    /// Gas price for destination-side execution.
    pub gas_price: U256,
    /// Gas budget for destination-side execution.
    pub gas_budget: U256,
    /// Gas limit for destination-side execution.
    pub gas_limit: u64,
    /// Recipient of any unspent gas budget.
    pub gas_leftover_to: Address,
    /// Opaque call data for the destination shard.
    pub payload: Vec<u8>,
}

/// Keccak-256 of the raw payload bytes.
///
/// Also the first storage key of the message's payload region.
pub fn payload_hash(payload: &[u8]) -> StateWord {
    StateWord::from_slice(Keccak256::digest(payload).as_slice())
}

/// Derive the message address and payload hash for a receipt.
///
/// The address is content-derived from every user-supplied field except the
/// gas parameters, so `retrySend` can re-price a stored message without
/// changing its identity. The byte sequence hashed below is consensus
/// protocol; reordering or rewidening any field changes every previously
/// computed address.
pub fn message_address(receipt: &CrossShardReceipt) -> (Address, StateWord) {
    let payload_hash = payload_hash(&receipt.payload);

    let mut hasher = Keccak256::new();
    hasher.update([0xFF]);
    hasher.update(receipt.from.as_bytes());
    hasher.update(receipt.to.as_bytes());
    hasher.update(receipt.shard_id.to_be_bytes());
    hasher.update(receipt.to_shard_id.to_be_bytes());
    hasher.update(payload_hash.as_bytes());
    let mut amount = [0u8; 32];
    receipt.amount.to_big_endian(&mut amount);
    hasher.update(amount);
    hasher.update(receipt.nonce.to_be_bytes());

    let digest = hasher.finalize();
    (Address::from_slice(&digest.as_slice()[12..]), payload_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_receipt() -> CrossShardReceipt {
        CrossShardReceipt {
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            shard_id: 2,
            to_shard_id: 3,
            nonce: 7,
            amount: U256::from(1_000_000u64),
            gas_price: U256::from(100u64),
            gas_budget: U256::from(200u64),
            gas_limit: 21_000,
            gas_leftover_to: Address::repeat_byte(0x33),
            payload: b"hello cross shard".to_vec(),
        }
    }

    #[test]
    fn test_message_address_is_pinned() {
        // Golden vector: any drift here is a consensus break.
        let (address, hash) = message_address(&sample_receipt());
        assert_eq!(
            hex::encode(address.as_bytes()),
            "7fc2dc247f9c13e1390e818c4772bf9a1eeb0b69"
        );
        assert_eq!(
            hex::encode(hash.as_bytes()),
            "6660d8fc6a23319364143f098a61b9f0535d4cfe0f4e8590f2c3b56aae15f9fa"
        );
    }

    #[test]
    fn test_address_invariant_under_gas_fields() {
        let base = sample_receipt();
        let (address, _) = message_address(&base);

        let mut repriced = base;
        repriced.gas_price = U256::from(999_999u64);
        repriced.gas_budget = U256::from(123_456u64);
        repriced.gas_limit = 1;
        repriced.gas_leftover_to = Address::zero();
        let (repriced_address, _) = message_address(&repriced);

        assert_eq!(address, repriced_address);
    }

    #[test]
    fn test_address_depends_on_identity_fields() {
        let base = sample_receipt();
        let (address, _) = message_address(&base);

        for mutate in [
            (|r: &mut CrossShardReceipt| r.from = Address::repeat_byte(0xAA))
                as fn(&mut CrossShardReceipt),
            |r| r.to = Address::repeat_byte(0xBB),
            |r| r.shard_id += 1,
            |r| r.to_shard_id += 1,
            |r| r.nonce += 1,
            |r| r.amount += U256::one(),
            |r| r.payload.push(0),
        ] {
            let mut changed = base.clone();
            mutate(&mut changed);
            let (changed_address, _) = message_address(&changed);
            assert_ne!(address, changed_address, "field must affect the address");
        }
    }

    #[test]
    fn test_empty_payload_hash() {
        // Keccak-256 of the empty string.
        assert_eq!(
            hex::encode(payload_hash(b"").as_bytes()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
