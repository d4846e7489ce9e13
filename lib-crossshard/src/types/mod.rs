//! Shared scalar types for the router and staking cores.
//!
//! Everything that crosses a consensus boundary is expressed in these fixed
//! widths: 20-byte addresses, 32-byte state words, 64-bit epochs and nonces.

use primitive_types::{H160, H256};

/// 20-byte account or contract address.
pub type Address = H160;

/// 32-byte word as read from and written to the VM key/value state store.
pub type StateWord = H256;

/// Protocol epoch counter (monotonically increasing).
pub type Epoch = u64;

/// Render a 20-byte address as 0x-prefixed lowercase hex.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Render a 32-byte state word as 0x-prefixed lowercase hex.
pub fn word_hex(word: &StateWord) -> String {
    format!("0x{}", hex::encode(word.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_is_full_width() {
        let address = Address::from_low_u64_be(0xF8);
        let rendered = address_hex(&address);
        assert_eq!(rendered.len(), 2 + 40);
        assert!(rendered.starts_with("0x000000"));
        assert!(rendered.ends_with("f8"));
    }

    #[test]
    fn test_word_hex_round_trips() {
        let word = StateWord::repeat_byte(0xAB);
        assert_eq!(word_hex(&word), format!("0x{}", "ab".repeat(32)));
    }
}
