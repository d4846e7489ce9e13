//! Typed call decoding for the router precompile.
//!
//! The word format itself (32-byte head words, dynamic `bytes` as offset +
//! length + padded tail) belongs to the external ABI contract; this module
//! pins only the two router methods and their canonical signatures:
//!
//! ```text
//! send(address,uint32,bytes,uint256,uint256,uint256,address) -> address
//! retrySend(address,uint256,uint256)
//! ```
//!
//! Decoding validates sizes and integer ranges, nothing more; semantic checks
//! belong to the executor.

use once_cell::sync::Lazy;
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::types::Address;

/// ABI word size in bytes.
const WORD: usize = 32;

/// Decode failure. Charged intrinsic data gas by the executor and surfaced to
/// the VM, which reverts the call frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input of {0} bytes is too short for a method selector")]
    MissingSelector(usize),

    #[error("unknown method selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error("{method}: expected at least {expected} argument bytes, got {actual}")]
    InputTooShort {
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{method}: argument `{argument}` does not fit in {width} bits")]
    UintOutOfRange {
        method: &'static str,
        argument: &'static str,
        width: u32,
    },

    #[error("{method}: bytes argument `{argument}` has an out-of-bounds offset or length")]
    BadBytesRegion {
        method: &'static str,
        argument: &'static str,
    },
}

/// A fully decoded router call.
///
/// Carried by value from parse through pricing to execution, so a stale parse
/// can never be replayed and execution without a successful parse does not
/// typecheck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCall {
    Send {
        to: Address,
        to_shard: u32,
        payload: Vec<u8>,
        gas_budget: U256,
        gas_price: U256,
        gas_limit: u64,
        gas_leftover_to: Address,
    },
    RetrySend {
        msg_addr: Address,
        gas_limit: u64,
        gas_price: U256,
    },
}

/// One router method: canonical signature plus its derived 4-byte selector.
struct MethodSchema {
    name: &'static str,
    selector: [u8; 4],
}

impl MethodSchema {
    fn new(name: &'static str, signature: &'static str) -> Self {
        let digest = Keccak256::digest(signature.as_bytes());
        Self {
            name,
            selector: [digest[0], digest[1], digest[2], digest[3]],
        }
    }
}

struct RouterAbi {
    send: MethodSchema,
    retry_send: MethodSchema,
}

/// The router ABI, built once per process.
static ROUTER_ABI: Lazy<RouterAbi> = Lazy::new(|| RouterAbi {
    send: MethodSchema::new(
        "send",
        "send(address,uint32,bytes,uint256,uint256,uint256,address)",
    ),
    retry_send: MethodSchema::new("retrySend", "retrySend(address,uint256,uint256)"),
});

/// Selector of `send(address,uint32,bytes,uint256,uint256,uint256,address)`.
pub fn send_selector() -> [u8; 4] {
    ROUTER_ABI.send.selector
}

/// Selector of `retrySend(address,uint256,uint256)`.
pub fn retry_send_selector() -> [u8; 4] {
    ROUTER_ABI.retry_send.selector
}

/// Parse a router call from raw precompile input.
pub fn parse_call(input: &[u8]) -> Result<ParsedCall, DecodeError> {
    if input.len() < 4 {
        return Err(DecodeError::MissingSelector(input.len()));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    let args = &input[4..];

    let abi = &*ROUTER_ABI;
    if selector == abi.send.selector {
        decode_send(abi.send.name, args)
    } else if selector == abi.retry_send.selector {
        decode_retry_send(abi.retry_send.name, args)
    } else {
        Err(DecodeError::UnknownSelector(selector))
    }
}

fn decode_send(method: &'static str, args: &[u8]) -> Result<ParsedCall, DecodeError> {
    let reader = WordReader::new(method, args, 7)?;
    Ok(ParsedCall::Send {
        to: reader.address(0),
        to_shard: reader.uint32(1, "toShard")?,
        payload: reader.bytes(2, "payload")?,
        gas_budget: reader.uint256(3),
        gas_price: reader.uint256(4),
        gas_limit: reader.uint64(5, "gasLimit")?,
        gas_leftover_to: reader.address(6),
    })
}

fn decode_retry_send(method: &'static str, args: &[u8]) -> Result<ParsedCall, DecodeError> {
    let reader = WordReader::new(method, args, 3)?;
    Ok(ParsedCall::RetrySend {
        msg_addr: reader.address(0),
        gas_limit: reader.uint64(1, "gasLimit")?,
        gas_price: reader.uint256(2),
    })
}

/// Positional access to the 32-byte head words of an argument block.
struct WordReader<'a> {
    method: &'static str,
    args: &'a [u8],
}

impl<'a> WordReader<'a> {
    /// Checks the head is long enough for `head_words` positional arguments.
    /// Trailing bytes beyond the head are tolerated, as under the external
    /// ABI contract.
    fn new(method: &'static str, args: &'a [u8], head_words: usize) -> Result<Self, DecodeError> {
        let expected = head_words * WORD;
        if args.len() < expected {
            return Err(DecodeError::InputTooShort {
                method,
                expected,
                actual: args.len(),
            });
        }
        Ok(Self { method, args })
    }

    fn word(&self, index: usize) -> &'a [u8] {
        &self.args[index * WORD..(index + 1) * WORD]
    }

    /// An address is the low 20 bytes of its word; the high 12 bytes are
    /// ignored, as under the external ABI contract.
    fn address(&self, index: usize) -> Address {
        Address::from_slice(&self.word(index)[12..])
    }

    fn uint256(&self, index: usize) -> U256 {
        U256::from_big_endian(self.word(index))
    }

    fn uint64(&self, index: usize, argument: &'static str) -> Result<u64, DecodeError> {
        let value = self.uint256(index);
        if value.bits() > 64 {
            return Err(DecodeError::UintOutOfRange {
                method: self.method,
                argument,
                width: 64,
            });
        }
        Ok(value.low_u64())
    }

    fn uint32(&self, index: usize, argument: &'static str) -> Result<u32, DecodeError> {
        let value = self.uint256(index);
        if value.bits() > 32 {
            return Err(DecodeError::UintOutOfRange {
                method: self.method,
                argument,
                width: 32,
            });
        }
        Ok(value.low_u32())
    }

    /// Dynamic `bytes`: the head word is an offset from the start of the
    /// argument block to a length word followed by the data.
    fn bytes(&self, index: usize, argument: &'static str) -> Result<Vec<u8>, DecodeError> {
        let bad = || DecodeError::BadBytesRegion {
            method: self.method,
            argument,
        };

        let offset = self.uint256(index);
        if offset.bits() > 64 {
            return Err(bad());
        }
        let offset = offset.low_u64() as usize;
        let len_end = offset.checked_add(WORD).ok_or_else(bad)?;
        if len_end > self.args.len() {
            return Err(bad());
        }

        let len = U256::from_big_endian(&self.args[offset..len_end]);
        if len.bits() > 64 {
            return Err(bad());
        }
        let len = len.low_u64() as usize;
        let data_end = len_end.checked_add(len).ok_or_else(bad)?;
        if data_end > self.args.len() {
            return Err(bad());
        }

        Ok(self.args[len_end..data_end].to_vec())
    }
}

// =============================================================================
// ENCODING
// =============================================================================
// Callers (and tests) need the inverse mapping to build precompile input.

fn push_address_word(out: &mut Vec<u8>, address: Address) {
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(address.as_bytes());
}

fn push_uint_word(out: &mut Vec<u8>, value: U256) {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    out.extend_from_slice(&word);
}

/// Encode a `send` call. `gas_limit` is carried at its ABI width of 256 bits
/// so out-of-range values can be expressed (and rejected by the decoder).
pub fn encode_send_call(
    to: Address,
    to_shard: u32,
    payload: &[u8],
    gas_budget: U256,
    gas_price: U256,
    gas_limit: U256,
    gas_leftover_to: Address,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 8 * WORD + payload.len());
    out.extend_from_slice(&send_selector());

    push_address_word(&mut out, to);
    push_uint_word(&mut out, U256::from(to_shard));
    // payload tail sits right after the 7-word head
    push_uint_word(&mut out, U256::from(7 * WORD));
    push_uint_word(&mut out, gas_budget);
    push_uint_word(&mut out, gas_price);
    push_uint_word(&mut out, gas_limit);
    push_address_word(&mut out, gas_leftover_to);

    push_uint_word(&mut out, U256::from(payload.len()));
    out.extend_from_slice(payload);
    let pad = (WORD - payload.len() % WORD) % WORD;
    out.resize(out.len() + pad, 0);
    out
}

/// Encode a `retrySend` call.
pub fn encode_retry_send_call(msg_addr: Address, gas_limit: U256, gas_price: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 3 * WORD);
    out.extend_from_slice(&retry_send_selector());
    push_address_word(&mut out, msg_addr);
    push_uint_word(&mut out, gas_limit);
    push_uint_word(&mut out, gas_price);
    out
}
