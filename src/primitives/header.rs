//! Block header primitive.
//!
//! Thora headers keep the Ethereum header shape so that hashes and seal
//! hashes match the rest of the ecosystem bit for bit:
//!
//! ```text
//! Header (RLP list, in this order)
//! ├── parent_hash: B256
//! ├── ommers_hash: B256        (always the empty-list hash)
//! ├── coinbase: Address        (vote target, zero on checkpoints)
//! ├── state_root: B256
//! ├── transactions_root: B256
//! ├── receipts_root: B256
//! ├── logs_bloom: Bloom
//! ├── difficulty: u64          (1 = out-of-turn, 2 = in-turn)
//! ├── number: u64
//! ├── gas_limit: u64
//! ├── gas_used: u64
//! ├── timestamp: u64
//! ├── extra_data: Bytes        (vanity | checkpoint signers | seal)
//! ├── mix_hash: B256
//! ├── nonce: B64               (vote direction)
//! └── base_fee_per_gas: Option<u64>
//! ```

use alloy_primitives::{b256, keccak256, Address, Bloom, Bytes, B256, B64};
use alloy_rlp::{BufMut, Encodable};

/// Keccak hash of the RLP encoding of an empty list, i.e. a block without ommers.
pub const EMPTY_OMMER_ROOT_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// An execution block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Hash of the ommers list.
    pub ommers_hash: B256,
    /// Beneficiary address, reused as the target of an in-flight vote.
    pub coinbase: Address,
    /// State root after executing the block.
    pub state_root: B256,
    /// Root of the transaction trie.
    pub transactions_root: B256,
    /// Root of the receipt trie.
    pub receipts_root: B256,
    /// Bloom filter over the block's logs.
    pub logs_bloom: Bloom,
    /// In-turn or out-of-turn marker.
    pub difficulty: u64,
    /// Block height.
    pub number: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Gas consumed by the block.
    pub gas_used: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Vanity, optional checkpoint signer list and the producer's seal.
    pub extra_data: Bytes,
    /// Reserved, must be zero.
    pub mix_hash: B256,
    /// Vote direction for the coinbase.
    pub nonce: B64,
    /// EIP-1559 base fee, present once the fork is active.
    pub base_fee_per_gas: Option<u64>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: B256::ZERO,
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            coinbase: Address::ZERO,
            state_root: B256::ZERO,
            transactions_root: B256::ZERO,
            receipts_root: B256::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty: 0,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: None,
        }
    }
}

impl Header {
    /// Compute the block hash, `keccak256(rlp(header))`.
    ///
    /// Not cached: callers that need the hash repeatedly should keep it.
    pub fn hash_slow(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        keccak256(&buf)
    }

    /// RLP-encode the header with `extra` standing in for the extra-data field.
    ///
    /// The seal hash is computed over this encoding with the trailing
    /// signature stripped from `extra`.
    pub fn encode_with_extra(&self, extra: &[u8], out: &mut dyn BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length(extra) }.encode(out);
        self.parent_hash.encode(out);
        self.ommers_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.transactions_root.encode(out);
        self.receipts_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.timestamp.encode(out);
        extra.encode(out);
        self.mix_hash.encode(out);
        self.nonce.encode(out);
        if let Some(base_fee) = self.base_fee_per_gas {
            base_fee.encode(out);
        }
    }

    fn payload_length(&self, extra: &[u8]) -> usize {
        let mut length = 0;
        length += self.parent_hash.length();
        length += self.ommers_hash.length();
        length += self.coinbase.length();
        length += self.state_root.length();
        length += self.transactions_root.length();
        length += self.receipts_root.length();
        length += self.logs_bloom.length();
        length += self.difficulty.length();
        length += self.number.length();
        length += self.gas_limit.length();
        length += self.gas_used.length();
        length += self.timestamp.length();
        length += extra.length();
        length += self.mix_hash.length();
        length += self.nonce.length();
        if let Some(base_fee) = self.base_fee_per_gas {
            length += base_fee.length();
        }
        length
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        self.encode_with_extra(&self.extra_data, out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length(&self.extra_data);
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}
