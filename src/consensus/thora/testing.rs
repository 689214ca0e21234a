//! Test helpers: labelled signer accounts and header builders.

use super::{encode_extra, seal::sign_seal, DIFF_IN_TURN, NONCE_AUTH_VOTE, NONCE_DROP_VOTE};
use crate::primitives::Header;
use alloy_primitives::{keccak256, Address, B256};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;

/// Pool of tester accounts, mapping textual labels to secp256k1 keys.
///
/// Keys are derived from the label so every run sees the same addresses.
pub(crate) struct TesterAccountPool {
    secp: Secp256k1<secp256k1::All>,
    accounts: HashMap<String, SecretKey>,
}

impl TesterAccountPool {
    pub(crate) fn new() -> Self {
        Self { secp: Secp256k1::new(), accounts: HashMap::new() }
    }

    /// Secret key for a label, created on first use.
    pub(crate) fn key(&mut self, label: &str) -> SecretKey {
        *self.accounts.entry(label.to_string()).or_insert_with(|| {
            let seed = keccak256(format!("thora-tester-{label}"));
            SecretKey::from_slice(seed.as_slice()).expect("keccak output is a valid key")
        })
    }

    /// Address of a label; the empty label is the zero address.
    pub(crate) fn address(&mut self, label: &str) -> Address {
        if label.is_empty() {
            return Address::ZERO;
        }
        let key = self.key(label);
        super::pubkey_to_address(&PublicKey::from_secret_key(&self.secp, &key))
    }

    /// Sorted addresses for a list of labels.
    pub(crate) fn addresses(&mut self, labels: &[&str]) -> Vec<Address> {
        let mut addresses: Vec<_> = labels.iter().map(|label| self.address(label)).collect();
        addresses.sort();
        addresses
    }

    /// Seal `header` as the given signer.
    pub(crate) fn sign(&mut self, header: &mut Header, signer: &str) {
        let key = self.key(signer);
        sign_seal(&self.secp, &key, header);
    }
}

/// Genesis header whose extra-data lists the given signers.
pub(crate) fn genesis(signers: &[Address]) -> Header {
    Header {
        number: 0,
        difficulty: 1,
        extra_data: encode_extra(&[], signers),
        ..Default::default()
    }
}

/// Unsealed child of `parent` carrying a vote for `target`.
///
/// Timestamps advance by one second per block.
pub(crate) fn child(
    parent: &Header,
    parent_hash: B256,
    target: Address,
    authorize: bool,
) -> Header {
    Header {
        parent_hash,
        number: parent.number + 1,
        timestamp: parent.timestamp + 1,
        difficulty: DIFF_IN_TURN,
        coinbase: target,
        nonce: if authorize { NONCE_AUTH_VOTE } else { NONCE_DROP_VOTE },
        extra_data: encode_extra(&[], &[]),
        ..Default::default()
    }
}
