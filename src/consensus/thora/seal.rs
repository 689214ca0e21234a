//! Seal hashing, signing and signer recovery.
//!
//! Blocks are signed using secp256k1 ECDSA with recoverable signatures
//! (65 bytes, `r | s | v`). The signature covers the seal hash: the header
//! hash computed with the seal stripped from extra-data.

use super::{
    extra::{seal_of, without_seal},
    ThoraError, EXTRA_SEAL,
};
use crate::primitives::Header;
use alloy_primitives::{keccak256, Address, Bytes, B256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1, SecretKey, Signing, Verification,
};

/// Hash of the header with the trailing seal removed from extra-data.
///
/// Every header field takes part; any change here splits the network.
pub fn seal_hash(header: &Header) -> B256 {
    let extra = without_seal(&header.extra_data);
    let mut buf = Vec::new();
    header.encode_with_extra(extra, &mut buf);
    keccak256(&buf)
}

/// Derive an account address: the last 20 bytes of `keccak256(pubkey)`.
pub fn pubkey_to_address(pubkey: &PublicKey) -> Address {
    let pubkey_bytes = pubkey.serialize_uncompressed();
    // Skip the 0x04 prefix
    let hash = keccak256(&pubkey_bytes[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the address that produced `header`'s seal.
pub fn recover_signer<C: Verification>(
    secp: &Secp256k1<C>,
    header: &Header,
) -> Result<Address, ThoraError> {
    let signature = seal_of(&header.extra_data).ok_or_else(|| ThoraError::InvalidSignature {
        message: format!("extra-data {} byte signature suffix missing", EXTRA_SEAL),
    })?;

    // Handle both 0/1 and 27/28 formats for recovery id
    let v = signature[64];
    let recovery_id_value = if v >= 27 { v - 27 } else { v } as i32;
    let recovery_id = RecoveryId::try_from(recovery_id_value).map_err(|e| {
        ThoraError::InvalidSignature {
            message: format!("invalid recovery id {}: {}", recovery_id_value, e),
        }
    })?;

    let sig = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| ThoraError::InvalidSignature { message: e.to_string() })?;

    let message = Message::from_digest(seal_hash(header).0);
    let pubkey = secp
        .recover_ecdsa(&message, &sig)
        .map_err(|e| ThoraError::InvalidSignature { message: e.to_string() })?;

    Ok(pubkey_to_address(&pubkey))
}

/// Sign `header` with `secret_key` and write the seal into its extra-data.
///
/// Extra-data shorter than a seal is extended with room for one first.
pub fn sign_seal<C: Signing>(secp: &Secp256k1<C>, secret_key: &SecretKey, header: &mut Header) {
    if header.extra_data.len() < EXTRA_SEAL {
        let mut extra = header.extra_data.to_vec();
        extra.resize(EXTRA_SEAL, 0);
        header.extra_data = extra.into();
    }

    let message = Message::from_digest(seal_hash(header).0);
    let (recovery_id, sig_data) =
        secp.sign_ecdsa_recoverable(&message, secret_key).serialize_compact();

    let mut extra = header.extra_data.to_vec();
    let start = extra.len() - EXTRA_SEAL;
    extra[start..start + 64].copy_from_slice(&sig_data);
    // RecoveryId can be converted to i32 via Into trait
    extra[start + 64] = i32::from(recovery_id) as u8;
    header.extra_data = Bytes::from(extra);
}
