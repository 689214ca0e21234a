//! Extra-data layout.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┬──────────────┐
//! │ vanity (32)  │ signers (k * 20, checkpoints) │ seal (65)    │
//! └──────────────┴───────────────────────────────┴──────────────┘
//! ```

use super::{ThoraError, ADDRESS_LENGTH, EXTRA_SEAL, EXTRA_VANITY};
use alloy_primitives::{Address, Bytes};

/// Borrowed view over a header's extra-data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraData<'a> {
    /// Free-form signer vanity.
    pub vanity: &'a [u8],
    /// Authorized signers, only present on checkpoint blocks.
    pub signers: Vec<Address>,
    /// Producer's 65-byte secp256k1 signature.
    pub seal: &'a [u8],
}

impl<'a> ExtraData<'a> {
    /// Split `extra` into its regions, checking the layout expected at
    /// `number`.
    pub fn parse(extra: &'a [u8], number: u64, checkpoint: bool) -> Result<Self, ThoraError> {
        let length = extra.len();
        if length < EXTRA_VANITY + EXTRA_SEAL {
            return Err(ThoraError::MalformedExtraData { length, checkpoint });
        }

        let signers_bytes = &extra[EXTRA_VANITY..length - EXTRA_SEAL];
        if checkpoint {
            if signers_bytes.len() % ADDRESS_LENGTH != 0 {
                return Err(ThoraError::MalformedExtraData { length, checkpoint });
            }
            if signers_bytes.is_empty() {
                return Err(ThoraError::InvalidCheckpointSigners { number, checkpoint });
            }
        } else if !signers_bytes.is_empty() {
            return Err(ThoraError::InvalidCheckpointSigners { number, checkpoint });
        }

        Ok(Self {
            vanity: &extra[..EXTRA_VANITY],
            signers: signers_bytes.chunks_exact(ADDRESS_LENGTH).map(Address::from_slice).collect(),
            seal: &extra[length - EXTRA_SEAL..],
        })
    }
}

/// The trailing seal of an extra-data, if it is long enough to hold one.
pub(crate) fn seal_of(extra: &[u8]) -> Option<&[u8]> {
    extra.len().checked_sub(EXTRA_SEAL).map(|start| &extra[start..])
}

/// Extra-data with the trailing seal stripped, the part covered by the seal hash.
pub(crate) fn without_seal(extra: &[u8]) -> &[u8] {
    &extra[..extra.len().saturating_sub(EXTRA_SEAL)]
}

/// Build an unsealed extra-data: the vanity (truncated or zero-padded to
/// 32 bytes), the signer list, and a zeroed seal.
pub fn encode_extra(vanity: &[u8], signers: &[Address]) -> Bytes {
    let mut extra = vec![0u8; EXTRA_VANITY + signers.len() * ADDRESS_LENGTH + EXTRA_SEAL];
    let vanity = &vanity[..vanity.len().min(EXTRA_VANITY)];
    extra[..vanity.len()].copy_from_slice(vanity);
    for (i, signer) in signers.iter().enumerate() {
        let start = EXTRA_VANITY + i * ADDRESS_LENGTH;
        extra[start..start + ADDRESS_LENGTH].copy_from_slice(signer.as_slice());
    }
    extra.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_block() {
        let extra = encode_extra(b"thora", &[]);
        let parsed = ExtraData::parse(&extra, 7, false).unwrap();

        assert_eq!(&parsed.vanity[..5], b"thora");
        assert!(parsed.signers.is_empty());
        assert_eq!(parsed.seal.len(), EXTRA_SEAL);
    }

    #[test]
    fn test_parse_checkpoint() {
        let signers = vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)];
        let extra = encode_extra(&[], &signers);
        let parsed = ExtraData::parse(&extra, 30000, true).unwrap();

        assert_eq!(parsed.signers, signers);
    }

    #[test]
    fn test_too_short() {
        let extra = vec![0u8; EXTRA_VANITY + EXTRA_SEAL - 1];
        assert_eq!(
            ExtraData::parse(&extra, 1, false),
            Err(ThoraError::MalformedExtraData { length: 96, checkpoint: false })
        );
    }

    #[test]
    fn test_partial_address_on_checkpoint() {
        let extra = vec![0u8; EXTRA_VANITY + 19 + EXTRA_SEAL];
        assert!(matches!(
            ExtraData::parse(&extra, 0, true),
            Err(ThoraError::MalformedExtraData { checkpoint: true, .. })
        ));
    }

    #[test]
    fn test_signers_on_plain_block() {
        let extra = encode_extra(&[], &[Address::repeat_byte(0x01)]);
        assert_eq!(
            ExtraData::parse(&extra, 5, false),
            Err(ThoraError::InvalidCheckpointSigners { number: 5, checkpoint: false })
        );
    }

    #[test]
    fn test_empty_checkpoint_list() {
        let extra = encode_extra(&[], &[]);
        assert_eq!(
            ExtraData::parse(&extra, 10, true),
            Err(ThoraError::InvalidCheckpointSigners { number: 10, checkpoint: true })
        );
    }

    #[test]
    fn test_seal_helpers() {
        let mut extra = encode_extra(&[0xaa; 40], &[]).to_vec();
        extra[EXTRA_VANITY] = 0xbb;

        assert_eq!(without_seal(&extra), &[0xaa; EXTRA_VANITY][..]);
        assert_eq!(seal_of(&extra).map(|seal| seal[0]), Some(0xbb));
        assert_eq!(seal_of(&[0u8; 10]), None);
    }
}
