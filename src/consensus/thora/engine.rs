//! Thora proof-of-authority consensus engine implementation.

use super::{
    cache::{LruSnapshotCache, SnapshotCache},
    encode_extra,
    extra::ExtraData,
    seal::{pubkey_to_address, recover_signer, sign_seal},
    Snapshot, ThoraConfig, ThoraError, DIFF_IN_TURN, DIFF_NO_TURN, EXTRA_VANITY,
    FULL_IMMUTABILITY_THRESHOLD, INMEMORY_SIGNATURES, NONCE_AUTH_VOTE, NONCE_DROP_VOTE,
};
use crate::{
    primitives::{Header, EMPTY_OMMER_ROOT_HASH},
    storage::ChainHeaderReader,
};
use alloy_primitives::{Address, B256};
use lru::LruCache;
use parking_lot::RwLock;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};
use tracing::{debug, info, trace};

/// Replays slower than this are reported at info level.
const SLOW_REPLAY: Duration = Duration::from_secs(8);

/// Thora proof-of-authority consensus engine.
pub struct Thora<C: SnapshotCache = LruSnapshotCache> {
    /// Consensus engine configuration.
    config: ThoraConfig,

    /// Snapshots for recent blocks to speed up reorgs.
    snapshots: Arc<C>,

    /// Signatures of recent blocks to speed up mining.
    signatures: RwLock<LruCache<B256, Address>>,

    /// Current list of proposals we are pushing.
    proposals: RwLock<HashMap<Address, bool>>,

    /// Address and key of the local signer.
    signer: RwLock<Option<(Address, SecretKey)>>,

    /// Secp256k1 context for signature operations.
    secp: Secp256k1<secp256k1::All>,

    /// Skip difficulty verifications (for testing).
    fake_diff: bool,
}

impl Thora<LruSnapshotCache> {
    /// Create an engine backed by a fresh LRU snapshot cache.
    pub fn in_memory(config: ThoraConfig) -> Self {
        Self::new(config, Arc::new(LruSnapshotCache::default()))
    }
}

impl<C: SnapshotCache> Thora<C> {
    /// Create a new Thora consensus engine.
    pub fn new(config: ThoraConfig, snapshots: Arc<C>) -> Self {
        Self {
            config: config.normalized(),
            snapshots,
            signatures: RwLock::new(LruCache::new(
                NonZeroUsize::new(INMEMORY_SIGNATURES).unwrap_or(NonZeroUsize::MIN),
            )),
            proposals: RwLock::new(HashMap::new()),
            signer: RwLock::new(None),
            secp: Secp256k1::new(),
            fake_diff: false,
        }
    }

    /// Create a new Thora engine with fake difficulty (for testing).
    pub fn new_fake_diff(config: ThoraConfig, snapshots: Arc<C>) -> Self {
        let mut engine = Self::new(config, snapshots);
        engine.fake_diff = true;
        engine
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThoraConfig {
        &self.config
    }

    /// The snapshot cache shared with other engines.
    pub fn snapshots(&self) -> &Arc<C> {
        &self.snapshots
    }

    /// Install the key used to seal locally produced blocks.
    ///
    /// Returns the signer address derived from the key.
    pub fn authorize(&self, secret_key: SecretKey) -> Address {
        let address = pubkey_to_address(&PublicKey::from_secret_key(&self.secp, &secret_key));
        *self.signer.write() = Some((address, secret_key));
        info!(target: "consensus::thora", signer = %address, "Local signer authorized");
        address
    }

    /// Get the current signer.
    pub fn signer(&self) -> Option<Address> {
        self.signer.read().map(|(address, _)| address)
    }

    /// Propose to authorize or deauthorize an address.
    pub fn propose(&self, address: Address, authorize: bool) {
        self.proposals.write().insert(address, authorize);
    }

    /// Remove a proposal.
    pub fn discard(&self, address: Address) {
        self.proposals.write().remove(&address);
    }

    /// Current list of proposals.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.proposals.read().clone()
    }

    /// Extract the address that sealed `header`.
    pub fn author(&self, header: &Header) -> Result<Address, ThoraError> {
        let hash = header.hash_slow();

        // Check signature cache
        if let Some(address) = self.signatures.write().get(&hash) {
            return Ok(*address);
        }

        let address = recover_signer(&self.secp, header)?;
        self.signatures.write().put(hash, address);
        Ok(address)
    }

    /// Retrieve the snapshot at a given point.
    ///
    /// `parents` are headers not yet in `chain`, in any order; they are
    /// consulted before the chain during the ancestor walk.
    pub fn snapshot<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        number: u64,
        hash: B256,
        parents: &[Header],
    ) -> Result<Snapshot, ThoraError> {
        self.find_snapshot(chain, number, hash, &Pending::new(parents))
    }

    fn find_snapshot<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        number: u64,
        hash: B256,
        pending: &Pending<'_>,
    ) -> Result<Snapshot, ThoraError> {
        let (base, headers) = self.locate(chain, number, hash, pending)?;
        self.replay(base, headers)
    }

    /// Walk back from `(number, hash)` to the nearest known snapshot.
    ///
    /// Returns that snapshot together with the headers that lead from it to
    /// the target, newest first.
    fn locate<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        mut number: u64,
        mut hash: B256,
        pending: &Pending<'_>,
    ) -> Result<(Snapshot, Vec<Header>), ThoraError> {
        let mut headers = Vec::new();
        loop {
            // Check in-memory cache
            if let Some(snap) = self.snapshots.get(&hash) {
                trace!(target: "consensus::thora", number, %hash, "Snapshot cache hit");
                return Ok((snap, headers));
            }

            let header = pending
                .header(&hash, number)
                .cloned()
                .or_else(|| chain.header(hash, number))
                .ok_or(ThoraError::AncestorNotFound { number, hash })?;

            // Genesis, or a checkpoint whose history is out of reach
            let checkpoint = self.config.is_checkpoint(number);
            if number == 0
                || (checkpoint && self.is_anchor(chain, &header, pending, headers.len()))
            {
                let extra = ExtraData::parse(&header.extra_data, number, true)?;
                let snap = Snapshot::new(self.config, number, hash, extra.signers);
                self.snapshots.insert(snap.clone());
                info!(
                    target: "consensus::thora",
                    number,
                    %hash,
                    signers = snap.signer_count(),
                    "Stored checkpoint snapshot"
                );
                return Ok((snap, headers));
            }

            number -= 1;
            hash = header.parent_hash;
            headers.push(header);
        }
    }

    /// Whether the checkpoint `header` is trusted as the start of history.
    ///
    /// That is the case once the walk is long enough that the checkpoint is
    /// final, or when its parent is not available.
    fn is_anchor<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
        pending: &Pending<'_>,
        gathered: usize,
    ) -> bool {
        if gathered > FULL_IMMUTABILITY_THRESHOLD {
            return true;
        }
        let parent_number = header.number - 1;
        !pending.contains(&header.parent_hash) && chain.header_by_number(parent_number).is_none()
    }

    /// Fold `headers` (newest first) onto `base`, caching every snapshot.
    fn replay(&self, base: Snapshot, mut headers: Vec<Header>) -> Result<Snapshot, ThoraError> {
        if headers.is_empty() {
            return Ok(base);
        }

        headers.reverse();
        let start = Instant::now();
        let mut snap = base;
        for header in &headers {
            let signer = self.author(header)?;
            snap = snap.apply_header(header, signer)?;
            self.snapshots.insert(snap.clone());
        }

        let elapsed = start.elapsed();
        if elapsed > SLOW_REPLAY {
            info!(
                target: "consensus::thora",
                processed = headers.len(),
                number = snap.number,
                ?elapsed,
                "Reconstructed voting history"
            );
        } else {
            debug!(
                target: "consensus::thora",
                processed = headers.len(),
                number = snap.number,
                "Applied headers to snapshot"
            );
        }
        Ok(snap)
    }

    /// Verify a header conforms to consensus rules.
    ///
    /// `parents` are the not-yet-imported headers preceding `header` in the
    /// same batch.
    pub fn verify_header<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), ThoraError> {
        self.verify_pending(chain, header, &Pending::new(parents))
    }

    /// Verify a batch of headers, each against its ancestors in the batch.
    ///
    /// The batch is indexed once and shared by every header in it.
    pub fn verify_headers<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        headers: &[Header],
    ) -> Vec<Result<(), ThoraError>> {
        let pending = Pending::new(headers);
        headers.iter().map(|header| self.verify_pending(chain, header, &pending)).collect()
    }

    fn verify_pending<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
        pending: &Pending<'_>,
    ) -> Result<(), ThoraError> {
        let number = header.number;

        // Don't waste time checking blocks from the future
        let now = unix_now();
        if header.timestamp > now {
            return Err(ThoraError::FutureBlock { block_time: header.timestamp, current_time: now });
        }

        // Checkpoint blocks need to enforce zero beneficiary
        let checkpoint = self.config.is_checkpoint(number);
        if checkpoint && !header.coinbase.is_zero() {
            return Err(ThoraError::InvalidCheckpointBeneficiary);
        }

        // Nonces must be 0x00..0 or 0xff..f, zeroes enforced on checkpoints
        if header.nonce != NONCE_AUTH_VOTE && header.nonce != NONCE_DROP_VOTE {
            return Err(ThoraError::InvalidVote);
        }
        if checkpoint && header.nonce != NONCE_DROP_VOTE {
            return Err(ThoraError::InvalidCheckpointVote);
        }

        // Vanity, signer list and seal must line up with the block kind
        ExtraData::parse(&header.extra_data, number, checkpoint)?;

        if !header.mix_hash.is_zero() {
            return Err(ThoraError::InvalidMixDigest);
        }
        if header.ommers_hash != EMPTY_OMMER_ROOT_HASH {
            return Err(ThoraError::InvalidUncleHash);
        }
        if number > 0 && header.difficulty != DIFF_IN_TURN && header.difficulty != DIFF_NO_TURN {
            return Err(ThoraError::InvalidDifficulty { difficulty: header.difficulty });
        }

        // All basic checks passed, verify cascading fields
        self.verify_cascading_fields(chain, header, pending)
    }

    /// Verify the header fields that depend on its ancestors.
    fn verify_cascading_fields<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
        pending: &Pending<'_>,
    ) -> Result<(), ThoraError> {
        let number = header.number;

        // Genesis block is always valid
        if number == 0 {
            return Ok(());
        }

        let parent = pending
            .header(&header.parent_hash, number - 1)
            .cloned()
            .or_else(|| chain.header(header.parent_hash, number - 1))
            .ok_or(ThoraError::AncestorNotFound { number: number - 1, hash: header.parent_hash })?;

        // Ensure timestamp is correct
        if parent.timestamp.saturating_add(self.config.period) > header.timestamp {
            return Err(ThoraError::InvalidTimestamp {
                parent_time: parent.timestamp,
                period: self.config.period,
                block_time: header.timestamp,
            });
        }

        // Retrieve snapshot for validation
        let snap = self.find_snapshot(chain, number - 1, header.parent_hash, pending)?;

        // If checkpoint, verify signer list
        if self.config.is_checkpoint(number) {
            let extra = ExtraData::parse(&header.extra_data, number, true)?;
            if extra.signers != snap.signers_list() {
                return Err(ThoraError::MismatchingCheckpointSigners { number });
            }
        }

        self.verify_seal(&snap, header)
    }

    /// Verify the seal of a header against the snapshot at its parent.
    fn verify_seal(&self, snap: &Snapshot, header: &Header) -> Result<(), ThoraError> {
        let number = header.number;

        // Genesis block has no seal
        if number == 0 {
            return Err(ThoraError::UnknownBlock);
        }

        // Resolve signer and check authorization and recency
        let signer = self.author(header)?;
        snap.check_signer(number, signer)?;

        // Verify difficulty matches turn
        if !self.fake_diff {
            let expected = snap.calc_difficulty(number, signer);
            if header.difficulty != expected {
                return Err(ThoraError::WrongDifficulty {
                    signer,
                    block: number,
                    expected,
                    actual: header.difficulty,
                });
            }
        }

        Ok(())
    }

    /// Difficulty the local signer would use for a child of `parent`.
    pub fn calc_difficulty<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        parent: &Header,
    ) -> Result<u64, ThoraError> {
        let snap = self.snapshot(chain, parent.number, parent.hash_slow(), &[])?;
        let signer = self.signer().ok_or(ThoraError::MissingSigner)?;
        Ok(snap.calc_difficulty(snap.number + 1, signer))
    }

    /// Whether `address` is an authorized signer at the current head.
    pub fn is_current_validator<R: ChainHeaderReader + ?Sized>(
        &self,
        address: &Address,
        chain: &R,
    ) -> Result<bool, ThoraError> {
        let head = chain.current_header().ok_or(ThoraError::UnknownBlock)?;
        let snap = self.snapshot(chain, head.number, head.hash_slow(), &[])?;
        Ok(snap.is_signer(address))
    }

    /// Fill in the consensus fields of a header about to be sealed locally.
    ///
    /// Casts one of the pending proposals that still makes sense against
    /// the parent snapshot, or embeds the signer list on checkpoints.
    pub fn prepare<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &mut Header,
    ) -> Result<(), ThoraError> {
        let number = header.number;
        if number == 0 {
            return Err(ThoraError::UnknownBlock);
        }
        let signer = self.signer().ok_or(ThoraError::MissingSigner)?;

        let parent = chain
            .header(header.parent_hash, number - 1)
            .ok_or(ThoraError::AncestorNotFound { number: number - 1, hash: header.parent_hash })?;
        let snap = self.snapshot(chain, number - 1, header.parent_hash, &[])?;

        header.coinbase = Address::ZERO;
        header.nonce = NONCE_DROP_VOTE;

        let checkpoint = self.config.is_checkpoint(number);
        if !checkpoint {
            let proposals = self.proposals.read();
            let vote = proposals
                .iter()
                .filter(|(address, authorize)| snap.valid_vote(address, **authorize))
                .min_by_key(|(address, _)| **address);
            if let Some((&address, &authorize)) = vote {
                header.coinbase = address;
                header.nonce = if authorize { NONCE_AUTH_VOTE } else { NONCE_DROP_VOTE };
                debug!(target: "consensus::thora", number, %address, authorize, "Casting vote");
            }
        }

        header.difficulty = snap.calc_difficulty(number, signer);

        // Keep the caller's vanity, rebuild the rest
        let vanity = &header.extra_data[..header.extra_data.len().min(EXTRA_VANITY)];
        let signers = if checkpoint { snap.signers_list() } else { Vec::new() };
        header.extra_data = encode_extra(vanity, &signers);

        header.mix_hash = B256::ZERO;
        header.ommers_hash = EMPTY_OMMER_ROOT_HASH;

        header.timestamp = parent.timestamp.saturating_add(self.config.period).max(unix_now());
        Ok(())
    }

    /// Seal a prepared header with the local signing key.
    pub fn seal<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &mut Header,
    ) -> Result<(), ThoraError> {
        let number = header.number;
        if number == 0 {
            return Err(ThoraError::UnknownBlock);
        }
        let (signer, secret_key) = (*self.signer.read()).ok_or(ThoraError::MissingSigner)?;

        // Bail out if we're unauthorized or signed recently
        let snap = self.snapshot(chain, number - 1, header.parent_hash, &[])?;
        snap.check_signer(number, signer)?;

        sign_seal(&self.secp, &secret_key, header);
        debug!(
            target: "consensus::thora",
            number,
            %signer,
            difficulty = header.difficulty,
            "Sealed block"
        );
        Ok(())
    }
}

/// Headers of an import batch that are not in the chain yet, by hash.
struct Pending<'a>(HashMap<B256, &'a Header>);

impl<'a> Pending<'a> {
    fn new(headers: &'a [Header]) -> Self {
        Self(headers.iter().map(|header| (header.hash_slow(), header)).collect())
    }

    fn header(&self, hash: &B256, number: u64) -> Option<&'a Header> {
        self.0.get(hash).copied().filter(|header| header.number == number)
    }

    fn contains(&self, hash: &B256) -> bool {
        self.0.contains_key(hash)
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
