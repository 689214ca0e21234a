//! Thora Consensus Demo
//!
//! Simulates three signers producing blocks in turn while voting a fourth
//! account into the signer set:
//! - In-turn difficulty = 2, out-of-turn difficulty = 1
//! - A signer may not seal twice within `signers / 2 + 1` blocks
//! - Each block pays its reward to the author of the previous block
//!
//! Run with: `cargo run --bin thora_demo`
//! Use `RUST_LOG=consensus::thora=debug` to watch the snapshot machine.

use alloy_primitives::Address;
use eyre::eyre;
use secp256k1::SecretKey;
use std::sync::Arc;
use thora_node::{
    consensus::thora::{encode_extra, Thora, ThoraConfig, ThoraError},
    primitives::Header,
    storage::{ChainHeaderReader, InMemoryHeaderStore, InMemoryState},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Number of blocks to produce.
const BLOCKS: u64 = 12;

/// Simulated signer node.
struct SignerNode {
    /// Signer address.
    address: Address,
    /// Node index (for display).
    index: usize,
    /// Consensus engine holding this node's key.
    engine: Thora,
}

impl SignerNode {
    fn new(index: usize, config: ThoraConfig) -> eyre::Result<Self> {
        let engine = Thora::in_memory(config);
        let address = engine.authorize(demo_key(index)?);
        Ok(Self { address, index, engine })
    }

    /// Build and seal the next block on top of `parent`.
    fn produce<R: ChainHeaderReader>(
        &self,
        chain: &R,
        parent: &Header,
    ) -> Result<Header, ThoraError> {
        let mut header = Header {
            parent_hash: parent.hash_slow(),
            number: parent.number + 1,
            gas_limit: 30_000_000,
            extra_data: format!("thora-demo/{}", self.index).into_bytes().into(),
            ..Default::default()
        };
        self.engine.prepare(chain, &mut header)?;
        self.engine.seal(chain, &mut header)?;
        Ok(header)
    }
}

/// Deterministic demo key for a node index.
fn demo_key(index: usize) -> eyre::Result<SecretKey> {
    let mut seed = [0u8; 32];
    seed[0] = 0x7a;
    seed[31] = index as u8 + 1;
    Ok(SecretKey::from_slice(&seed)?)
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Zero period so blocks can be produced back to back
    let config = ThoraConfig::default().with_period(0).with_epoch(8);

    // Four nodes, but only the first three start out as signers
    let nodes = (0..4).map(|i| SignerNode::new(i, config)).collect::<eyre::Result<Vec<_>>>()?;
    let candidate = nodes[3].address;

    let mut initial: Vec<Address> = nodes[..3].iter().map(|node| node.address).collect();
    initial.sort();
    let genesis =
        Header { difficulty: 1, extra_data: encode_extra(&[], &initial), ..Default::default() };

    // One chain shared by every node
    let chain = Arc::new(InMemoryHeaderStore::new(genesis));
    let mut state = InMemoryState::new();

    for node in &nodes {
        let signer = initial.contains(&node.address);
        info!(node = node.index, address = %node.address, signer, "Node ready");
    }

    // Two of the three signers push for the candidate
    nodes[0].engine.propose(candidate, true);
    nodes[1].engine.propose(candidate, true);

    for number in 1..=BLOCKS {
        let parent = chain.current_header().ok_or_else(|| eyre!("chain has no head"))?;
        let snap = nodes[0].engine.snapshot(&chain, parent.number, parent.hash_slow(), &[])?;

        // In-turn signer first, then anyone else allowed to seal
        let mut order: Vec<&SignerNode> =
            nodes.iter().filter(|n| snap.inturn(number, n.address)).collect();
        order.extend(nodes.iter().filter(|n| !snap.inturn(number, n.address)));

        let mut sealed = None;
        for node in order {
            match node.produce(&chain, &parent) {
                Ok(header) => {
                    sealed = Some((node, header));
                    break;
                }
                Err(err) => info!(node = node.index, number, %err, "Node skips block"),
            }
        }
        let (producer, header) = sealed.ok_or_else(|| eyre!("no node could seal block {number}"))?;

        // Every node verifies before import
        for node in &nodes {
            node.engine.verify_header(&chain, &header, &[])?;
        }
        chain.insert_header(header.clone());

        if let Some(credit) = producer.engine.finalize(&chain, &header, &mut state) {
            info!(number, recipient = %credit.recipient, amount = %credit.amount, "Block reward");
        }

        info!(
            number,
            producer = producer.index,
            difficulty = header.difficulty,
            vote = %header.coinbase,
            "Imported block"
        );

        // Stop pushing once the candidate made it in
        let snap = nodes[0].engine.snapshot(&chain, header.number, header.hash_slow(), &[])?;
        if snap.is_signer(&candidate) {
            for node in &nodes {
                node.engine.discard(candidate);
            }
        }
    }

    let head = chain.current_header().ok_or_else(|| eyre!("chain has no head"))?;
    let snap = nodes[0].engine.snapshot(&chain, head.number, head.hash_slow(), &[])?;
    info!(number = snap.number, hash = %snap.hash, "Final snapshot");
    for signer in snap.signers_list() {
        info!(%signer, balance = %state.balance(&signer), "Signer");
    }
    if !nodes[3].engine.is_current_validator(&candidate, &chain)? {
        warn!(%candidate, "Candidate was not voted in");
    }

    Ok(())
}
