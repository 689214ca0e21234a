//! Consensus engines.
//!
//! # Components
//!
//! - [`thora`]: proof-of-authority engine with on-chain signer voting
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Thora                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  verify_header ──► snapshot(parent) ──► check_signer        │
//! │                        │                                    │
//! │                        ▼                                    │
//! │       cache hit? ── no ──► walk parents back to genesis     │
//! │          │                 or a trusted checkpoint          │
//! │          ▼                        │                         │
//! │       Snapshot ◄── apply_header ◄─┘ (oldest first)          │
//! │                                                             │
//! │  finalize ──► author(parent) ──► add_balance                │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod thora;

pub use thora::{Snapshot, Thora, ThoraConfig, ThoraError};
