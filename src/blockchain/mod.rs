// Blockchain module
//
// This module contains the integrity core of the node:
// - Digests and difficulty targets
// - Cryptography utilities
// - Wallet records and their key store
// - Transaction and block structures
// - Proof of work engine

pub mod block;
pub mod crypto;
pub mod hash;
pub mod keystore;
pub mod miner;
pub mod transaction;
pub mod wallet;

// Re-export main components for easier access
pub use block::{Block, GENESIS_PREV_HASH};
pub use crypto::Address;
pub use hash::DifficultyTarget;
pub use keystore::{MemoryKeyStore, SledKeyStore};
pub use miner::Miner;
pub use transaction::Transaction;
pub use wallet::Wallet;
