use serde::{Deserialize, Serialize};

use std::fmt;

use super::crypto::Address;
use super::hash::{digest, Digest, DifficultyTarget};
use super::transaction::Transaction;

/// Previous-hash sentinel carried by a genesis block
pub const GENESIS_PREV_HASH: &str = "0";

/// Represents a block in the blockchain
///
/// The canonical encoding renders the difficulty as 64 hex characters and the
/// nonce as 16, so logically equal blocks encode identically and the encoding
/// is the same for hashing, display, and the wire. The nonce is the only
/// field the mining engine mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Hash of the previous block, or "0" for a genesis block
    pub prev_hash: String,

    /// Hashes of the transactions included in this block, in hex
    pub transactions: Vec<String>,

    /// Address of the miner assembling the block
    pub miner: Address,

    /// The largest digest this block may hash to
    pub difficulty: DifficultyTarget,

    /// Proof-of-work nonce, rendered as 16 hex characters
    pub nonce: u64,
}

/// Canonical wire form of a block; shared by hashing, display, and transport
#[derive(Serialize, Deserialize)]
struct BlockWire {
    prev_hash: String,
    transactions: Vec<String>,
    miner: Address,
    difficulty: DifficultyTarget,
    nonce: String,
}

/// Borrowing counterpart of BlockWire used on the encode path
#[derive(Serialize)]
struct BlockView<'a> {
    prev_hash: &'a str,
    transactions: &'a [String],
    miner: &'a Address,
    difficulty: &'a DifficultyTarget,
    nonce: String,
}

impl Block {
    /// Creates a new block
    ///
    /// # Arguments
    ///
    /// * `prev_hash` - The hash of the previous block, or "0" for genesis
    /// * `transactions` - The hashes of the included transactions
    /// * `miner` - The address of the miner
    /// * `difficulty` - The difficulty target the block must hash under
    /// * `nonce` - The starting nonce
    ///
    /// # Returns
    ///
    /// A new Block instance
    pub fn new(
        prev_hash: String,
        transactions: Vec<String>,
        miner: Address,
        difficulty: DifficultyTarget,
        nonce: u64,
    ) -> Self {
        Block {
            prev_hash,
            transactions,
            miner,
            difficulty,
            nonce,
        }
    }

    /// Assembles a candidate block from signed transactions
    ///
    /// Each transaction contributes its hash; the block starts at nonce 0.
    pub fn from_transactions(
        prev_hash: String,
        transactions: &[Transaction],
        miner: Address,
        difficulty: DifficultyTarget,
    ) -> Self {
        let hashes = transactions.iter().map(|tx| tx.hash().to_hex()).collect();
        Block::new(prev_hash, hashes, miner, difficulty, 0)
    }

    /// Sets the proof-of-work nonce, the only field mutated after construction
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    fn view(&self) -> BlockView<'_> {
        BlockView {
            prev_hash: &self.prev_hash,
            transactions: &self.transactions,
            miner: &self.miner,
            difficulty: &self.difficulty,
            nonce: format!("{:016x}", self.nonce),
        }
    }

    /// Encodes the block in canonical form
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Strings and integers in a fixed field order cannot fail to encode
        serde_json::to_vec(&self.view()).unwrap()
    }

    /// Calculates the hash of the block
    ///
    /// Recomputed from all fields, including the current nonce, on every
    /// call; nothing is cached across nonce mutation.
    pub fn hash(&self) -> Digest {
        digest(&self.canonical_bytes())
    }

    /// Checks whether the block's current hash satisfies its own difficulty
    pub fn meets_difficulty(&self) -> bool {
        self.hash().meets_target(&self.difficulty)
    }

    /// Renders the block as canonical JSON
    pub fn to_canonical_string(&self) -> String {
        serde_json::to_string(&self.view()).unwrap()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl Serialize for Block {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = BlockWire::deserialize(deserializer)?;

        if wire.nonce.len() != 16 {
            return Err(serde::de::Error::custom(format!(
                "Invalid nonce width: expected 16 hex characters, got {}",
                wire.nonce.len()
            )));
        }
        let nonce = u64::from_str_radix(&wire.nonce, 16).map_err(serde::de::Error::custom)?;

        Ok(Block {
            prev_hash: wire.prev_hash,
            transactions: wire.transactions,
            miner: wire.miner,
            difficulty: wire.difficulty,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn easy_target() -> DifficultyTarget {
        DifficultyTarget::from_hex(&"ff".repeat(32)).unwrap()
    }

    fn sample_block(nonce: u64) -> Block {
        Block::new(
            GENESIS_PREV_HASH.to_string(),
            vec!["00af".to_string()],
            Address("abcdef".to_string()),
            easy_target(),
            nonce,
        )
    }

    #[test]
    fn test_block_hash_shape() {
        let hash = sample_block(0).hash();

        assert_eq!(hash.to_hex().len(), 64); // SHA-256 hash is 64 characters in hex
    }

    #[test]
    fn test_canonical_encoding_is_fixed_width() {
        let encoded = sample_block(255).to_canonical_string();

        assert!(encoded.contains("\"00000000000000ff\""));
        assert!(encoded.contains(&"ff".repeat(32)));
        assert_eq!(encoded, sample_block(255).to_canonical_string());
    }

    #[test]
    fn test_hash_tracks_nonce() {
        let mut block = sample_block(0);
        let at_zero = block.hash();

        block.set_nonce(1);
        assert_eq!(block.nonce, 1);
        assert_ne!(block.hash(), at_zero);

        block.set_nonce(0);
        assert_eq!(block.hash(), at_zero);
    }

    #[test]
    fn test_meets_difficulty_bounds() {
        // Every digest is at most ff..ff, none is below 00..00 in practice
        let mut block = sample_block(0);
        assert!(block.meets_difficulty());

        block.difficulty = DifficultyTarget::from_hex(&"00".repeat(32)).unwrap();
        assert!(!block.meets_difficulty());
    }

    #[test]
    fn test_from_transactions_hashes_entries() {
        let tx = Transaction::new(
            Address("abcdef".to_string()),
            vec![Address("3yZe7d".to_string())],
            vec![5],
            0,
        )
        .unwrap();

        let block = Block::from_transactions(
            "prev".to_string(),
            &[tx.clone()],
            Address("abcdef".to_string()),
            easy_target(),
        );

        assert_eq!(block.transactions, vec![tx.hash().to_hex()]);
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn test_wire_roundtrip() {
        let block = sample_block(48879);

        let json = serde_json::to_string(&block).unwrap();
        let from_json: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json, block);

        let binary = bincode::serialize(&block).unwrap();
        let from_binary: Block = bincode::deserialize(&binary).unwrap();
        assert_eq!(from_binary, block);
    }

    #[test]
    fn test_wire_rejects_loose_nonce() {
        let json = format!(
            "{{\"prev_hash\":\"0\",\"transactions\":[],\"miner\":\"abcdef\",\"difficulty\":\"{}\",\"nonce\":\"ff\"}}",
            "ff".repeat(32)
        );

        assert!(serde_json::from_str::<Block>(&json).is_err());
    }
}
