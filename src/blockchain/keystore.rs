use std::path::Path;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use thiserror::Error;

use super::crypto::Address;

/// Errors that can occur during key store operations
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("No wallet record found for address {0}")]
    NotFound(Address),
}

/// The persisted state of one wallet: its secret key and next signing nonce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Raw Ed25519 secret key bytes
    pub secret_key: Vec<u8>,

    /// The nonce the wallet will assign to its next signature
    pub nonce: u64,
}

/// Persistence contract for wallet records, keyed by address
pub trait KeyStore: Send + Sync {
    /// Loads the record stored for an address
    fn load_key(&self, address: &Address) -> Result<WalletRecord, KeyStoreError>;

    /// Stores (or replaces) the record for an address
    fn store_key(&self, address: &Address, record: &WalletRecord) -> Result<(), KeyStoreError>;

    /// Removes the record for an address; removing an absent record is a no-op
    fn delete_key(&self, address: &Address) -> Result<(), KeyStoreError>;
}

/// Key store backed by a sled database
pub struct SledKeyStore {
    /// The database instance
    db: Db,

    /// Tree for wallet records
    wallets: Tree,
}

impl std::fmt::Debug for SledKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledKeyStore").finish()
    }
}

impl SledKeyStore {
    /// Opens (or creates) a key store at the given directory
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the database directory
    ///
    /// # Returns
    ///
    /// A new SledKeyStore instance
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, KeyStoreError> {
        let db = sled::open(path)?;
        let wallets = db.open_tree("wallets")?;

        Ok(Self { db, wallets })
    }

    /// Flushes all pending writes to disk
    pub fn flush(&self) -> Result<(), KeyStoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyStore for SledKeyStore {
    fn load_key(&self, address: &Address) -> Result<WalletRecord, KeyStoreError> {
        let key = address.0.as_bytes();

        if let Some(value) = self.wallets.get(key)? {
            let record: WalletRecord = bincode::deserialize(&value)
                .map_err(|e| KeyStoreError::Deserialization(e.to_string()))?;

            Ok(record)
        } else {
            Err(KeyStoreError::NotFound(address.clone()))
        }
    }

    fn store_key(&self, address: &Address, record: &WalletRecord) -> Result<(), KeyStoreError> {
        let key = address.0.as_bytes();
        let value = bincode::serialize(record)
            .map_err(|e| KeyStoreError::Serialization(e.to_string()))?;

        self.wallets.insert(key, value)?;
        Ok(())
    }

    fn delete_key(&self, address: &Address) -> Result<(), KeyStoreError> {
        self.wallets.remove(address.0.as_bytes())?;
        Ok(())
    }
}

/// In-memory key store for tests and nodes run without persistence
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: DashMap<Address, WalletRecord>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_key(&self, address: &Address) -> Result<WalletRecord, KeyStoreError> {
        self.records
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| KeyStoreError::NotFound(address.clone()))
    }

    fn store_key(&self, address: &Address, record: &WalletRecord) -> Result<(), KeyStoreError> {
        self.records.insert(address.clone(), record.clone());
        Ok(())
    }

    fn delete_key(&self, address: &Address) -> Result<(), KeyStoreError> {
        self.records.remove(address);
        Ok(())
    }
}
