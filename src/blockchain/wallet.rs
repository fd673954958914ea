use ed25519_dalek::{SigningKey, VerifyingKey};
use log::{debug, info, warn};
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

use std::fmt;
use std::sync::{Arc, Mutex};

use super::crypto::{self, Address, CryptoError, DigitalSignature};
use super::keystore::{KeyStore, KeyStoreError, WalletRecord};
use super::transaction::Transaction;

/// Errors that can occur during wallet operations
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(CryptoError),

    #[error("Record for {requested} holds a key belonging to {derived}")]
    AddressMismatch { requested: Address, derived: Address },

    #[error("Wallet {wallet} does not own transactions from sender {sender}")]
    NotOwner { wallet: Address, sender: Address },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
}

/// A signing identity: a keypair, its derived address, and the next nonce
///
/// The nonce is strictly increasing and assigned exactly once per successful
/// sign; the mutex serializes concurrent signers so no two signatures ever
/// share a nonce. Every successful sign persists the record back to the key
/// store, so a reload resumes exactly where the wallet left off.
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
    nonce: Mutex<u64>,
    store: Arc<dyn KeyStore>,
}

/// Canonical display form of a wallet
#[derive(Serialize)]
struct WalletView<'a> {
    address: &'a Address,
    nonce: u64,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("nonce", &self.nonce)
            .finish()
    }
}

impl Wallet {
    /// Creates a new wallet with a random keypair and persists its record
    ///
    /// # Arguments
    ///
    /// * `store` - The key store that will hold the wallet record
    ///
    /// # Returns
    ///
    /// A new Wallet with nonce 0
    pub fn generate(store: Arc<dyn KeyStore>) -> Result<Self, WalletError> {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        let record = WalletRecord {
            secret_key: signing_key.to_bytes().to_vec(),
            nonce: 0,
        };
        store.store_key(&address, &record)?;
        info!("Generated wallet {}", address);

        Ok(Wallet {
            signing_key,
            verifying_key,
            address,
            nonce: Mutex::new(0),
            store,
        })
    }

    /// Loads a wallet from the key store by address
    ///
    /// The stored secret key must derive the requested address; a record
    /// filed under a foreign address is refused.
    ///
    /// # Arguments
    ///
    /// * `store` - The key store holding the wallet record
    /// * `address` - The base58 address the wallet was stored under
    ///
    /// # Returns
    ///
    /// The wallet with its keypair and persisted nonce restored
    pub fn load(store: Arc<dyn KeyStore>, address: &str) -> Result<Self, WalletError> {
        let requested: Address = address.parse().map_err(WalletError::InvalidAddress)?;
        let record = store.load_key(&requested)?;

        let signing_key = crypto::signing_key_from_bytes(&record.secret_key)?;
        let verifying_key = VerifyingKey::from(&signing_key);
        let derived = Address::from_public_key(&verifying_key);
        if derived != requested {
            warn!("Record for {} holds a key belonging to {}", requested, derived);
            return Err(WalletError::AddressMismatch { requested, derived });
        }
        debug!("Loaded wallet {} at nonce {}", derived, record.nonce);

        Ok(Wallet {
            signing_key,
            verifying_key,
            address: derived,
            nonce: Mutex::new(record.nonce),
            store,
        })
    }

    /// Signs a transaction, assigning it the wallet's next nonce
    ///
    /// The transaction is mutated in place: its nonce is set to the wallet's
    /// current nonce and its signature to the fresh signature over the
    /// canonical digest. The wallet nonce then increments and the updated
    /// record is persisted. A wallet only ever signs its own transactions;
    /// signing for a foreign sender fails without consuming a nonce.
    ///
    /// # Arguments
    ///
    /// * `transaction` - The transaction to sign; its sender must be this
    ///   wallet's address
    ///
    /// # Returns
    ///
    /// The signature that was written into the transaction
    pub fn sign(&self, transaction: &mut Transaction) -> Result<DigitalSignature, WalletError> {
        if transaction.sender != self.address {
            warn!(
                "Wallet {} cannot sign transactions from sender {}",
                self.address, transaction.sender
            );
            return Err(WalletError::NotOwner {
                wallet: self.address.clone(),
                sender: transaction.sender.clone(),
            });
        }

        let mut nonce = self.nonce.lock().unwrap();
        let assigned = *nonce;

        // Persist first: a failed write leaves the wallet and the
        // transaction exactly as they were
        let record = WalletRecord {
            secret_key: self.signing_key.to_bytes().to_vec(),
            nonce: assigned + 1,
        };
        self.store.store_key(&self.address, &record)?;

        transaction.nonce = assigned;
        let signature = crypto::sign_message(&self.signing_key, transaction.hash().as_bytes());
        transaction.signature = Some(signature.clone());
        *nonce = assigned + 1;

        debug!(
            "Signed transaction {} with nonce {}",
            transaction.hash(),
            assigned
        );
        Ok(signature)
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Gets the nonce the next signature will carry
    pub fn nonce(&self) -> u64 {
        *self.nonce.lock().unwrap()
    }

    /// Exports the wallet's secret key as bytes
    pub fn export_secret_key(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    /// Renders the wallet as canonical JSON
    pub fn to_canonical_string(&self) -> String {
        let view = WalletView {
            address: &self.address,
            nonce: self.nonce(),
        };

        serde_json::to_string(&view).unwrap()
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}
