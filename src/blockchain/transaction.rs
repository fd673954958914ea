use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

use super::crypto::{verify_signature, Address, DigitalSignature};
use super::hash::{digest, Digest};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Receiver/amount mismatch: {receivers} receivers, {amounts} amounts")]
    LengthMismatch { receivers: usize, amounts: usize },
}

/// Represents a transfer from one sender to one or more receivers
///
/// The hash covers every field except the signature, so the record that was
/// signed and the record that is verified are byte-identical. Amounts are
/// index-aligned with receivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address
    pub sender: Address,

    /// Receiving addresses
    pub receivers: Vec<Address>,

    /// Amount transferred to each receiver, index-aligned
    pub amounts: Vec<u64>,

    /// Nonce assigned by the sender's wallet at signing time
    pub nonce: u64,

    /// Transaction fee
    pub fee: u64,

    /// Digital signature of the transaction, null until signed
    pub signature: Option<DigitalSignature>,
}

/// The signed portion of a transaction, in canonical field order
#[derive(Serialize)]
struct SigningView<'a> {
    sender: &'a Address,
    receivers: &'a [Address],
    amounts: &'a [u64],
    nonce: u64,
    fee: u64,
}

impl Transaction {
    /// Creates a new unsigned transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `receivers` - The receiving addresses
    /// * `amounts` - The amount for each receiver, index-aligned
    /// * `fee` - The transaction fee
    ///
    /// # Returns
    ///
    /// A new Transaction with nonce 0 and no signature; the nonce is
    /// assigned by the sender's wallet when the transaction is signed
    pub fn new(
        sender: Address,
        receivers: Vec<Address>,
        amounts: Vec<u64>,
        fee: u64,
    ) -> Result<Self, TransactionError> {
        if receivers.len() != amounts.len() {
            return Err(TransactionError::LengthMismatch {
                receivers: receivers.len(),
                amounts: amounts.len(),
            });
        }

        Ok(Transaction {
            sender,
            receivers,
            amounts,
            nonce: 0,
            fee,
            signature: None,
        })
    }

    /// Encodes the signed portion of the transaction in canonical form
    pub(crate) fn signing_bytes(&self) -> Vec<u8> {
        let view = SigningView {
            sender: &self.sender,
            receivers: &self.receivers,
            amounts: &self.amounts,
            nonce: self.nonce,
            fee: self.fee,
        };

        // Plain strings and integers in a fixed field order cannot fail to encode
        serde_json::to_vec(&view).unwrap()
    }

    /// Calculates the hash of the transaction, excluding the signature
    pub fn hash(&self) -> Digest {
        digest(&self.signing_bytes())
    }

    /// Verifies the transaction's signature against its sender
    ///
    /// Recomputes the signing digest and checks the signature with the public
    /// key recovered from the sender address. Unsigned transactions, senders
    /// with no recoverable key, and tampered fields all verify false; an
    /// invalid signature is an expected outcome, not an error.
    pub fn verify(&self) -> bool {
        let signature = match &self.signature {
            Some(sig) => sig,
            None => return false,
        };

        let public_key = match self.sender.to_public_key() {
            Ok(key) => key,
            Err(err) => {
                debug!("No public key behind sender {}: {}", self.sender, err);
                return false;
            }
        };

        match verify_signature(self.hash().as_bytes(), signature, &public_key) {
            Ok(valid) => valid,
            Err(err) => {
                debug!("Undecodable signature on transaction {}: {}", self.hash(), err);
                false
            }
        }
    }

    /// Renders the transaction as canonical JSON
    pub fn to_canonical_string(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(tag: &str) -> Address {
        Address(tag.to_string())
    }

    fn unsigned() -> Transaction {
        Transaction::new(
            address("sender"),
            vec![address("ra"), address("rb")],
            vec![40, 2],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let transaction = unsigned();

        assert_eq!(transaction.sender, address("sender"));
        assert_eq!(transaction.receivers.len(), 2);
        assert_eq!(transaction.amounts, vec![40, 2]);
        assert_eq!(transaction.nonce, 0);
        assert_eq!(transaction.fee, 1);
        assert!(transaction.signature.is_none());
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = Transaction::new(
            address("sender"),
            vec![address("ra"), address("rb")],
            vec![40],
            1,
        );

        assert!(matches!(
            result,
            Err(TransactionError::LengthMismatch {
                receivers: 2,
                amounts: 1
            })
        ));
    }

    #[test]
    fn test_hash_excludes_signature() {
        let mut transaction = unsigned();
        let before = transaction.hash();

        transaction.signature = Some(DigitalSignature("sig".to_string()));

        assert_eq!(transaction.hash(), before);
    }

    #[test]
    fn test_hash_tracks_signed_fields() {
        let mut transaction = unsigned();
        let before = transaction.hash();

        transaction.nonce = 1;
        assert_ne!(transaction.hash(), before);

        transaction.nonce = 0;
        assert_eq!(transaction.hash(), before);

        transaction.amounts[0] += 1;
        assert_ne!(transaction.hash(), before);
    }

    #[test]
    fn test_canonical_encoding_is_deterministic() {
        let a = unsigned();
        let b = unsigned();

        assert_eq!(a.to_canonical_string(), b.to_canonical_string());
        assert_eq!(a.signing_bytes(), b.signing_bytes());
    }

    #[test]
    fn test_unsigned_transaction_does_not_verify() {
        assert!(!unsigned().verify());
    }

    #[test]
    fn test_unrecoverable_sender_fails_closed() {
        // "abcdef" is valid base58 but not an Ed25519 key
        let mut transaction =
            Transaction::new(address("abcdef"), vec![address("ra")], vec![1], 0).unwrap();
        transaction.signature = Some(DigitalSignature("3yZe7d".to_string()));

        assert!(!transaction.verify());
    }

    #[test]
    fn test_wire_roundtrip_keeps_signature_optional() {
        let transaction = unsigned();
        let encoded = transaction.to_canonical_string();

        // Unsigned form renders an explicit null signature
        assert!(encoded.contains("\"signature\":null"));

        let decoded: Transaction = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, transaction);

        let binary = bincode::serialize(&transaction).unwrap();
        let from_binary: Transaction = bincode::deserialize(&binary).unwrap();
        assert_eq!(from_binary, transaction);
    }
}
