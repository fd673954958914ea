use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a wallet address (public key in base58 format)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let bytes = public_key.as_bytes();
        let encoded = bs58::encode(bytes).into_string();
        Address(encoded)
    }

    /// Converts the address back to a public key
    ///
    /// Only addresses derived from a real key decode to 32 bytes; anything
    /// else is rejected here, which makes signature checks against arbitrary
    /// identities fail closed.
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        VerifyingKey::from_bytes(&bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey("Invalid public key bytes".to_string())
        })?)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Validate that the string is a valid base58 encoding. Full key
        // validation happens at to_public_key, so external identities that
        // never sign anything (e.g. miner tags) remain representable.
        bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        Ok(Address(s.to_string()))
    }
}

/// Represents a digital signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        let bytes = signature.to_bytes();
        let encoded = bs58::encode(bytes).into_string();
        DigitalSignature(encoded)
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rebuilds a signing key from exported secret key bytes
pub fn signing_key_from_bytes(secret_key_bytes: &[u8]) -> Result<SigningKey, CryptoError> {
    let bytes_array: [u8; 32] = secret_key_bytes.try_into().map_err(|_| {
        CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
    })?;

    Ok(SigningKey::from_bytes(&bytes_array))
}

/// Signs a message with a private key
pub fn sign_message(signing_key: &SigningKey, message: &[u8]) -> DigitalSignature {
    let signature = signing_key.sign(message);
    DigitalSignature::from_signature(&signature)
}

/// Verifies a signature against a message and public key
pub fn verify_signature(
    message: &[u8],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;

    match public_key.verify(message, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        (signing_key, verifying_key)
    }

    #[test]
    fn test_address_derivation_is_stable() {
        let (_, verifying_key) = keypair();

        let first = Address::from_public_key(&verifying_key);
        let second = Address::from_public_key(&verifying_key);

        assert!(!first.0.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_keys_yield_distinct_addresses() {
        let (_, key_a) = keypair();
        let (_, key_b) = keypair();

        assert_ne!(
            Address::from_public_key(&key_a),
            Address::from_public_key(&key_b)
        );
    }

    #[test]
    fn test_signing_and_verification() {
        let (signing_key, verifying_key) = keypair();
        let message = b"Hello, world!";

        let signature = sign_message(&signing_key, message);

        let result = verify_signature(message, &signature, &verifying_key).unwrap();
        assert!(result);

        // Verify with wrong message
        let wrong_message = b"Wrong message";
        let result = verify_signature(wrong_message, &signature, &verifying_key).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_address_conversion() {
        let (_, verifying_key) = keypair();
        let address = Address::from_public_key(&verifying_key);

        // Convert address to public key
        let public_key = address.to_public_key().unwrap();

        // Check that it matches the original public key
        assert_eq!(public_key.as_bytes(), verifying_key.as_bytes());
    }

    #[test]
    fn test_external_identity_has_no_public_key() {
        // Valid base58, but not a 32-byte Ed25519 key
        let address: Address = "abcdef".parse().unwrap();

        assert!(address.to_public_key().is_err());
    }

    #[test]
    fn test_address_rejects_non_base58() {
        assert!("non_valid_address".parse::<Address>().is_err());
        assert!("0OIl".parse::<Address>().is_err());
    }

    #[test]
    fn test_signing_key_roundtrip() {
        let (signing_key, verifying_key) = keypair();

        let restored = signing_key_from_bytes(&signing_key.to_bytes()).unwrap();

        assert_eq!(VerifyingKey::from(&restored), verifying_key);
        assert!(signing_key_from_bytes(&[1, 2, 3]).is_err());
    }
}
