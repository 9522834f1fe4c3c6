use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand_core::TryRngCore;
use std::sync::Arc;

use crate::Error;

#[derive(Clone)]
pub struct Encryptor {
    cipher: Arc<Aes256Gcm>,
}

impl Encryptor {
    /// Creates a new `Encryptor` using a 32‐byte key for AES‐256.
    pub fn new(key_bytes: &[u8]) -> Result<Self, Error> {
        if key_bytes.len() != 32 {
            return Err(Error::KeyDerivation(
                format!("AES-256 key must be 32 bytes, got {}", key_bytes.len())
            ));
        }
        let key = Key::<Aes256Gcm>::clone_from_slice(key_bytes);
        let cipher = Aes256Gcm::new(&key);

        Ok(Self {
            cipher: Arc::new(cipher),
        })
    }

    /// Builds an `Encryptor` from a base64-encoded 32-byte key, as stored in the config file.
    pub fn from_base64_key(encoded: &str) -> Result<Self, Error> {
        let key = BASE64.decode(encoded.trim())
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Self::new(&key)
    }

    /// Builds an `Encryptor` with a fresh random key. Ciphertexts produced by it
    /// only decrypt within the same process.
    pub fn generate() -> Result<Self, Error> {
        let mut key = [0u8; 32];
        OsRng.try_fill_bytes(&mut key)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
        Self::new(&key)
    }

    /// Encrypts `data` into base64(`nonce || ciphertext`).
    ///
    /// A random 12‐byte nonce is generated for every call.
    pub fn encrypt(&self, data: &str) -> Result<String, Error> {
        let mut nonce_bytes = [0u8; 12];
        let mut rng = OsRng;
        rng.try_fill_bytes(&mut nonce_bytes)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self.cipher
            .encrypt(nonce, data.as_bytes())
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypts base64(`nonce || ciphertext`) back into a `String`.
    pub fn decrypt(&self, encrypted_data: &str) -> Result<String, Error> {
        let data = BASE64.decode(encrypted_data.trim())
            .map_err(|e| Error::Decryption(e.to_string()))?;

        if data.len() < 12 {
            return Err(Error::Decryption(
                "Ciphertext too short (missing nonce)".to_owned()
            ));
        }
        let (nonce_bytes, ciphertext) = data.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| Error::Decryption(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::Decryption(e.to_string()))
    }
}
