//! AEAD signature manager: XChaCha20-Poly1305 content protection.
//!
//! Peers holding the shared group key can read and produce packets; anyone
//! else gets authentication failures. The per-packet key is derived with
//! HKDF-SHA256 from the group key and the packet name, so a packet cannot
//! be replayed under a different name. The random 192-bit nonce rides in
//! the signature field; the Poly1305 tag is appended to the ciphertext.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

use syncps_types::{sig_type, Data, SigMgr};

/// Size of the derived per-packet key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the XChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Group-keyed AEAD manager.
pub struct SigMgrAead {
    group_key: [u8; KEY_SIZE],
}

impl SigMgrAead {
    /// A manager over an existing group key.
    pub fn new(group_key: [u8; KEY_SIZE]) -> Self {
        Self { group_key }
    }

    /// A manager with a freshly generated group key (for tests and demos;
    /// real deployments get the key from a key distributor).
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        getrandom::getrandom(&mut key).expect("getrandom failed");
        Self::new(key)
    }

    /// The group key, for handing to the other members.
    pub fn group_key(&self) -> &[u8; KEY_SIZE] {
        &self.group_key
    }

    /// Derive the per-packet key: HKDF-SHA256 over the group key, salted
    /// for domain separation, with the packet name as info.
    fn packet_key(&self, data: &Data) -> [u8; KEY_SIZE] {
        let hk = Hkdf::<Sha256>::new(Some(b"syncps-aead-v1"), &self.group_key);
        let mut key = [0u8; KEY_SIZE];
        hk.expand(&data.name().encode(), &mut key)
            .expect("HKDF expand with valid lengths");
        key
    }
}

impl SigMgr for SigMgrAead {
    fn sig_type(&self) -> u8 {
        sig_type::AEAD
    }

    fn sign(&mut self, data: &mut Data) -> bool {
        let key = self.packet_key(data);
        let mut nonce = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce).expect("getrandom failed");

        let Ok(cipher) = XChaCha20Poly1305::new_from_slice(&key) else {
            return false;
        };
        let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), data.content()) else {
            return false;
        };
        data.replace_content(ciphertext);
        data.set_signature(sig_type::AEAD, nonce.to_vec());
        true
    }

    fn validate(&self, data: &Data) -> bool {
        self.decrypt(data).is_some()
    }

    fn validate_decrypt(&self, data: &mut Data) -> bool {
        match self.decrypt(data) {
            Some(plain) => {
                *data = plain;
                true
            }
            None => false,
        }
    }

    fn encrypts_content(&self) -> bool {
        true
    }

    fn decrypt(&self, data: &Data) -> Option<Data> {
        if data.sig_type() != sig_type::AEAD || data.signature().len() != NONCE_SIZE {
            return None;
        }
        let key = self.packet_key(data);
        let cipher = XChaCha20Poly1305::new_from_slice(&key).ok()?;
        let nonce = XNonce::from_slice(data.signature());
        let plaintext = cipher.decrypt(nonce, data.content()).ok()?;
        let mut copy = data.clone();
        copy.replace_content(plaintext);
        Some(copy)
    }
}
