//! SHA-256 integrity signature manager.
//!
//! Keyless: the "signature" is a SHA-256 digest of the signed portion,
//! catching corruption and accidental mutation but not a deliberate
//! attacker. The cheapest manager that still makes tampered packets fail
//! validation.

use sha2::{Digest, Sha256};

use syncps_types::{sig_type, Data, SigMgr};

/// Integrity-only manager: digest as signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigMgrSha256;

impl SigMgrSha256 {
    /// Create a SHA-256 integrity manager.
    pub fn new() -> Self {
        Self
    }

    fn digest(data: &Data) -> Vec<u8> {
        let mut h = Sha256::new();
        h.update(data.signed_bytes());
        h.finalize().to_vec()
    }
}

impl SigMgr for SigMgrSha256 {
    fn sig_type(&self) -> u8 {
        sig_type::SHA256
    }

    fn sign(&mut self, data: &mut Data) -> bool {
        let digest = Self::digest(data);
        data.set_signature(sig_type::SHA256, digest);
        true
    }

    fn validate(&self, data: &Data) -> bool {
        data.sig_type() == sig_type::SHA256 && Self::digest(data) == data.signature()
    }
}
