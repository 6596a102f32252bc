//! Ed25519 signature manager.
//!
//! Signs the packet's signed portion with a local signing key and
//! validates against any of the installed peer verifying keys. Key
//! distribution is someone else's problem (a certificate distributor hands
//! keys to [`SigMgr::add_key`]).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use tracing::warn;

use syncps_types::{sig_type, Data, SigMgr};

/// Ed25519 signer/validator.
pub struct SigMgrEdDSA {
    signing: Option<SigningKey>,
    trusted: Vec<VerifyingKey>,
}

impl SigMgrEdDSA {
    /// A validator-only manager (no signing key).
    pub fn validator() -> Self {
        Self {
            signing: None,
            trusted: Vec::new(),
        }
    }

    /// A manager around an existing 32-byte signing key. Its own verifying
    /// key is trusted, so a node accepts its own publications.
    pub fn new(signing_key: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&signing_key);
        let trusted = vec![signing.verifying_key()];
        Self {
            signing: Some(signing),
            trusted,
        }
    }

    /// A manager with a freshly generated signing key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self::new(bytes)
    }

    /// This manager's verifying key, for handing to peers.
    pub fn verifying_key(&self) -> Option<[u8; 32]> {
        self.signing.as_ref().map(|k| k.verifying_key().to_bytes())
    }
}

impl SigMgr for SigMgrEdDSA {
    fn sig_type(&self) -> u8 {
        sig_type::EDDSA
    }

    fn sign(&mut self, data: &mut Data) -> bool {
        let Some(key) = &self.signing else {
            return false;
        };
        let sig = key.sign(&data.signed_bytes());
        data.set_signature(sig_type::EDDSA, sig.to_bytes().to_vec());
        true
    }

    fn validate(&self, data: &Data) -> bool {
        if data.sig_type() != sig_type::EDDSA {
            return false;
        }
        let Ok(sig) = Signature::from_slice(data.signature()) else {
            return false;
        };
        let msg = data.signed_bytes();
        self.trusted.iter().any(|vk| vk.verify(&msg, &sig).is_ok())
    }

    fn add_key(&mut self, key: &[u8]) {
        let Ok(bytes) = <[u8; 32]>::try_from(key) else {
            warn!(len = key.len(), "ignoring verifying key of wrong length");
            return;
        };
        match VerifyingKey::from_bytes(&bytes) {
            Ok(vk) => self.trusted.push(vk),
            Err(e) => warn!(error = %e, "ignoring invalid verifying key"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncps_types::Name;

    #[test]
    fn sign_and_validate() {
        let mut sm = SigMgrEdDSA::generate();
        let d = Data::builder(Name::parse("/a"))
            .content(b"msg".to_vec())
            .sign(&mut sm)
            .unwrap();
        assert_eq!(d.signature().len(), 64);
        assert!(sm.validate(&d));
    }

    #[test]
    fn peer_key_must_be_installed() {
        let mut alice = SigMgrEdDSA::generate();
        let bob = SigMgrEdDSA::generate();
        let d = Data::builder(Name::parse("/a"))
            .content(b"msg".to_vec())
            .sign(&mut alice)
            .unwrap();

        // bob doesn't know alice yet
        assert!(!bob.validate(&d));

        let mut bob = bob;
        bob.add_key(&alice.verifying_key().unwrap());
        assert!(bob.validate(&d));
    }

    #[test]
    fn tampered_content_fails() {
        let mut sm = SigMgrEdDSA::generate();
        let mut d = Data::builder(Name::parse("/a"))
            .content(b"msg".to_vec())
            .sign(&mut sm)
            .unwrap();
        d.replace_content(b"other".to_vec());
        assert!(!sm.validate(&d));
    }

    #[test]
    fn validator_without_key_cannot_sign() {
        let mut sm = SigMgrEdDSA::validator();
        let res = Data::builder(Name::parse("/a")).sign(&mut sm);
        assert!(res.is_err());
    }

    #[test]
    fn bad_installed_keys_are_ignored() {
        let mut sm = SigMgrEdDSA::validator();
        sm.add_key(&[1, 2, 3]); // wrong length
        let mut signer = SigMgrEdDSA::generate();
        let d = Data::builder(Name::parse("/a")).sign(&mut signer).unwrap();
        assert!(!sm.validate(&d));
    }
}
