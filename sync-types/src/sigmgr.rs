//! The signature-manager capability trait.
//!
//! The sync engine never looks inside a signature; it needs exactly four
//! capabilities from whoever manages keys: sign a packet, validate a packet,
//! say whether content is encrypted, and decrypt a copy. Concrete managers
//! (null, SHA-256 integrity, Ed25519, AEAD) live in the `syncps-sigmgrs`
//! crate behind this trait.

use crate::data::Data;

/// Signature algorithm codes carried in a packet's SIG_INFO.
pub mod sig_type {
    /// SHA-256 integrity check (no key).
    pub const SHA256: u8 = 0;
    /// AEAD: authenticated encryption of the content.
    pub const AEAD: u8 = 7;
    /// Ed25519 signature.
    pub const EDDSA: u8 = 8;
    /// No signature at all.
    pub const NULL: u8 = 10;
}

/// What the engine requires of a signature manager.
///
/// One manager instance signs/validates cAdd packets, another validates
/// publications; both sides of an exchange must configure matching managers.
pub trait SigMgr {
    /// The algorithm code this manager writes into SIG_INFO.
    fn sig_type(&self) -> u8;

    /// Sign `data` in place (install SIG_VALUE, re-encode the wire).
    ///
    /// Returns false when the manager cannot sign (e.g. no signing key);
    /// the packet must not be sent in that case.
    fn sign(&mut self, data: &mut Data) -> bool;

    /// Check `data`'s signature.
    fn validate(&self, data: &Data) -> bool;

    /// Validate and, for encrypting managers, replace the content with
    /// plaintext. Used on cAdd packets before their publications are
    /// unpacked.
    fn validate_decrypt(&self, data: &mut Data) -> bool {
        self.validate(data)
    }

    /// True when this manager encrypts packet content; the engine then
    /// decrypts a copy of each publication before delivering it.
    fn encrypts_content(&self) -> bool {
        false
    }

    /// Produce a plaintext copy of `data`, or `None` when decryption fails
    /// (the publication is then not delivered).
    fn decrypt(&self, data: &Data) -> Option<Data> {
        let _ = data;
        None
    }

    /// Install a validation/group key. Managers that need no key ignore it.
    fn add_key(&mut self, key: &[u8]) {
        let _ = key;
    }
}

// Forward through boxes so a manager chosen at runtime can be handed to
// the engine like any concrete one.
impl<S: SigMgr + ?Sized> SigMgr for Box<S> {
    fn sig_type(&self) -> u8 {
        (**self).sig_type()
    }

    fn sign(&mut self, data: &mut Data) -> bool {
        (**self).sign(data)
    }

    fn validate(&self, data: &Data) -> bool {
        (**self).validate(data)
    }

    fn validate_decrypt(&self, data: &mut Data) -> bool {
        (**self).validate_decrypt(data)
    }

    fn encrypts_content(&self) -> bool {
        (**self).encrypts_content()
    }

    fn decrypt(&self, data: &Data) -> Option<Data> {
        (**self).decrypt(data)
    }

    fn add_key(&mut self, key: &[u8]) {
        (**self).add_key(key)
    }
}
