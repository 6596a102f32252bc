//! # syncps-sigmgrs
//!
//! Concrete signature managers for SyncPS, behind the
//! [`SigMgr`](syncps_types::SigMgr) capability trait:
//! - [`SigMgrNull`] - no signature, accept-all (tests, pre-signed certs)
//! - [`SigMgrSha256`] - keyless SHA-256 integrity digest
//! - [`SigMgrEdDSA`] - Ed25519 signatures with installable peer keys
//! - [`SigMgrAead`] - XChaCha20-Poly1305 group-key content encryption
//!
//! An engine takes two managers: one for cAdd packets, one for
//! publications; both ends of an exchange must configure matching kinds.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod aead;
mod eddsa;
mod null;
mod sha256;

pub use aead::{SigMgrAead, KEY_SIZE, NONCE_SIZE};
pub use eddsa::SigMgrEdDSA;
pub use null::SigMgrNull;
pub use sha256::SigMgrSha256;
