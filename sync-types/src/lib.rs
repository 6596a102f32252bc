//! # syncps-types
//!
//! Wire-format types for the SyncPS collection-sync protocol.
//!
//! This crate provides the foundational types used across all SyncPS crates:
//! - [`Name`], [`Prefix`], [`Component`] - hierarchical names and filters
//! - [`Data`] (= [`Publication`]), [`Interest`] - sealed wire packets
//! - [`Timestamp`] - the single time axis (microseconds since the epoch)
//! - [`SigMgr`] - the signature-manager capability trait
//! - [`tlv`], [`murmur3_32`] - TLV primitives and protocol hashing
//! - [`WireError`] - decode/signing error type

#![warn(missing_docs)]
#![warn(clippy::all)]

mod data;
mod error;
mod hash;
mod interest;
mod name;
mod sigmgr;
pub mod tlv;
mod time;

pub use data::{Data, DataBuilder, Publication};
pub use error::WireError;
pub use hash::{hash_name, hash_pub, murmur3_32, PubHash};
pub use interest::Interest;
pub use name::{Component, Name, Prefix};
pub use sigmgr::{sig_type, SigMgr};
pub use time::Timestamp;
