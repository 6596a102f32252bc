//! # syncps-core
//!
//! The SyncPS reconciliation engine: broker-less synchronization of a
//! bounded-lifetime collection of signed publications across peers sharing
//! a broadcast medium.
//!
//! Peers advertise their active set as an IBLT inside a cState interest;
//! set differences are peeled out and answered with cAdd packets carrying
//! missing publications. This crate provides:
//! - [`Iblt`] - the invertible Bloom lookup table and its wire codec
//! - [`Collection`] - the publication store, kept in lockstep with its IBLT
//! - [`SubTable`] - longest-prefix-match subscription dispatch
//! - [`SyncPs`] - the engine: publish/subscribe, reconciliation,
//!   suppression and delivery confirmation
//! - [`Face`] - the transport contract, with an in-process [`face::Segment`]
//!   mock for deterministic multi-engine tests

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collection;
mod engine;
pub mod face;
mod iblt;
mod subscription;
mod timers;

pub use collection::{Collection, Entry};
pub use engine::{
    DelivCb, GetLifetimeCb, IsExpiredCb, OrderPubCb, SubCb, SyncPs, CSTATE_LIFETIME, DIST_DELAY,
    MAX_CLOCK_SKEW, MAX_PUB_LIFETIME, MAX_PUB_SIZE,
};
pub use face::{Face, FaceEvent, Poll};
pub use iblt::{Iblt, IbltError, N_CELLS, N_HASH};
pub use subscription::SubTable;
pub use timers::{TimerId, TimerQueue};
