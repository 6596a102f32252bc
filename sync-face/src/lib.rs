//! # syncps-face
//!
//! Production faces for the SyncPS engine. Currently one flavour:
//! [`UdpMulticastFace`], which maps the broadcast-medium assumption onto an
//! IPv4 multicast group, one datagram per packet.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod udp;

use std::net::Ipv4Addr;

use thiserror::Error;

pub use udp::{UdpMulticastFace, MAX_DATAGRAM};

/// Errors from constructing a face.
#[derive(Debug, Error)]
pub enum FaceError {
    /// The supplied group address is not an IPv4 multicast address.
    #[error("{0} is not a multicast address")]
    NotMulticast(Ipv4Addr),

    /// Binding the local socket failed.
    #[error("binding multicast socket: {0}")]
    Bind(#[source] std::io::Error),

    /// Joining the multicast group failed.
    #[error("joining multicast group: {0}")]
    Join(#[source] std::io::Error),
}
