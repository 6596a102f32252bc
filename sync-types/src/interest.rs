//! Interest packets: the cState carrier.
//!
//! A collection-state advertisement is an Interest whose name is the
//! collection prefix with the encoded IBLT appended. The nonce
//! distinguishes re-expressions; the lifetime bounds how long peers hold it.

use std::time::Duration;

use crate::error::WireError;
use crate::name::Name;
use crate::tlv::{self, typ, TlvReader, TlvWriter};

/// A sealed Interest packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    name: Name,
    nonce: u32,
    lifetime: Duration,
    wire: Vec<u8>,
}

impl Interest {
    /// Build and seal an Interest.
    pub fn new(name: Name, lifetime: Duration, nonce: u32) -> Self {
        let mut inner = TlvWriter::new();
        inner.put(typ::NAME, &name.encode_value());
        inner.put(typ::NONCE, &nonce.to_be_bytes());
        inner.put_uint(typ::INTEREST_LIFETIME, lifetime.as_millis() as u64);

        let mut outer = TlvWriter::new();
        outer.put(typ::INTEREST, inner.as_slice());

        Self {
            name,
            nonce,
            lifetime,
            wire: outer.into_bytes(),
        }
    }

    /// Parse a complete INTEREST TLV.
    pub fn from_wire(bytes: &[u8]) -> Result<Interest, WireError> {
        let mut outer = TlvReader::new(bytes);
        let (typ_, whole, value) = outer.next_raw()?;
        if typ_ != typ::INTEREST {
            return Err(WireError::UnexpectedType {
                expected: typ::INTEREST,
                found: typ_,
            });
        }

        let mut r = TlvReader::new(value);
        let name = Name::decode_value(r.expect(typ::NAME)?)?;
        let nonce_bytes = r.expect(typ::NONCE)?;
        if nonce_bytes.len() != 4 {
            return Err(WireError::BadLength);
        }
        let nonce = u32::from_be_bytes(nonce_bytes.try_into().unwrap());
        let lifetime_ms = tlv::uint_from_be(r.expect(typ::INTEREST_LIFETIME)?)?;

        Ok(Interest {
            name,
            nonce,
            lifetime: Duration::from_millis(lifetime_ms),
            wire: whole.to_vec(),
        })
    }

    /// The interest name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The 32-bit nonce.
    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// How long peers should hold this interest.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// The complete wire encoding.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }
}
