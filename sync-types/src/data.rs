//! Publication and cAdd packets.
//!
//! A [`Data`] is a named, signed, immutable byte payload. Publications are
//! Data packets whose final name component is a timestamp; cAdds are Data
//! packets whose content is a concatenation of publication Data records.
//! Identity is the wire form: two Data with the same bytes are the same
//! object, and the 32-bit publication hash is taken over those bytes.

use std::fmt;

use crate::error::WireError;
use crate::name::Name;
use crate::sigmgr::{sig_type, SigMgr};
use crate::tlv::{self, typ, TlvReader, TlvWriter};

/// A publication is just a Data packet; the original protocol makes the
/// same identification.
pub type Publication = Data;

/// A sealed Data packet.
///
/// Sealed means the wire bytes are fixed: a Data is produced either by
/// parsing received bytes ([`Data::from_wire`]) or by a [`DataBuilder`]
/// finishing with a signature. The only sanctioned later mutation is
/// [`Data::replace_content`], used by content-encrypting signature managers
/// on ephemeral copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    name: Name,
    content_type: u8,
    content: Vec<u8>,
    sig_type: u8,
    signature: Vec<u8>,
    wire: Vec<u8>,
}

impl Data {
    /// Start building a Data with the given name.
    pub fn builder(name: Name) -> DataBuilder {
        DataBuilder {
            name,
            content_type: tlv::content_type::BLOB,
            content: Vec::new(),
        }
    }

    /// Parse a complete DATA TLV.
    pub fn from_wire(bytes: &[u8]) -> Result<Data, WireError> {
        let mut outer = TlvReader::new(bytes);
        let (typ_, whole, value) = outer.next_raw()?;
        if typ_ != typ::DATA {
            return Err(WireError::UnexpectedType {
                expected: typ::DATA,
                found: typ_,
            });
        }

        let mut r = TlvReader::new(value);
        let name = Name::decode_value(r.expect(typ::NAME)?)?;
        let content_type = tlv::uint_from_be(r.expect(typ::CONTENT_TYPE)?)?;
        let content_type = u8::try_from(content_type).map_err(|_| WireError::BadLength)?;
        let content = r.expect(typ::CONTENT)?.to_vec();

        let si = r.expect(typ::SIG_INFO)?;
        let mut si_r = TlvReader::new(si);
        let sig_type = tlv::uint_from_be(si_r.expect(typ::SIG_TYPE)?)?;
        let sig_type = u8::try_from(sig_type).map_err(|_| WireError::BadLength)?;

        let signature = r.expect(typ::SIG_VALUE)?.to_vec();

        Ok(Data {
            name,
            content_type,
            content,
            sig_type,
            signature,
            wire: whole.to_vec(),
        })
    }

    /// The packet name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The content type code (see [`tlv::content_type`]).
    pub fn content_type(&self) -> u8 {
        self.content_type
    }

    /// The payload bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The signature algorithm code (see [`sig_type`]).
    pub fn sig_type(&self) -> u8 {
        self.sig_type
    }

    /// The signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The complete wire encoding.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Wire size in bytes; the quantity cAdd packing is limited by.
    pub fn size(&self) -> usize {
        self.wire.len()
    }

    /// The bytes a signature covers: name, content type, content and
    /// signature info, as encoded on the wire.
    pub fn signed_bytes(&self) -> Vec<u8> {
        encode_signed_portion(&self.name, self.content_type, &self.content, self.sig_type)
    }

    /// Install a signature and refresh the wire encoding.
    ///
    /// Called by signature managers while sealing a packet.
    pub fn set_signature(&mut self, sig_type: u8, signature: Vec<u8>) {
        self.sig_type = sig_type;
        self.signature = signature;
        self.rebuild_wire();
    }

    /// Swap the payload and refresh the wire encoding.
    ///
    /// For encrypting signature managers transforming an ephemeral copy;
    /// the signature field is left as-is.
    pub fn replace_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.rebuild_wire();
    }

    fn rebuild_wire(&mut self) {
        let mut inner =
            encode_signed_portion(&self.name, self.content_type, &self.content, self.sig_type);
        let mut w = TlvWriter::new();
        w.put(typ::SIG_VALUE, &self.signature);
        inner.extend_from_slice(w.as_slice());

        let mut outer = TlvWriter::new();
        outer.put(typ::DATA, &inner);
        self.wire = outer.into_bytes();
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}B)", self.name, self.size())
    }
}

fn encode_signed_portion(name: &Name, content_type: u8, content: &[u8], sig_type: u8) -> Vec<u8> {
    let mut w = TlvWriter::new();
    w.put(typ::NAME, &name.encode_value());
    w.put_uint(typ::CONTENT_TYPE, content_type as u64);
    w.put(typ::CONTENT, content);

    let mut si = TlvWriter::new();
    si.put_uint(typ::SIG_TYPE, sig_type as u64);
    w.put(typ::SIG_INFO, si.as_slice());

    w.into_bytes()
}

/// Assembles a Data packet, finishing with a signature.
#[derive(Debug)]
pub struct DataBuilder {
    name: Name,
    content_type: u8,
    content: Vec<u8>,
}

impl DataBuilder {
    /// Set the content type code.
    pub fn content_type(mut self, ct: u8) -> Self {
        self.content_type = ct;
        self
    }

    /// Set the payload.
    pub fn content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Seal without a signature (null signature type).
    pub fn unsigned(self) -> Data {
        self.sealed(sig_type::NULL)
    }

    /// Seal by signing with `sm`.
    pub fn sign(self, sm: &mut dyn SigMgr) -> Result<Data, WireError> {
        let mut d = self.sealed(sm.sig_type());
        if sm.sign(&mut d) {
            Ok(d)
        } else {
            Err(WireError::Signing)
        }
    }

    fn sealed(self, sig_type: u8) -> Data {
        let mut d = Data {
            name: self.name,
            content_type: self.content_type,
            content: self.content,
            sig_type,
            signature: Vec::new(),
            wire: Vec::new(),
        };
        d.rebuild_wire();
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;
    use crate::time::Timestamp;

    fn sample() -> Data {
        Data::builder(
            Name::parse("/demo/a").append(Component::timestamp(Timestamp::from_micros(42))),
        )
        .content(b"payload".to_vec())
        .unsigned()
    }

    #[test]
    fn wire_roundtrip() {
        let d = sample();
        let back = Data::from_wire(d.wire()).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.content(), b"payload");
        assert_eq!(back.sig_type(), sig_type::NULL);
        assert_eq!(back.size(), d.wire().len());
    }

    #[test]
    fn identical_builds_share_wire_bytes() {
        assert_eq!(sample().wire(), sample().wire());
    }

    #[test]
    fn signed_bytes_exclude_signature() {
        let mut d = sample();
        d.set_signature(sig_type::SHA256, vec![0xAA; 32]);
        let signed = d.signed_bytes();
        // the signed portion is a strict prefix of the wire's DATA value
        assert!(signed.len() < d.wire().len());
        let back = Data::from_wire(d.wire()).unwrap();
        assert_eq!(back.signature(), &[0xAA; 32][..]);
        assert_eq!(back.sig_type(), sig_type::SHA256);
        assert_eq!(back.signed_bytes(), signed);
    }

    #[test]
    fn replace_content_reencodes() {
        let mut d = sample();
        let old_wire = d.wire().to_vec();
        d.replace_content(b"clear".to_vec());
        assert_ne!(d.wire(), &old_wire[..]);
        assert_eq!(Data::from_wire(d.wire()).unwrap().content(), b"clear");
    }

    #[test]
    fn garbage_rejected() {
        assert!(Data::from_wire(&[0xFF, 0x01, 0x00]).is_err());
        assert!(Data::from_wire(&[]).is_err());
        let d = sample();
        let truncated = &d.wire()[..d.wire().len() - 2];
        assert!(Data::from_wire(truncated).is_err());
    }
}
