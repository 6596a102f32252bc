//! Hierarchical names and prefixes.
//!
//! A [`Name`] is an ordered list of typed components. Publications carry a
//! timestamp as their final component; cState names end in an encoded IBLT;
//! cAdd names end in a version component holding a hash of the cState they
//! answer. Subscription routing is prefix matching over names.

use std::fmt;

use crate::error::WireError;
use crate::time::Timestamp;
use crate::tlv::{self, typ, TlvReader, TlvWriter};

/// One name component: a TLV type plus opaque value bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    typ: u8,
    val: Vec<u8>,
}

impl Component {
    /// An opaque (generic) component.
    pub fn generic(val: impl Into<Vec<u8>>) -> Self {
        Self {
            typ: typ::GENERIC_COMPONENT,
            val: val.into(),
        }
    }

    /// A timestamp component (microseconds since the epoch).
    pub fn timestamp(ts: Timestamp) -> Self {
        Self {
            typ: typ::TIMESTAMP_COMPONENT,
            val: tlv::uint_to_be(ts.as_micros()),
        }
    }

    /// A version component carrying a 32-bit value.
    pub fn version(v: u32) -> Self {
        Self {
            typ: typ::VERSION_COMPONENT,
            val: tlv::uint_to_be(v as u64),
        }
    }

    /// The component's TLV type.
    pub fn typ(&self) -> u8 {
        self.typ
    }

    /// The component's value bytes.
    pub fn val(&self) -> &[u8] {
        &self.val
    }

    /// Interpret as a timestamp, if this is a timestamp component.
    pub fn as_timestamp(&self) -> Result<Timestamp, WireError> {
        if self.typ != typ::TIMESTAMP_COMPONENT {
            return Err(WireError::BadComponent);
        }
        tlv::uint_from_be(&self.val).map(Timestamp::from_micros)
    }

    /// Interpret as a version value, if this is a version component.
    pub fn as_version(&self) -> Result<u32, WireError> {
        if self.typ != typ::VERSION_COMPONENT {
            return Err(WireError::BadComponent);
        }
        let v = tlv::uint_from_be(&self.val)?;
        u32::try_from(v).map_err(|_| WireError::BadComponent)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            typ::TIMESTAMP_COMPONENT => match self.as_timestamp() {
                Ok(ts) => write!(f, "@{}", ts.as_micros()),
                Err(_) => write!(f, "@?"),
            },
            typ::VERSION_COMPONENT => match self.as_version() {
                Ok(v) => write!(f, "v={v:08x}"),
                Err(_) => write!(f, "v=?"),
            },
            _ => {
                if !self.val.is_empty() && self.val.iter().all(|b| b.is_ascii_graphic()) {
                    write!(f, "{}", String::from_utf8_lossy(&self.val))
                } else {
                    write!(f, "x")?;
                    for b in &self.val {
                        write!(f, "{b:02x}")?;
                    }
                    Ok(())
                }
            }
        }
    }
}

/// A hierarchical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    comps: Vec<Component>,
}

impl Name {
    /// The empty name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name from components.
    pub fn from_components(comps: Vec<Component>) -> Self {
        Self { comps }
    }

    /// Parse a `/`-separated string of generic components.
    ///
    /// `"/demo/a"` becomes two generic components; the empty string or `"/"`
    /// is the empty name.
    pub fn parse(s: &str) -> Self {
        let comps = s
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| Component::generic(seg.as_bytes().to_vec()))
            .collect();
        Self { comps }
    }

    /// Append a component, builder style.
    pub fn append(mut self, c: Component) -> Self {
        self.comps.push(c);
        self
    }

    /// Append a component in place.
    pub fn push(&mut self, c: Component) {
        self.comps.push(c);
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.comps.len()
    }

    /// True when there are no components.
    pub fn is_empty(&self) -> bool {
        self.comps.is_empty()
    }

    /// Component at position `i`.
    pub fn get(&self, i: usize) -> Option<&Component> {
        self.comps.get(i)
    }

    /// The final component.
    pub fn last(&self) -> Option<&Component> {
        self.comps.last()
    }

    /// A copy of the first `n` components (all of them if `n` exceeds the
    /// length).
    pub fn first_n(&self, n: usize) -> Name {
        Name {
            comps: self.comps.iter().take(n).cloned().collect(),
        }
    }

    /// True when every component of `self` equals the corresponding leading
    /// component of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.comps.len() <= other.comps.len()
            && self.comps.iter().zip(&other.comps).all(|(a, b)| a == b)
    }

    /// Encode as the *value* of a NAME TLV (concatenated component TLVs).
    pub fn encode_value(&self) -> Vec<u8> {
        let mut w = TlvWriter::new();
        for c in &self.comps {
            w.put(c.typ, &c.val);
        }
        w.into_bytes()
    }

    /// Encode as a complete NAME TLV.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.put(typ::NAME, &self.encode_value());
        w.into_bytes()
    }

    /// Decode from the value of a NAME TLV.
    pub fn decode_value(value: &[u8]) -> Result<Name, WireError> {
        let mut r = TlvReader::new(value);
        let mut comps = Vec::new();
        while !r.done() {
            let (typ, val) = r.next()?;
            comps.push(Component {
                typ,
                val: val.to_vec(),
            });
        }
        Ok(Name { comps })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comps.is_empty() {
            return write!(f, "/");
        }
        for c in &self.comps {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

/// A name used as a subscription key.
///
/// Wrapping keeps "this is a filter" distinct from "this is a packet name"
/// at API boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prefix(Name);

impl Prefix {
    /// Wrap a name as a prefix.
    pub fn new(name: Name) -> Self {
        Self(name)
    }

    /// The underlying name.
    pub fn name(&self) -> &Name {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when this prefix matches `name`.
    pub fn is_prefix_of(&self, name: &Name) -> bool {
        self.0.is_prefix_of(name)
    }
}

impl From<Name> for Prefix {
    fn from(n: Name) -> Self {
        Self(n)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
