//! Error types for SyncPS wire handling.

use thiserror::Error;

/// Errors raised while encoding or decoding packet wire formats.
///
/// A decode error means the packet is malformed; callers drop the packet
/// and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Input ended in the middle of a TLV header or value.
    #[error("truncated wire encoding")]
    Truncated,

    /// A TLV length field is inconsistent or exceeds the 64 KiB cap.
    #[error("bad TLV length")]
    BadLength,

    /// A TLV of one type was required but another was found.
    #[error("unexpected TLV type: expected {expected}, found {found}")]
    UnexpectedType {
        /// The TLV type the decoder required.
        expected: u8,
        /// The TLV type actually present.
        found: u8,
    },

    /// A non-negative integer field has an invalid width.
    #[error("bad integer field width: {0} bytes")]
    BadInteger(usize),

    /// A name component could not be interpreted as requested.
    #[error("bad name component")]
    BadComponent,

    /// The signature manager refused to sign the packet.
    #[error("signing failed")]
    Signing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WireError::UnexpectedType {
            expected: 7,
            found: 21,
        };
        assert_eq!(err.to_string(), "unexpected TLV type: expected 7, found 21");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WireError>();
    }
}
