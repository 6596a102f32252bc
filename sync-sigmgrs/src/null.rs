//! The null signature manager: no signature, accept everything.
//!
//! For packets that are already protected elsewhere (or tests). Should not
//! be used for anything that crosses a real network unprotected.

use syncps_types::{sig_type, Data, SigMgr};

/// Signs nothing, accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigMgrNull;

impl SigMgrNull {
    /// Create a null manager.
    pub fn new() -> Self {
        Self
    }
}

impl SigMgr for SigMgrNull {
    fn sig_type(&self) -> u8 {
        sig_type::NULL
    }

    fn sign(&mut self, data: &mut Data) -> bool {
        data.set_signature(sig_type::NULL, Vec::new());
        true
    }

    fn validate(&self, _data: &Data) -> bool {
        true
    }
}
