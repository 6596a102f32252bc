//! Invertible Bloom Lookup Table over 32-bit publication hashes.
//!
//! Each peer advertises its active set as an IBLT; subtracting a peer's
//! table from ours and peeling the difference yields the hashes only we
//! hold ("have") and the hashes only the peer holds ("need"). Peeling is
//! probabilistic: when the difference exceeds what the cell count can
//! resolve, a partial result comes back and the next exchange retries.
//!
//! The wire form run-length-compresses runs of all-zero cells, which keeps
//! a mostly-empty table to a handful of bytes inside the cState name.

use std::collections::BTreeSet;

use syncps_types::murmur3_32;
use thiserror::Error;

/// Hash functions per element; each element touches one cell per partition.
pub const N_HASH: usize = 3;

/// Total cell count: three partitions of 21. Sized so the encoded table
/// stays well inside a single datagram alongside the collection prefix.
pub const N_CELLS: usize = 63;

/// Seed for the cell check-hash, distinguishing it from the index hashes
/// (seeds `0..N_HASH`).
const N_HASHCHECK: u32 = 11;

/// Marker byte introducing a zero-cell run in the wire encoding. A cell
/// count of -128 cannot occur in an encoded table (only locally built,
/// insert-only tables are encoded), so the value is free for framing.
const ZERO_RUN: u8 = 0x80;

const PARTITION: usize = N_CELLS / N_HASH;

/// Errors from decoding a wire-encoded table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IbltError {
    /// Input ended mid-cell or mid-run.
    #[error("truncated IBLT encoding")]
    Truncated,

    /// The encoding does not describe exactly [`N_CELLS`] cells.
    #[error("IBLT encodes {0} cells, expected {N_CELLS}")]
    WrongCellCount(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    count: i8,
    key_sum: u32,
    hash_sum: u32,
}

impl Cell {
    fn is_zero(&self) -> bool {
        self.count == 0 && self.key_sum == 0 && self.hash_sum == 0
    }

    /// A pure cell holds exactly one element of one side of a difference.
    fn is_pure(&self) -> bool {
        (self.count == 1 || self.count == -1) && check_hash(self.key_sum) == self.hash_sum
    }

    fn apply(&mut self, key: u32, dir: i8) {
        self.count = self.count.wrapping_add(dir);
        self.key_sum ^= key;
        self.hash_sum ^= check_hash(key);
    }
}

fn check_hash(key: u32) -> u32 {
    murmur3_32(N_HASHCHECK, &key.to_le_bytes())
}

fn cell_index(hasher: usize, key: u32) -> usize {
    let slot = murmur3_32(hasher as u32, &key.to_le_bytes()) as usize % PARTITION;
    hasher * PARTITION + slot
}

/// The table itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Iblt {
    cells: [Cell; N_CELLS],
}

impl Default for Iblt {
    fn default() -> Self {
        Self::new()
    }
}

impl Iblt {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            cells: [Cell::default(); N_CELLS],
        }
    }

    /// Insert an element hash.
    pub fn insert(&mut self, key: u32) {
        self.update(key, 1);
    }

    /// Erase an element hash (decrements; inverse of [`Iblt::insert`]).
    pub fn erase(&mut self, key: u32) {
        self.update(key, -1);
    }

    fn update(&mut self, key: u32, dir: i8) {
        for i in 0..N_HASH {
            self.cells[cell_index(i, key)].apply(key, dir);
        }
    }

    /// True when every cell is zero.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_zero)
    }

    /// Cell-wise difference `self - other`.
    pub fn subtract(&self, other: &Iblt) -> Iblt {
        let mut out = self.clone();
        for (c, o) in out.cells.iter_mut().zip(&other.cells) {
            c.count = c.count.wrapping_sub(o.count);
            c.key_sum ^= o.key_sum;
            c.hash_sum ^= o.hash_sum;
        }
        out
    }

    /// Peel a difference table into `(have, need)`: element hashes unique
    /// to the left operand of the subtraction, and unique to the right.
    ///
    /// When cells with non-zero state remain after peeling, the difference
    /// was too large for the table; the returned sets are a lower bound and
    /// the caller must rely on a later exchange to finish the job.
    pub fn peel(&self) -> (BTreeSet<u32>, BTreeSet<u32>) {
        let mut t = self.clone();
        let mut have = BTreeSet::new();
        let mut need = BTreeSet::new();
        loop {
            let mut progressed = false;
            for idx in 0..N_CELLS {
                let c = t.cells[idx];
                if !c.is_pure() {
                    continue;
                }
                if c.count == 1 {
                    have.insert(c.key_sum);
                } else {
                    need.insert(c.key_sum);
                }
                t.update(c.key_sum, -c.count);
                progressed = true;
            }
            if !progressed {
                return (have, need);
            }
        }
    }

    /// Wire-encode with run-length compression of zero cells.
    pub fn rl_encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < N_CELLS {
            if self.cells[i].is_zero() {
                let mut run = 1usize;
                while i + run < N_CELLS && run < u8::MAX as usize && self.cells[i + run].is_zero()
                {
                    run += 1;
                }
                out.push(ZERO_RUN);
                out.push(run as u8);
                i += run;
            } else {
                let c = self.cells[i];
                debug_assert!(c.count != i8::MIN, "count -128 collides with run marker");
                out.push(c.count as u8);
                out.extend_from_slice(&c.key_sum.to_le_bytes());
                out.extend_from_slice(&c.hash_sum.to_le_bytes());
                i += 1;
            }
        }
        out
    }

    /// Decode a wire-encoded table. Round-trips [`Iblt::rl_encode`] exactly.
    pub fn rl_decode(bytes: &[u8]) -> Result<Iblt, IbltError> {
        let mut t = Iblt::new();
        let mut cell = 0usize;
        let mut pos = 0usize;
        while pos < bytes.len() {
            if bytes[pos] == ZERO_RUN {
                let run = *bytes.get(pos + 1).ok_or(IbltError::Truncated)? as usize;
                cell += run;
                pos += 2;
            } else {
                if cell >= N_CELLS {
                    return Err(IbltError::WrongCellCount(cell + 1));
                }
                let raw = bytes.get(pos..pos + 9).ok_or(IbltError::Truncated)?;
                t.cells[cell] = Cell {
                    count: raw[0] as i8,
                    key_sum: u32::from_le_bytes(raw[1..5].try_into().unwrap()),
                    hash_sum: u32::from_le_bytes(raw[5..9].try_into().unwrap()),
                };
                cell += 1;
                pos += 9;
            }
        }
        if cell != N_CELLS {
            return Err(IbltError::WrongCellCount(cell));
        }
        Ok(t)
    }
}

impl std::fmt::Debug for Iblt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied = self.cells.iter().filter(|c| !c.is_zero()).count();
        write!(f, "Iblt({occupied}/{N_CELLS} cells occupied)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: u32) -> Vec<u32> {
        // arbitrary but deterministic element hashes
        (0..n).map(|i| murmur3_32(77, &i.to_le_bytes())).collect()
    }

    #[test]
    fn empty_peels_to_nothing() {
        let t = Iblt::new();
        let (have, need) = t.peel();
        assert!(have.is_empty());
        assert!(need.is_empty());
        assert!(t.is_empty());
    }

    #[test]
    fn insert_then_erase_restores_empty() {
        let mut t = Iblt::new();
        for k in keys(10) {
            t.insert(k);
        }
        for k in keys(10) {
            t.erase(k);
        }
        assert!(t.is_empty());
        assert_eq!(t, Iblt::new());
    }

    #[test]
    fn peel_separates_have_and_need() {
        let mut a = Iblt::new();
        let mut b = Iblt::new();
        let ks = keys(8);
        for k in &ks[..6] {
            a.insert(*k);
        }
        for k in &ks[2..] {
            b.insert(*k);
        }
        let (have, need) = a.subtract(&b).peel();
        assert_eq!(have, ks[..2].iter().copied().collect());
        assert_eq!(need, ks[6..].iter().copied().collect());
    }

    #[test]
    fn identical_tables_diff_to_empty() {
        let mut a = Iblt::new();
        for k in keys(20) {
            a.insert(k);
        }
        let d = a.subtract(&a.clone());
        assert!(d.is_empty());
        let (have, need) = d.peel();
        assert!(have.is_empty() && need.is_empty());
    }

    #[test]
    fn wire_roundtrip() {
        let mut t = Iblt::new();
        for k in keys(5) {
            t.insert(k);
        }
        let enc = t.rl_encode();
        assert_eq!(Iblt::rl_decode(&enc).unwrap(), t);

        // empty table compresses to a few run markers and round-trips
        let empty = Iblt::new();
        let enc = empty.rl_encode();
        assert!(enc.len() <= 4);
        assert_eq!(Iblt::rl_decode(&enc).unwrap(), empty);
    }

    #[test]
    fn decode_rejects_bad_encodings() {
        assert_eq!(Iblt::rl_decode(&[ZERO_RUN]), Err(IbltError::Truncated));
        assert_eq!(
            Iblt::rl_decode(&[ZERO_RUN, 10]),
            Err(IbltError::WrongCellCount(10))
        );
        let mut t = Iblt::new();
        t.insert(12345);
        let mut enc = t.rl_encode();
        enc.pop();
        assert!(Iblt::rl_decode(&enc).is_err());
    }

    #[test]
    fn oversized_difference_peels_partially() {
        let mut a = Iblt::new();
        for k in keys(300) {
            a.insert(k);
        }
        let (have, need) = a.subtract(&Iblt::new()).peel();
        assert!(need.is_empty());
        // far too many elements for 63 cells: a strict lower bound comes back
        assert!(have.len() < 300);
    }

    #[test]
    fn fresh_insert_is_invertible() {
        let mut a = Iblt::new();
        for k in keys(15) {
            a.insert(k);
        }
        let before = a.clone();
        let h = murmur3_32(99, b"fresh");
        a.insert(h);
        a.erase(h);
        assert_eq!(a, before);
    }
}
