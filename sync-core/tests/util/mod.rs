//! Shared harness for engine scenario tests: engines on one mock segment,
//! stepped through virtual time deterministically.

use std::time::Duration;

use syncps_core::face::{MockFace, Segment};
use syncps_core::SyncPs;
use syncps_sigmgrs::SigMgrNull;
use syncps_types::Name;

/// An engine with null signature managers, started on `seg`.
pub fn engine(seg: &Segment, coll: &str) -> (SyncPs, MockFace) {
    let face = seg.attach();
    let handle = face.clone();
    let mut e = SyncPs::new(
        face,
        Name::parse(coll),
        SigMgrNull::new(),
        SigMgrNull::new(),
    );
    e.start();
    (e, handle)
}

/// Drain every engine until nothing remains runnable at the current
/// instant.
pub fn settle(engines: &mut [&mut SyncPs]) {
    loop {
        let mut worked = false;
        for e in engines.iter_mut() {
            while e.poll_once() {
                worked = true;
            }
        }
        if !worked {
            break;
        }
    }
}

/// Advance virtual time in 1 ms steps for `total`, draining engines at
/// each step.
pub fn run_for(seg: &Segment, engines: &mut [&mut SyncPs], total: Duration) {
    let step = Duration::from_millis(1);
    let mut elapsed = Duration::ZERO;
    settle(engines);
    while elapsed < total {
        seg.advance(step);
        elapsed += step;
        settle(engines);
    }
}
