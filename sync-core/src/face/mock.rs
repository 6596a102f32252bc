//! In-process broadcast segment for testing.
//!
//! A [`Segment`] models one shared medium with a virtual clock: every
//! attached [`MockFace`] hears every transmission after the segment's
//! one-way latency. Tests drive time explicitly with [`Segment::advance`]
//! and inspect traffic through the capture accessors, so multi-engine
//! scenarios run deterministically with no sockets and no sleeping.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use syncps_types::{Data, Interest, Name, Timestamp};

use super::{cadd_name, Face, FaceEvent, Poll};

/// Virtual start of time: an arbitrary fixed wall-clock instant so
/// timestamps look like production values.
const SEGMENT_EPOCH: u64 = 1_700_000_000_000_000;

#[derive(Debug)]
enum Queued {
    CState(Interest),
    CAdd { cstate: Interest, cadd: Data },
    Rit { prefix: Name, ok: bool },
}

#[derive(Debug)]
struct PitEntry {
    interest: Interest,
    expiry: Timestamp,
}

#[derive(Debug, Default)]
struct FaceState {
    registered: Vec<Name>,
    queue: BTreeMap<(Timestamp, u64), Queued>,
    /// Interests heard (our own included), keyed by the cAdd name each
    /// would elicit.
    pit: HashMap<Name, PitEntry>,
    /// Our currently expressed cState and its unanswered-expiry deadline.
    local_cstate: Option<(Name, Timestamp)>,
    /// Newest peer cState heard and when it stops being usable.
    best_cstate: Option<(Name, Timestamp)>,
    last_sent_cstate: Option<(Name, Timestamp)>,
    unsuppress: bool,
    sent_interests: Vec<Interest>,
    sent_data: Vec<Data>,
}

#[derive(Debug)]
struct SegmentInner {
    now: Timestamp,
    latency: Duration,
    seq: u64,
    faces: Vec<FaceState>,
}

/// A shared broadcast medium with a virtual clock.
#[derive(Debug, Clone)]
pub struct Segment {
    inner: Rc<RefCell<SegmentInner>>,
}

impl Default for Segment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment {
    /// A segment with zero one-way latency.
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// A segment whose transmissions arrive `latency` after sending.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SegmentInner {
                now: Timestamp::from_micros(SEGMENT_EPOCH),
                latency,
                seq: 0,
                faces: Vec::new(),
            })),
        }
    }

    /// Attach a new face to the segment.
    pub fn attach(&self) -> MockFace {
        let mut s = self.inner.borrow_mut();
        s.faces.push(FaceState::default());
        MockFace {
            inner: Rc::clone(&self.inner),
            id: s.faces.len() - 1,
        }
    }

    /// The segment's current virtual time.
    pub fn now(&self) -> Timestamp {
        self.inner.borrow().now
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, d: Duration) {
        let mut s = self.inner.borrow_mut();
        s.now = s.now + d;
    }
}

/// One attachment point on a [`Segment`].
///
/// Clones share the same attachment, so a test can keep a handle for
/// inspection while the engine owns another.
#[derive(Debug, Clone)]
pub struct MockFace {
    inner: Rc<RefCell<SegmentInner>>,
    id: usize,
}

impl MockFace {
    /// Every cAdd this face has transmitted.
    pub fn sent_data(&self) -> Vec<Data> {
        self.inner.borrow().faces[self.id].sent_data.clone()
    }

    /// Every cState this face has expressed.
    pub fn sent_interests(&self) -> Vec<Interest> {
        self.inner.borrow().faces[self.id].sent_interests.clone()
    }

    /// The most recently transmitted cAdd, if any.
    pub fn last_sent_data(&self) -> Option<Data> {
        self.inner.borrow().faces[self.id].sent_data.last().cloned()
    }

    /// Number of events waiting to be polled.
    pub fn pending_events(&self) -> usize {
        self.inner.borrow().faces[self.id].queue.len()
    }

    fn pop_queued(s: &mut SegmentInner, id: usize) -> Option<Queued> {
        let now = s.now;
        let key = *s.faces[id].queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        s.faces[id].queue.remove(&key)
    }
}

impl Face for MockFace {
    fn now(&self) -> Timestamp {
        self.inner.borrow().now
    }

    fn add_to_rit(&mut self, prefix: &Name) {
        let mut s = self.inner.borrow_mut();
        let at = s.now;
        let seq = s.seq;
        s.seq += 1;
        let f = &mut s.faces[self.id];
        f.registered.push(prefix.clone());
        f.queue.insert(
            (at, seq),
            Queued::Rit {
                prefix: prefix.clone(),
                ok: true,
            },
        );
    }

    fn express(&mut self, interest: Interest) {
        let mut s = self.inner.borrow_mut();
        let now = s.now;
        let expiry = now + interest.lifetime();
        let key = cadd_name(interest.name());

        let f = &mut s.faces[self.id];
        f.sent_interests.push(interest.clone());
        // our own PIT entry, so answering cAdds reach us
        f.pit.insert(
            key,
            PitEntry {
                interest: interest.clone(),
                expiry,
            },
        );
        f.local_cstate = Some((interest.name().clone(), expiry));

        // duplicate suppression: an identical cState already on the wire
        // within its lifetime is not re-broadcast unless unsuppressed
        let dup = !f.unsuppress
            && matches!(&f.last_sent_cstate,
                Some((n, until)) if n == interest.name() && now < *until);
        f.unsuppress = false;
        f.last_sent_cstate = Some((interest.name().clone(), expiry));
        if dup {
            return;
        }

        let due = now + s.latency;
        let seq = s.seq;
        s.seq += 1;
        for (fid, peer) in s.faces.iter_mut().enumerate() {
            if fid == self.id {
                continue;
            }
            if peer.registered.iter().any(|p| p.is_prefix_of(interest.name())) {
                peer.queue.insert((due, seq), Queued::CState(interest.clone()));
            }
        }
    }

    fn send(&mut self, data: Data) {
        let mut s = self.inner.borrow_mut();
        let now = s.now;
        s.faces[self.id].sent_data.push(data.clone());

        let due = now + s.latency;
        let seq = s.seq;
        s.seq += 1;
        for (fid, peer) in s.faces.iter_mut().enumerate() {
            if fid == self.id {
                continue;
            }
            if let Some(pe) = peer.pit.get(data.name()) {
                if pe.expiry > now {
                    peer.queue.insert(
                        (due, seq),
                        Queued::CAdd {
                            cstate: pe.interest.clone(),
                            cadd: data.clone(),
                        },
                    );
                }
            }
        }
    }

    fn best_cstate(&self, collection: &Name) -> Option<Name> {
        let s = self.inner.borrow();
        let f = &s.faces[self.id];
        match &f.best_cstate {
            Some((name, until)) if *until > s.now && collection.is_prefix_of(name) => {
                Some(name.clone())
            }
            _ => None,
        }
    }

    fn unsuppress_cstate(&mut self, _prefix: &Name) {
        self.inner.borrow_mut().faces[self.id].unsuppress = true;
    }

    fn poll(&mut self, deadline: Option<Timestamp>) -> Poll {
        let mut s = self.inner.borrow_mut();
        let now = s.now;

        // expiry of our own cState surfaces as a timeout event, but queued
        // arrivals that came first are delivered first
        let timeout_at = s.faces[self.id]
            .local_cstate
            .as_ref()
            .map(|(_, exp)| *exp)
            .filter(|exp| *exp <= now);
        let queue_at = s.faces[self.id]
            .queue
            .keys()
            .next()
            .map(|(at, _)| *at)
            .filter(|at| *at <= now);

        let take_timeout = match (timeout_at, queue_at) {
            (Some(t), Some(q)) => t < q,
            (Some(_), None) => true,
            _ => false,
        };
        if take_timeout {
            let (name, _) = s.faces[self.id].local_cstate.take().unwrap();
            return Poll::Event(FaceEvent::CStateTimeout { name });
        }

        if let Some(q) = Self::pop_queued(&mut s, self.id) {
            let ev = match q {
                Queued::CState(i) => {
                    let expiry = now + i.lifetime();
                    let f = &mut s.faces[self.id];
                    f.pit.insert(
                        cadd_name(i.name()),
                        PitEntry {
                            interest: i.clone(),
                            expiry,
                        },
                    );
                    f.best_cstate = Some((i.name().clone(), expiry));
                    FaceEvent::CState {
                        name: i.name().clone(),
                    }
                }
                Queued::CAdd { cstate, cadd } => FaceEvent::CAdd { cstate, cadd },
                Queued::Rit { prefix, ok } => FaceEvent::RitComplete { prefix, ok },
            };
            return Poll::Event(ev);
        }

        match deadline {
            Some(d) if d <= now => Poll::TimerDue,
            _ => Poll::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncps_types::Component;

    fn cstate(name: &str, iblt: &[u8], nonce: u32) -> Interest {
        Interest::new(
            Name::parse(name).append(Component::generic(iblt.to_vec())),
            Duration::from_millis(1357),
            nonce,
        )
    }

    #[test]
    fn registration_completes_via_poll() {
        let seg = Segment::new();
        let mut face = seg.attach();
        face.add_to_rit(&Name::parse("/coll"));
        match face.poll(None) {
            Poll::Event(FaceEvent::RitComplete { prefix, ok }) => {
                assert!(ok);
                assert_eq!(prefix, Name::parse("/coll"));
            }
            other => panic!("expected RitComplete, got {other:?}"),
        }
        assert!(matches!(face.poll(None), Poll::Idle));
    }

    #[test]
    fn cstates_reach_registered_peers_only() {
        let seg = Segment::new();
        let mut a = seg.attach();
        let mut b = seg.attach();
        let mut c = seg.attach();
        b.add_to_rit(&Name::parse("/coll"));
        let _ = b.poll(None); // consume RitComplete

        a.express(cstate("/coll", &[1], 1));
        assert!(matches!(
            b.poll(None),
            Poll::Event(FaceEvent::CState { .. })
        ));
        // c never registered: hears nothing
        assert!(matches!(c.poll(None), Poll::Idle));
    }

    #[test]
    fn cadd_pairs_with_pending_cstate() {
        let seg = Segment::new();
        let mut a = seg.attach();
        let mut b = seg.attach();
        b.add_to_rit(&Name::parse("/coll"));
        let _ = b.poll(None);

        let cs = cstate("/coll", &[1], 7);
        a.express(cs.clone());
        let _ = b.poll(None); // b hears the cState, PIT entry created
        assert_eq!(b.best_cstate(&Name::parse("/coll")), Some(cs.name().clone()));

        let cadd = Data::builder(cadd_name(cs.name())).content(b"pubs".to_vec()).unsigned();
        b.send(cadd.clone());
        match a.poll(None) {
            Poll::Event(FaceEvent::CAdd { cstate, cadd: got }) => {
                assert_eq!(cstate.nonce(), 7);
                assert_eq!(got, cadd);
            }
            other => panic!("expected CAdd, got {other:?}"),
        }
    }

    #[test]
    fn unanswered_cstate_times_out() {
        let seg = Segment::new();
        let mut a = seg.attach();
        a.express(cstate("/coll", &[1], 1));
        assert!(matches!(a.poll(None), Poll::Idle));
        seg.advance(Duration::from_millis(1357));
        assert!(matches!(
            a.poll(None),
            Poll::Event(FaceEvent::CStateTimeout { .. })
        ));
        // consumed: no repeat
        assert!(matches!(a.poll(None), Poll::Idle));
    }

    #[test]
    fn duplicate_cstate_suppressed_until_unsuppressed() {
        let seg = Segment::new();
        let mut a = seg.attach();
        let mut b = seg.attach();
        b.add_to_rit(&Name::parse("/coll"));
        let _ = b.poll(None);

        a.express(cstate("/coll", &[1], 1));
        assert!(matches!(b.poll(None), Poll::Event(FaceEvent::CState { .. })));

        // same name again within its lifetime: peers hear nothing
        a.express(cstate("/coll", &[1], 2));
        assert!(matches!(b.poll(None), Poll::Idle));

        a.unsuppress_cstate(&Name::parse("/coll"));
        a.express(cstate("/coll", &[1], 3));
        assert!(matches!(b.poll(None), Poll::Event(FaceEvent::CState { .. })));
    }

    #[test]
    fn deadline_reports_timer_due() {
        let seg = Segment::new();
        let mut a = seg.attach();
        let later = seg.now() + Duration::from_millis(10);
        assert!(matches!(a.poll(Some(later)), Poll::Idle));
        seg.advance(Duration::from_millis(10));
        assert!(matches!(a.poll(Some(later)), Poll::TimerDue));
    }

    #[test]
    fn latency_delays_delivery() {
        let seg = Segment::with_latency(Duration::from_millis(5));
        let mut a = seg.attach();
        let mut b = seg.attach();
        b.add_to_rit(&Name::parse("/coll"));
        let _ = b.poll(None);

        a.express(cstate("/coll", &[1], 1));
        assert!(matches!(b.poll(None), Poll::Idle));
        seg.advance(Duration::from_millis(5));
        assert!(matches!(b.poll(None), Poll::Event(FaceEvent::CState { .. })));
    }
}
