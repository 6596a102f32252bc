//! The sync engine: reconciliation over one collection.
//!
//! A [`SyncPs`] keeps a bounded-lifetime collection of signed publications
//! converged across whoever shares the broadcast medium. It advertises its
//! active set as an IBLT inside a cState interest, answers peers' cStates
//! with cAdd packets carrying the publications they lack, and dispatches
//! arriving publications to subscribers by longest prefix match.
//!
//! Everything runs on one thread: `run()` loops over `poll_once()`, which
//! fires due timers and handles face events serially. Handlers observe all
//! engine state atomically; control yields only between events.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use syncps_types::tlv::TlvReader;
use syncps_types::{
    hash_pub, tlv, Component, Data, Interest, Name, Prefix, PubHash, Publication, SigMgr,
    Timestamp, WireError,
};

use crate::collection::Collection;
use crate::face::{cadd_name, Face, FaceEvent, Poll};
use crate::iblt::Iblt;
use crate::subscription::SubTable;
use crate::timers::{TimerId, TimerQueue};

/// Max payload bytes in one cAdd (1448 B MTU less IBLT and overhead).
pub const MAX_PUB_SIZE: usize = 1024;
/// Default publication lifetime.
pub const MAX_PUB_LIFETIME: Duration = Duration::from_secs(2);
/// Assumed bound on clock disagreement between peers.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(1);
/// Time for one transmission to reach every member of the subnet.
pub const DIST_DELAY: Duration = Duration::from_millis(50);
/// Default lifetime of an expressed cState.
pub const CSTATE_LIFETIME: Duration = Duration::from_millis(1357);

/// Subscriber callback: receives the engine (so handlers may publish) and
/// the arriving publication.
pub type SubCb = Rc<RefCell<dyn FnMut(&mut SyncPs, &Publication)>>;

/// Delivery callback for confirmed publishes: the publication and whether
/// it reached at least one peer before its lifetime ran out.
pub type DelivCb = Box<dyn FnMut(&Publication, bool)>;

/// Hook overriding per-publication lifetime.
pub type GetLifetimeCb = Box<dyn Fn(&Publication) -> Duration>;

/// Hook overriding expiry determination; receives the current time.
pub type IsExpiredCb = Box<dyn Fn(&Publication, Timestamp) -> bool>;

/// Hook ordering cAdd candidates. First vector: locally originated pubs;
/// second: others' pubs (empty unless a relay chooses to forward). Returns
/// whether anything should be sent.
pub type OrderPubCb = Box<dyn FnMut(&mut Vec<Publication>, &mut Vec<Publication>) -> bool>;

enum EngineTimer {
    DeliveryTimeout(PubHash),
    Deactivate(PubHash),
    Erase(PubHash),
    ForgetIgnored(PubHash),
    SendCState,
    App(Box<dyn FnOnce(&mut SyncPs)>),
}

/// The per-collection sync engine.
pub struct SyncPs {
    face: Box<dyn Face>,
    coll_name: Name,
    pkt_sigmgr: Box<dyn SigMgr>,
    pub_sigmgr: Box<dyn SigMgr>,

    pubs: Collection<Publication>,
    pub_cbs: Collection<DelivCb>,
    subscriptions: SubTable<SubCb>,
    timers: TimerQueue<EngineTimer>,

    cstate_lifetime: Duration,
    pub_lifetime: Duration,
    pub_expiration_gb: Duration,

    scheduled_cstate: Option<TimerId>,
    nonce: u32,
    publications: u32,
    delivering: bool,
    registering: bool,
    auto_start: bool,
    started: bool,
    stopped: bool,

    get_lifetime_cb: Option<GetLifetimeCb>,
    is_expired_cb: Option<IsExpiredCb>,
    order_pub_cb: Option<OrderPubCb>,
}

impl SyncPs {
    /// Create an engine for `coll_name` on `face`. `pkt_sigmgr` signs and
    /// validates cAdd packets; `pub_sigmgr` validates publications.
    pub fn new(
        face: impl Face + 'static,
        coll_name: Name,
        pkt_sigmgr: impl SigMgr + 'static,
        pub_sigmgr: impl SigMgr + 'static,
    ) -> Self {
        Self {
            face: Box::new(face),
            coll_name,
            pkt_sigmgr: Box::new(pkt_sigmgr),
            pub_sigmgr: Box::new(pub_sigmgr),
            pubs: Collection::new(),
            pub_cbs: Collection::new(),
            subscriptions: SubTable::new(),
            timers: TimerQueue::new(),
            cstate_lifetime: CSTATE_LIFETIME,
            pub_lifetime: MAX_PUB_LIFETIME,
            pub_expiration_gb: MAX_PUB_LIFETIME,
            scheduled_cstate: None,
            nonce: 0,
            publications: 0,
            delivering: false,
            registering: true,
            auto_start: true,
            started: false,
            stopped: false,
            get_lifetime_cb: None,
            is_expired_cb: None,
            order_pub_cb: None,
        }
    }

    // --- tunables and hooks -------------------------------------------

    /// Set the lifetime of expressed cStates.
    pub fn cstate_lifetime(&mut self, d: Duration) -> &mut Self {
        self.cstate_lifetime = d;
        self
    }

    /// Set the default publication lifetime.
    pub fn pub_lifetime(&mut self, d: Duration) -> &mut Self {
        self.pub_lifetime = d;
        self
    }

    /// Set how long after expiry a publication entry is garbage-collected
    /// (never below the clock-skew bound).
    pub fn pub_expiration_gb(&mut self, d: Duration) -> &mut Self {
        self.pub_expiration_gb = d.max(MAX_CLOCK_SKEW);
        self
    }

    /// Override per-publication lifetime.
    pub fn get_lifetime_cb(&mut self, f: impl Fn(&Publication) -> Duration + 'static) -> &mut Self {
        self.get_lifetime_cb = Some(Box::new(f));
        self
    }

    /// Override expiry determination.
    pub fn is_expired_cb(
        &mut self,
        f: impl Fn(&Publication, Timestamp) -> bool + 'static,
    ) -> &mut Self {
        self.is_expired_cb = Some(Box::new(f));
        self
    }

    /// Override cAdd candidate ordering and the forward-others'-pubs
    /// decision.
    pub fn order_pub_cb(
        &mut self,
        f: impl FnMut(&mut Vec<Publication>, &mut Vec<Publication>) -> bool + 'static,
    ) -> &mut Self {
        self.order_pub_cb = Some(Box::new(f));
        self
    }

    /// Control whether `run()` calls `start()` automatically.
    pub fn auto_start(&mut self, yes: bool) -> &mut Self {
        self.auto_start = yes;
        self
    }

    // --- public operations --------------------------------------------

    /// Build a publication in this collection: appends the timestamp name
    /// component and signs with the publication signature manager.
    pub fn make_publication(
        &mut self,
        name: Name,
        content: impl Into<Vec<u8>>,
    ) -> Result<Publication, WireError> {
        let ts = self.face.now();
        Data::builder(name.append(Component::timestamp(ts)))
            .content(content)
            .sign(self.pub_sigmgr.as_mut())
    }

    /// Add a signed publication to the active set and push it to the
    /// network. Returns the publication hash, or 0 when it was already
    /// present (publishing twice is a no-op).
    pub fn publish(&mut self, p: Publication) -> PubHash {
        let h = self.add_to_active(p, true);
        if h == 0 {
            return 0;
        }
        self.publications = self.publications.wrapping_add(1);
        trace!(hash = h, "published");
        // push now if a peer cState is pending; otherwise advertise
        if !self.delivering && !self.registering && !self.send_cadd() {
            self.send_cstate_soon(Duration::ZERO);
        }
        h
    }

    /// Like [`SyncPs::publish`], additionally firing `cb` exactly once:
    /// with true as soon as some peer provably holds the publication, or
    /// with false when its lifetime ends unconfirmed.
    pub fn publish_confirmed(
        &mut self,
        p: Publication,
        cb: impl FnMut(&Publication, bool) + 'static,
    ) -> PubHash {
        let h = self.publish(p);
        if h != 0 {
            self.pub_cbs.add_local(h, Box::new(cb));
        }
        h
    }

    /// Subscribe `cb` to publications under `topic`. A new subscription is
    /// immediately given every active network-received publication it
    /// matches; re-subscribing the same prefix just replaces the callback.
    pub fn subscribe(
        &mut self,
        topic: Prefix,
        cb: impl FnMut(&mut SyncPs, &Publication) + 'static,
    ) -> &mut Self {
        let cb: SubCb = Rc::new(RefCell::new(cb));
        if self.subscriptions.contains(&topic) {
            self.subscriptions.insert(topic, cb);
            return self;
        }
        let mut existing: Vec<Publication> = self
            .pubs
            .iter()
            .filter(|(_, e)| e.from_net() && topic.is_prefix_of(e.item().name()))
            .map(|(_, e)| e.item().clone())
            .collect();
        // catch-up deliveries arrive oldest first, independent of how the
        // store iterates
        existing.sort_by(|a, b| {
            pub_timestamp(a)
                .cmp(&pub_timestamp(b))
                .then_with(|| a.name().encode().cmp(&b.name().encode()))
        });
        for p in existing {
            self.deliver(&p, &cb);
        }
        self.subscriptions.insert(topic, cb);
        self
    }

    /// Drop the subscription under `topic`.
    pub fn unsubscribe(&mut self, topic: &Prefix) -> &mut Self {
        self.subscriptions.remove(topic);
        self
    }

    /// Schedule a cancelable callback `after` from now.
    pub fn schedule(&mut self, after: Duration, f: impl FnOnce(&mut SyncPs) + 'static) -> TimerId {
        let at = self.face.now() + after;
        self.timers.schedule(at, EngineTimer::App(Box::new(f)))
    }

    /// Schedule a fire-and-forget callback `after` from now.
    pub fn one_time(&mut self, after: Duration, f: impl FnOnce(&mut SyncPs) + 'static) {
        let _ = self.schedule(after, f);
    }

    /// Cancel a timer created with [`SyncPs::schedule`]; true when it had
    /// not yet fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Register with the face for inbound collection traffic. No protocol
    /// traffic flows until registration completes.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let prefix = self.coll_name.clone();
        self.face.add_to_rit(&prefix);
    }

    /// Process one pending timer or face event. Returns false when there
    /// was nothing to do.
    pub fn poll_once(&mut self) -> bool {
        let now = self.face.now();
        if let Some(t) = self.timers.pop_due(now) {
            self.fire_timer(t);
            return true;
        }
        match self.face.poll(self.timers.next_deadline()) {
            Poll::Event(ev) => {
                self.handle_event(ev);
                true
            }
            Poll::TimerDue => true,
            Poll::Idle => false,
        }
    }

    /// Run the event loop until [`SyncPs::stop`] or nothing remains to do.
    pub fn run(&mut self) {
        if self.auto_start {
            self.start();
        }
        while !self.stopped {
            if !self.poll_once() {
                break;
            }
        }
    }

    /// Make `run()` return after the current handler.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    // --- diagnostics ---------------------------------------------------

    /// The collection this engine synchronizes.
    pub fn collection_name(&self) -> &Name {
        &self.coll_name
    }

    /// Number of active publications (local and received).
    pub fn active_count(&self) -> usize {
        self.pubs.iter().filter(|(_, e)| e.active()).count()
    }

    /// Whether a wire-identical publication is currently known (active,
    /// expired-but-held, or ignored).
    pub fn contains_pub(&self, p: &Publication) -> bool {
        self.pubs.contains(hash_pub(p))
    }

    /// True once face registration has completed.
    pub fn is_registered(&self) -> bool {
        !self.registering
    }

    /// Diagnostic: both stores still match their set-summary tables.
    pub fn collection_consistent(&self) -> bool {
        self.pubs.is_coherent() && self.pub_cbs.is_coherent()
    }

    // --- internals -----------------------------------------------------

    fn lifetime_of(&self, p: &Publication) -> Duration {
        match &self.get_lifetime_cb {
            Some(f) => f(p),
            None => self.pub_lifetime,
        }
    }

    fn is_expired(&self, p: &Publication) -> bool {
        let now = self.face.now();
        if let Some(f) = &self.is_expired_cb {
            return f(p, now);
        }
        // a pub expires when its timestamp is older than lifetime + skew,
        // or implausibly far in the future
        let Some(ts) = p.name().last().and_then(|c| c.as_timestamp().ok()) else {
            return true;
        };
        let dt = now.micros_since(ts);
        let skew = MAX_CLOCK_SKEW.as_micros() as i64;
        dt >= (self.lifetime_of(p) + MAX_CLOCK_SKEW).as_micros() as i64 || dt <= -skew
    }

    fn order_pubs(&mut self, pv: &mut Vec<Publication>, oth: &mut Vec<Publication>) -> bool {
        if let Some(f) = &mut self.order_pub_cb {
            return f(pv, oth);
        }
        // newest first; hash tie-break keeps packing deterministic across peers
        pv.sort_by(|a, b| {
            pub_timestamp(b)
                .cmp(&pub_timestamp(a))
                .then_with(|| hash_pub(b).cmp(&hash_pub(a)))
        });
        true
    }

    /// Add a publication to the active set and arm its lifecycle timers.
    fn add_to_active(&mut self, p: Publication, local: bool) -> PubHash {
        let lt = self.lifetime_of(&p);
        let h = hash_pub(&p);
        let h = if local {
            self.pubs.add_local(h, p)
        } else {
            self.pubs.add_net(h, p)
        };
        if h == 0 || lt.is_zero() {
            return h;
        }
        // Deactivation is lifetime + skew so a peer with a late clock can't
        // hand the pub straight back; the entry itself is held longer still
        // so duplicates keep being recognized until garbage collection.
        let now = self.face.now();
        if local {
            self.timers
                .schedule(now + lt, EngineTimer::DeliveryTimeout(h));
        }
        self.timers
            .schedule(now + lt + MAX_CLOCK_SKEW, EngineTimer::Deactivate(h));
        self.timers
            .schedule(now + lt + self.pub_expiration_gb, EngineTimer::Erase(h));
        h
    }

    /// Advertise an unwanted publication's hash so peers stop offering it.
    fn ignore_pub(&mut self, p: &Publication) {
        let h = hash_pub(p);
        debug!(pub_name = %p.name(), hash = h, "ignoring publication");
        self.pubs.ignore(h);
        let at = self.face.now() + self.pub_lifetime + MAX_CLOCK_SKEW;
        self.timers.schedule(at, EngineTimer::ForgetIgnored(h));
    }

    fn cstate_name(&self) -> Name {
        self.coll_name
            .clone()
            .append(Component::generic(self.pubs.iblt().rl_encode()))
    }

    fn cancel_scheduled_cstate(&mut self) {
        if let Some(id) = self.scheduled_cstate.take() {
            self.timers.cancel(id);
        }
    }

    /// Express a cState describing our publication set.
    fn send_cstate(&mut self) {
        // a cState sent before registration completes can't be answered
        if self.registering {
            return;
        }
        self.cancel_scheduled_cstate();
        self.nonce = rand32();
        let interest = Interest::new(self.cstate_name(), self.cstate_lifetime, self.nonce);
        trace!(name = %interest.name(), nonce = self.nonce, "expressing cState");
        self.face.express(interest);
    }

    /// (Re)schedule a cState after `dly` plus jitter. Repeated calls within
    /// the window just push the deadline, coalescing responses to a burst
    /// of cAdds into one advertisement.
    fn send_cstate_soon(&mut self, dly: Duration) {
        self.cancel_scheduled_cstate();
        let at = self.face.now() + dly + jitter();
        self.scheduled_cstate = Some(self.timers.schedule(at, EngineTimer::SendCState));
    }

    /// Collect local-origin, unsuppressed publications among `have`.
    fn local_candidates(&mut self, have: &std::collections::BTreeSet<u32>) -> Vec<Publication> {
        let now = self.face.now();
        let mut pv = Vec::new();
        for h in have {
            let Some(e) = self.pubs.get_mut(*h) else {
                continue; // ignored hash: nothing to ship
            };
            if e.suppress_until > now {
                continue; // sent too recently; let the subnet settle
            }
            e.suppress_until = Timestamp::ZERO;
            if e.local() {
                pv.push(e.item().clone());
            }
        }
        pv
    }

    /// Build and sign a cAdd answering `cs_name` with `pubs`.
    fn make_cadd(&mut self, cs_name: &Name, pubs: &[Publication]) -> Option<Data> {
        let mut content = Vec::new();
        for p in pubs {
            content.extend_from_slice(p.wire());
        }
        let b = Data::builder(cadd_name(cs_name))
            .content_type(tlv::content_type::CADD)
            .content(content);
        match b.sign(self.pkt_sigmgr.as_mut()) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "cAdd signing failed");
                None
            }
        }
    }

    /// Handle a peer's cState. Returns true when a cAdd went out.
    fn handle_cstate(&mut self, name: &Name) -> bool {
        let peer = name_to_iblt(name);
        self.handle_delivery_cbs(&peer);

        let (have, need) = self.pubs.iblt().subtract(&peer).peel();
        if have.is_empty() && need.is_empty() {
            return false; // peer is synchronized with us
        }

        let mut pv = self.local_candidates(&have);
        let mut oth: Vec<Publication> = Vec::new();
        let sendable = !pv.is_empty() && self.order_pubs(&mut pv, &mut oth);
        if !sendable {
            if !need.is_empty() {
                // nothing to offer but the peer has pubs we lack: prompt it
                let cs = self.cstate_name();
                self.face.unsuppress_cstate(&cs);
                self.send_cstate_soon(DIST_DELAY);
            }
            return false;
        }

        // pack what fits; stop at the first overflow so the newest go first
        let now = self.face.now();
        let sprs = now + DIST_DELAY;
        let mut picked: Vec<Publication> = Vec::new();
        let mut size = 0usize;
        for p in pv {
            if p.size() > MAX_PUB_SIZE {
                debug!(pub_name = %p.name(), size = p.size(), "oversize pub not shipped");
                continue;
            }
            if size + p.size() > MAX_PUB_SIZE {
                break;
            }
            size += p.size();
            if let Some(e) = self.pubs.get_mut(hash_pub(&p)) {
                e.suppress_until = sprs;
            }
            picked.push(p);
        }
        if picked.is_empty() {
            return false;
        }

        let Some(cadd) = self.make_cadd(name, &picked) else {
            return false;
        };
        debug!(count = picked.len(), bytes = size, "sending cAdd");
        self.face.send(cadd);
        // let the network settle before re-advertising
        self.send_cstate_soon(2 * DIST_DELAY);
        true
    }

    /// Push newly created publications against a known peer cState.
    fn send_cadd_for(&mut self, cs_name: &Name) -> bool {
        self.cancel_scheduled_cstate();
        let peer = name_to_iblt(cs_name);
        let (have, _need) = self.pubs.iblt().subtract(&peer).peel();
        if have.is_empty() {
            return false;
        }
        let mut pv = self.local_candidates(&have);
        if pv.is_empty() {
            return false;
        }
        let mut sv: Vec<Publication> = Vec::new();
        if !self.order_pubs(&mut pv, &mut sv) {
            return false;
        }
        sv.clear();

        // skip anything that would overflow and see if later ones still fit
        let now = self.face.now();
        let sprs = now + DIST_DELAY;
        let mut size = 0usize;
        for p in pv {
            if p.size() > MAX_PUB_SIZE {
                debug!(pub_name = %p.name(), size = p.size(), "oversize pub not shipped");
                continue;
            }
            if size + p.size() > MAX_PUB_SIZE {
                continue;
            }
            size += p.size();
            if let Some(e) = self.pubs.get_mut(hash_pub(&p)) {
                e.suppress_until = sprs;
            }
            sv.push(p);
        }
        if sv.is_empty() {
            return false;
        }
        let Some(cadd) = self.make_cadd(cs_name, &sv) else {
            return false;
        };
        self.face.send(cadd);
        self.send_cstate_soon(2 * DIST_DELAY);
        true
    }

    /// Push new publications at the best peer cState the face has seen.
    fn send_cadd(&mut self) -> bool {
        match self.face.best_cstate(&self.coll_name) {
            Some(name) => self.send_cadd_for(&name),
            None => false,
        }
    }

    /// Confirm deliveries a peer's cState proves: any pub awaiting
    /// confirmation that the peer's table already contains.
    fn handle_delivery_cbs(&mut self, peer: &Iblt) {
        if self.pub_cbs.is_empty() {
            return;
        }
        let diff = self.pubs.iblt().subtract(self.pub_cbs.iblt()).subtract(peer);
        let (_have, need) = diff.peel();
        for h in need {
            self.do_delivery_cb(h, true);
        }
    }

    fn do_delivery_cb(&mut self, h: PubHash, arrived: bool) {
        let Some(mut cb) = self.pub_cbs.remove(h) else {
            return;
        };
        if let Some(e) = self.pubs.get(h) {
            if e.local() {
                cb(e.item(), arrived);
            }
        }
    }

    /// Process a validated cAdd: adopt unknown live publications, dispatch
    /// them to subscribers, and re-advertise once the burst settles.
    fn on_cadd(&mut self, cstate: &Interest, cadd: &Data) {
        if self.registering {
            return;
        }
        // publications triggered from inside subscriber callbacks must not
        // provoke a cState until the whole cAdd is handled
        self.delivering = true;
        let initpubs = self.publications;

        let mut added = 0u32;
        let mut r = TlvReader::new(cadd.content());
        while !r.done() {
            let Ok((typ_, whole, _)) = r.next_raw() else {
                debug!("malformed cAdd content tail dropped");
                break;
            };
            if typ_ != tlv::typ::DATA {
                continue;
            }
            let Ok(d) = Data::from_wire(whole) else {
                continue;
            };
            if self.pubs.contains(hash_pub(&d)) {
                continue; // duplicate (or already ignored)
            }
            if self.is_expired(&d) || !self.pub_sigmgr.validate(&d) {
                // unwanted pubs go in our iblt or peers keep offering them
                self.ignore_pub(&d);
                continue;
            }
            if self.add_to_active(d.clone(), false) == 0 {
                continue;
            }
            added += 1;
            if added == 1 {
                // a cState reflecting the old set is now stale
                self.cancel_scheduled_cstate();
            }
            if let Some(cb) = self.subscriptions.find_longest_match(d.name()).cloned() {
                self.deliver(&d, &cb);
            }
        }
        self.delivering = false;
        if added == 0 {
            return; // nothing we needed: leave the cState schedule alone
        }
        trace!(added, "cAdd adopted publications");
        // if subscriber callbacks published, answer the pending peer cState
        // right away; otherwise confirm our new state after the burst
        if initpubs != self.publications && self.send_cadd_for(cstate.name()) {
            return;
        }
        self.send_cstate_soon(DIST_DELAY);
    }

    /// Deliver one publication to one subscription, decrypting a copy
    /// first when the validator encrypts content.
    fn deliver(&mut self, p: &Publication, cb: &SubCb) {
        if self.pub_sigmgr.encrypts_content() && !p.content().is_empty() {
            match self.pub_sigmgr.decrypt(p) {
                Some(plain) => {
                    let mut f = cb.borrow_mut();
                    (&mut *f)(self, &plain);
                    // plaintext copy dropped here
                }
                None => debug!(pub_name = %p.name(), "decrypt failed; not delivered"),
            }
            return;
        }
        let mut f = cb.borrow_mut();
        (&mut *f)(self, p);
    }

    fn handle_event(&mut self, ev: FaceEvent) {
        match ev {
            FaceEvent::CState { name } => {
                // a cState has exactly one component (the iblt) beyond the
                // collection name
                if name.len() == self.coll_name.len() + 1 && self.coll_name.is_prefix_of(&name) {
                    self.handle_cstate(&name);
                }
            }
            FaceEvent::CAdd { cstate, mut cadd } => {
                if !self.pkt_sigmgr.validate_decrypt(&mut cadd) {
                    debug!(name = %cadd.name(), "cAdd failed packet validation");
                    return;
                }
                self.on_cadd(&cstate, &cadd);
            }
            FaceEvent::CStateTimeout { .. } => self.send_cstate(),
            FaceEvent::RitComplete { prefix, ok } => {
                if !ok {
                    warn!(prefix = %prefix, "collection registration failed");
                    return;
                }
                self.registering = false;
                let cs = self.cstate_name();
                self.face.unsuppress_cstate(&cs);
                self.send_cstate();
            }
        }
    }

    fn fire_timer(&mut self, t: EngineTimer) {
        match t {
            EngineTimer::DeliveryTimeout(h) => {
                if !self.pub_cbs.is_empty() {
                    self.do_delivery_cb(h, false);
                }
            }
            EngineTimer::Deactivate(h) => self.pubs.deactivate(h),
            EngineTimer::Erase(h) => self.pubs.erase(h),
            EngineTimer::ForgetIgnored(h) => self.pubs.unignore(h),
            EngineTimer::SendCState => {
                self.scheduled_cstate = None;
                self.send_cstate();
            }
            EngineTimer::App(f) => f(self),
        }
    }
}

fn pub_timestamp(p: &Publication) -> Timestamp {
    p.name()
        .last()
        .and_then(|c| c.as_timestamp().ok())
        .unwrap_or(Timestamp::ZERO)
}

/// Decode the IBLT from a cState name's final component; an undecodable
/// component is treated as an empty table.
fn name_to_iblt(name: &Name) -> Iblt {
    match name.last() {
        Some(c) => Iblt::rl_decode(c.val()).unwrap_or_else(|e| {
            debug!(error = %e, "cState iblt undecodable");
            Iblt::new()
        }),
        None => Iblt::new(),
    }
}

fn rand32() -> u32 {
    let mut b = [0u8; 4];
    getrandom::getrandom(&mut b).expect("getrandom failed");
    u32::from_le_bytes(b)
}

/// cState send jitter: uniform over 7..=12 ms, desynchronizing peers that
/// would otherwise answer a broadcast in lockstep.
fn jitter() -> Duration {
    let mut b = [0u8; 1];
    getrandom::getrandom(&mut b).expect("getrandom failed");
    Duration::from_millis(7 + (b[0] % 6) as u64)
}
