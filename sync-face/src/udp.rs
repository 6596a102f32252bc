//! UDP multicast face.
//!
//! One datagram per packet on an IPv4 multicast group: cStates go out as
//! Interest TLVs, cAdds as Data TLVs, and every member of the group hears
//! every transmission. The face keeps the pending-interest table pairing
//! inbound cAdds with the cState each answers, tracks the freshest peer
//! cState per collection, and turns socket silence into the engine's
//! deadline wakeups via a blocking `poll`.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use tracing::{debug, trace, warn};

use syncps_core::face::{cadd_name, Face, FaceEvent, Poll};
use syncps_types::{tlv, Data, Interest, Name, Timestamp};

use crate::FaceError;

/// Largest datagram the face will send or accept (typical Ethernet MTU
/// less IP/UDP headers).
pub const MAX_DATAGRAM: usize = 1452;

/// How long one blocking receive waits before rechecking deadlines.
const RECV_SLICE: Duration = Duration::from_millis(100);

struct PitEntry {
    interest: Interest,
    expiry: Timestamp,
}

/// A [`Face`] over an IPv4 multicast group.
pub struct UdpMulticastFace {
    sock: UdpSocket,
    dest: SocketAddrV4,
    registered: Vec<Name>,
    /// Interests heard (ours included), keyed by the cAdd name each
    /// would elicit.
    pit: HashMap<Name, PitEntry>,
    local_cstate: Option<(Name, Timestamp)>,
    best_cstate: Option<(Name, Timestamp)>,
    last_sent_cstate: Option<(Name, Timestamp)>,
    unsuppress: bool,
    pending: VecDeque<FaceEvent>,
}

impl UdpMulticastFace {
    /// Join `group:port` on the interface with address `ifaddr`
    /// (`0.0.0.0` for the default interface).
    pub fn new(group: Ipv4Addr, port: u16, ifaddr: Ipv4Addr) -> Result<Self, FaceError> {
        if !group.is_multicast() {
            return Err(FaceError::NotMulticast(group));
        }
        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(FaceError::Bind)?;
        sock.join_multicast_v4(&group, &ifaddr)
            .map_err(FaceError::Join)?;
        // our own datagrams are not interesting
        sock.set_multicast_loop_v4(false).map_err(FaceError::Bind)?;
        Ok(Self {
            sock,
            dest: SocketAddrV4::new(group, port),
            registered: Vec::new(),
            pit: HashMap::new(),
            local_cstate: None,
            best_cstate: None,
            last_sent_cstate: None,
            unsuppress: false,
            pending: VecDeque::new(),
        })
    }

    fn transmit(&self, bytes: &[u8]) {
        if bytes.len() > MAX_DATAGRAM {
            warn!(len = bytes.len(), "dropping oversize datagram");
            return;
        }
        if let Err(e) = self.sock.send_to(bytes, self.dest) {
            warn!(error = %e, "multicast send failed");
        }
    }

    fn covered(&self, name: &Name) -> bool {
        self.registered.iter().any(|p| p.is_prefix_of(name))
    }

    /// Interpret one received datagram, producing at most one event.
    fn on_packet(&mut self, bytes: &[u8], now: Timestamp) -> Option<FaceEvent> {
        match bytes.first() {
            Some(&t) if t == tlv::typ::INTEREST => {
                let i = match Interest::from_wire(bytes) {
                    Ok(i) => i,
                    Err(e) => {
                        debug!(error = %e, "undecodable interest dropped");
                        return None;
                    }
                };
                if !self.covered(i.name()) {
                    return None;
                }
                let expiry = now + i.lifetime();
                self.pit.insert(
                    cadd_name(i.name()),
                    PitEntry {
                        interest: i.clone(),
                        expiry,
                    },
                );
                self.best_cstate = Some((i.name().clone(), expiry));
                trace!(name = %i.name(), "cState heard");
                Some(FaceEvent::CState {
                    name: i.name().clone(),
                })
            }
            Some(&t) if t == tlv::typ::DATA => {
                let d = match Data::from_wire(bytes) {
                    Ok(d) => d,
                    Err(e) => {
                        debug!(error = %e, "undecodable data dropped");
                        return None;
                    }
                };
                match self.pit.get(d.name()) {
                    Some(pe) if pe.expiry > now => Some(FaceEvent::CAdd {
                        cstate: pe.interest.clone(),
                        cadd: d,
                    }),
                    _ => {
                        debug!(name = %d.name(), "data with no pending cState dropped");
                        None
                    }
                }
            }
            _ => {
                debug!(len = bytes.len(), "unrecognized datagram dropped");
                None
            }
        }
    }
}

impl Face for UdpMulticastFace {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn add_to_rit(&mut self, prefix: &Name) {
        // the socket already belongs to the group; registration is a
        // local filter and completes immediately
        self.registered.push(prefix.clone());
        self.pending.push_back(FaceEvent::RitComplete {
            prefix: prefix.clone(),
            ok: true,
        });
    }

    fn express(&mut self, interest: Interest) {
        let now = Timestamp::now();
        let expiry = now + interest.lifetime();
        self.pit.insert(
            cadd_name(interest.name()),
            PitEntry {
                interest: interest.clone(),
                expiry,
            },
        );
        self.local_cstate = Some((interest.name().clone(), expiry));

        let dup = !self.unsuppress
            && matches!(&self.last_sent_cstate,
                Some((n, until)) if n == interest.name() && now < *until);
        self.unsuppress = false;
        self.last_sent_cstate = Some((interest.name().clone(), expiry));
        if dup {
            trace!(name = %interest.name(), "duplicate cState suppressed");
            return;
        }
        self.transmit(interest.wire());
    }

    fn send(&mut self, data: Data) {
        self.transmit(data.wire());
    }

    fn best_cstate(&self, collection: &Name) -> Option<Name> {
        match &self.best_cstate {
            Some((name, until)) if *until > Timestamp::now() && collection.is_prefix_of(name) => {
                Some(name.clone())
            }
            _ => None,
        }
    }

    fn unsuppress_cstate(&mut self, _prefix: &Name) {
        self.unsuppress = true;
    }

    fn poll(&mut self, deadline: Option<Timestamp>) -> Poll {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Poll::Event(ev);
            }
            let now = Timestamp::now();
            if let Some((_, exp)) = &self.local_cstate {
                if *exp <= now {
                    let (name, _) = self.local_cstate.take().unwrap();
                    return Poll::Event(FaceEvent::CStateTimeout { name });
                }
            }
            if matches!(deadline, Some(d) if d <= now) {
                return Poll::TimerDue;
            }

            // wait for traffic, but never past the nearest deadline
            let mut wait = RECV_SLICE;
            if let Some(d) = deadline {
                wait = wait.min(d.saturating_since(now));
            }
            if let Some((_, exp)) = &self.local_cstate {
                wait = wait.min(exp.saturating_since(now));
            }
            if let Err(e) = self.sock.set_read_timeout(Some(wait.max(Duration::from_millis(1)))) {
                warn!(error = %e, "set_read_timeout failed");
                return Poll::Idle;
            }
            match self.sock.recv_from(&mut buf) {
                Ok((n, _src)) => {
                    let now = Timestamp::now();
                    if let Some(ev) = self.on_packet(&buf[..n], now) {
                        return Poll::Event(ev);
                    }
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    warn!(error = %e, "multicast receive failed");
                    return Poll::Idle;
                }
            }
        }
    }
}
