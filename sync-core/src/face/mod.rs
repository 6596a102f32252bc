//! The face: how the engine reaches the broadcast medium.
//!
//! This module provides the narrow contract the engine consumes
//! (interest expression, inbound-packet delivery, peer-state queries) plus
//! an in-process mock for testing. A real UDP multicast face lives in the
//! `syncps-face` crate behind the same trait.
//!
//! # Design
//!
//! The engine is single-threaded and cooperative: it owns its timers and
//! drives everything from one loop. The face is therefore a *pulled* event
//! source — `poll(deadline)` either hands back the next inbound event,
//! reports that the engine's earliest timer is due, or reports idleness.
//! All face callbacks of the original (interest timeout, registration
//! completion) arrive as [`FaceEvent`] values instead of captured closures.

mod mock;

pub use mock::{MockFace, Segment};

use syncps_types::{hash_name, Component, Data, Interest, Name, Timestamp};

/// An inbound occurrence the engine must handle.
#[derive(Debug)]
pub enum FaceEvent {
    /// A peer's collection-state advertisement arrived.
    CState {
        /// The cState name (collection prefix + encoded IBLT).
        name: Name,
    },
    /// A collection-add packet arrived, answering a pending cState.
    CAdd {
        /// The cState the packet answers.
        cstate: Interest,
        /// The packet itself; signature not yet checked.
        cadd: Data,
    },
    /// Our own expressed cState reached its lifetime unanswered.
    CStateTimeout {
        /// Name of the expired cState.
        name: Name,
    },
    /// Registration for inbound traffic finished.
    RitComplete {
        /// The registered prefix.
        prefix: Name,
        /// False when the face could not complete registration.
        ok: bool,
    },
}

/// Outcome of one [`Face::poll`] call.
#[derive(Debug)]
pub enum Poll {
    /// An inbound event to handle.
    Event(FaceEvent),
    /// The supplied deadline has been reached; the engine's timer is due.
    TimerDue,
    /// Nothing pending and no deadline reached.
    Idle,
}

/// The transport contract the engine consumes.
pub trait Face {
    /// The current time on this face's clock. Production faces use the
    /// wall clock; the mock face runs a virtual one.
    fn now(&self) -> Timestamp;

    /// Register to receive cStates and cAdds under `prefix`. Completion is
    /// reported later through [`FaceEvent::RitComplete`].
    fn add_to_rit(&mut self, prefix: &Name);

    /// Express a cState. Replaces any previously expressed one; its
    /// unanswered expiry is reported through [`FaceEvent::CStateTimeout`].
    fn express(&mut self, interest: Interest);

    /// Transmit a signed cAdd.
    fn send(&mut self, data: Data);

    /// The best (most recent, unexpired) peer cState seen under
    /// `collection`, if any.
    fn best_cstate(&self, collection: &Name) -> Option<Name>;

    /// Let the next outgoing cState through even if the face's duplicate
    /// suppression would otherwise drop it.
    fn unsuppress_cstate(&mut self, prefix: &Name);

    /// Wait for the next inbound event, or until `deadline`.
    fn poll(&mut self, deadline: Option<Timestamp>) -> Poll;
}

/// The name a cAdd answering cState `cstate_name` carries: the cState's
/// prefix with the final (IBLT) component replaced by a 32-bit hash of the
/// full cState name. cStates advertising the same IBLT thus share a key,
/// and the original interest can be looked up from a cAdd's name.
pub fn cadd_name(cstate_name: &Name) -> Name {
    let keep = cstate_name.len().saturating_sub(1);
    cstate_name
        .first_n(keep)
        .append(Component::version(hash_name(cstate_name)))
}
