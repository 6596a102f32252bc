//! Multi-engine scenarios over one mock segment: convergence, dispatch,
//! delivery confirmation and end-to-end crypto.

mod util;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use syncps_core::face::Segment;
use syncps_core::SyncPs;
use syncps_sigmgrs::{SigMgrAead, SigMgrEdDSA, SigMgrNull};
use syncps_types::{Name, Prefix, Publication, SigMgr};

use util::{engine, run_for, settle};

/// Collect delivered publication names into a shared sink.
fn subscribe_sink(e: &mut SyncPs, prefix: &str) -> Rc<RefCell<Vec<Publication>>> {
    let sink: Rc<RefCell<Vec<Publication>>> = Rc::new(RefCell::new(Vec::new()));
    let out = Rc::clone(&sink);
    e.subscribe(Prefix::new(Name::parse(prefix)), move |_eng, p| {
        out.borrow_mut().push(p.clone());
    });
    sink
}

#[test]
fn two_peers_converge_with_one_cadd_each() {
    let seg = Segment::new();
    let (mut e1, f1) = engine(&seg, "/demo");
    let (mut e2, f2) = engine(&seg, "/demo");
    let got1 = subscribe_sink(&mut e1, "/demo");
    let got2 = subscribe_sink(&mut e2, "/demo");
    settle(&mut [&mut e1, &mut e2]);
    assert!(e1.is_registered() && e2.is_registered());

    let p1 = e1.make_publication(Name::parse("/demo/p1"), b"one".to_vec()).unwrap();
    let p2 = e2.make_publication(Name::parse("/demo/p2"), b"two".to_vec()).unwrap();
    e1.publish(p1.clone());
    e2.publish(p2.clone());
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));

    // both hold both publications
    assert!(e1.contains_pub(&p1) && e1.contains_pub(&p2));
    assert!(e2.contains_pub(&p1) && e2.contains_pub(&p2));
    assert_eq!(e1.active_count(), 2);
    assert_eq!(e2.active_count(), 2);
    assert!(e1.collection_consistent() && e2.collection_consistent());

    // each delivered exactly the other's publication
    assert_eq!(got1.borrow().len(), 1);
    assert_eq!(got1.borrow()[0], p2);
    assert_eq!(got2.borrow().len(), 1);
    assert_eq!(got2.borrow()[0], p1);

    // exactly one cAdd per side, and quiescence brings no more
    assert_eq!(f1.sent_data().len(), 1);
    assert_eq!(f2.sent_data().len(), 1);
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(1000));
    assert_eq!(f1.sent_data().len(), 1);
    assert_eq!(f2.sent_data().len(), 1);
}

#[test]
fn longest_prefix_gets_the_single_delivery() {
    let seg = Segment::new();
    let (mut e1, _f1) = engine(&seg, "/demo");
    let (mut e2, _f2) = engine(&seg, "/demo");
    let short = subscribe_sink(&mut e1, "/demo/a");
    let long = subscribe_sink(&mut e1, "/demo/a/b");
    settle(&mut [&mut e1, &mut e2]);

    let p = e2.make_publication(Name::parse("/demo/a/b/c"), b"x".to_vec()).unwrap();
    e2.publish(p.clone());
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));

    assert!(short.borrow().is_empty());
    assert_eq!(long.borrow().len(), 1);
    assert_eq!(long.borrow()[0], p);
}

#[test]
fn locally_originated_pubs_never_echo_to_local_subscribers() {
    let seg = Segment::new();
    let (mut e1, _f1) = engine(&seg, "/demo");
    let (mut e2, _f2) = engine(&seg, "/demo");
    let got1 = subscribe_sink(&mut e1, "/demo");
    settle(&mut [&mut e1, &mut e2]);

    let mine = e1.make_publication(Name::parse("/demo/mine"), b"m".to_vec()).unwrap();
    e1.publish(mine.clone());
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));

    // own pub was synced out but never dispatched locally
    assert!(e2.contains_pub(&mine));
    assert!(got1.borrow().is_empty());
}

#[test]
fn late_subscriber_gets_stored_pubs_in_timestamp_order() {
    let seg = Segment::new();
    let (mut e1, _f1) = engine(&seg, "/demo");
    let (mut e2, _f2) = engine(&seg, "/demo");
    settle(&mut [&mut e1, &mut e2]);

    let pa = e2.make_publication(Name::parse("/demo/x/1"), b"1".to_vec()).unwrap();
    e2.publish(pa.clone());
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(2));
    let pb = e2.make_publication(Name::parse("/demo/x/2"), b"2".to_vec()).unwrap();
    e2.publish(pb.clone());
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));
    assert!(e1.contains_pub(&pa) && e1.contains_pub(&pb));

    // subscribing now must synchronously deliver both, oldest first
    let sink = subscribe_sink(&mut e1, "/demo/x");
    assert_eq!(sink.borrow().len(), 2);
    assert_eq!(sink.borrow()[0], pa);
    assert_eq!(sink.borrow()[1], pb);

    // re-subscribing the same prefix replaces the callback without
    // re-delivering
    let sink2 = subscribe_sink(&mut e1, "/demo/x");
    assert!(sink2.borrow().is_empty());
}

#[test]
fn delivery_callback_confirms_on_peer_cstate() {
    let seg = Segment::new();
    let (mut e1, _f1) = engine(&seg, "/demo");
    let (mut e2, _f2) = engine(&seg, "/demo");
    settle(&mut [&mut e1, &mut e2]);

    let outcomes: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&outcomes);
    let p = e1.make_publication(Name::parse("/demo/p"), b"x".to_vec()).unwrap();
    e1.publish_confirmed(p, move |_p, arrived| sink.borrow_mut().push(arrived));

    // the peer adopts the pub and its next cState proves possession
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));
    assert_eq!(*outcomes.borrow(), vec![true]);

    // no second (failure) callback at lifetime
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(2500));
    assert_eq!(*outcomes.borrow(), vec![true]);
}

#[test]
fn subscriber_callbacks_may_publish_replies() {
    let seg = Segment::new();
    let (mut e1, _f1) = engine(&seg, "/demo");
    let (mut e2, _f2) = engine(&seg, "/demo");
    let pongs = subscribe_sink(&mut e1, "/demo/pong");
    e2.subscribe(Prefix::new(Name::parse("/demo/ping")), |eng, p| {
        let reply = eng
            .make_publication(Name::parse("/demo/pong"), p.content().to_vec())
            .unwrap();
        eng.publish(reply);
    });
    settle(&mut [&mut e1, &mut e2]);

    let ping = e1.make_publication(Name::parse("/demo/ping"), b"hello".to_vec()).unwrap();
    e1.publish(ping);
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(300));

    assert_eq!(pongs.borrow().len(), 1);
    assert_eq!(pongs.borrow()[0].content(), b"hello");
    assert!(e1.collection_consistent() && e2.collection_consistent());
}

#[test]
fn aead_group_members_read_plaintext() {
    let seg = Segment::new();
    let group = SigMgrAead::generate();
    let key = *group.group_key();

    let face1 = seg.attach();
    let mut e1 = SyncPs::new(
        face1,
        Name::parse("/grp"),
        SigMgrNull::new(),
        SigMgrAead::new(key),
    );
    e1.start();
    let face2 = seg.attach();
    let mut e2 = SyncPs::new(
        face2,
        Name::parse("/grp"),
        SigMgrNull::new(),
        SigMgrAead::new(key),
    );
    e2.start();
    let got = subscribe_sink(&mut e2, "/grp");
    settle(&mut [&mut e1, &mut e2]);

    let p = e1.make_publication(Name::parse("/grp/msg"), b"secret".to_vec()).unwrap();
    assert_ne!(p.content(), b"secret"); // sealed form is ciphertext
    e1.publish(p);
    run_for(&seg, &mut [&mut e1, &mut e2], Duration::from_millis(200));

    // the subscriber saw an ephemeral plaintext copy
    assert_eq!(got.borrow().len(), 1);
    assert_eq!(got.borrow()[0].content(), b"secret");
}

#[test]
fn eddsa_pubs_need_an_installed_key() {
    let seg = Segment::new();
    let signer = SigMgrEdDSA::generate();
    let signer_vk = signer.verifying_key().unwrap();

    let face1 = seg.attach();
    let mut e1 = SyncPs::new(face1, Name::parse("/demo"), SigMgrNull::new(), signer);
    e1.start();

    let mut knows_key = SigMgrEdDSA::generate();
    knows_key.add_key(&signer_vk);
    let face2 = seg.attach();
    let mut e2 = SyncPs::new(face2, Name::parse("/demo"), SigMgrNull::new(), knows_key);
    e2.start();

    let face3 = seg.attach();
    let mut e3 = SyncPs::new(
        face3,
        Name::parse("/demo"),
        SigMgrNull::new(),
        SigMgrEdDSA::validator(),
    );
    e3.start();

    let got2 = subscribe_sink(&mut e2, "/demo");
    let got3 = subscribe_sink(&mut e3, "/demo");
    settle(&mut [&mut e1, &mut e2, &mut e3]);

    let p = e1.make_publication(Name::parse("/demo/m"), b"signed".to_vec()).unwrap();
    e1.publish(p.clone());
    run_for(&seg, &mut [&mut e1, &mut e2, &mut e3], Duration::from_millis(200));

    // the peer with the key adopted and delivered it
    assert!(e2.contains_pub(&p));
    assert_eq!(e2.active_count(), 1);
    assert_eq!(got2.borrow().len(), 1);

    // the keyless peer refused it but remembers the hash so it is not
    // offered again
    assert!(got3.borrow().is_empty());
    assert_eq!(e3.active_count(), 0);
    assert!(e3.contains_pub(&p));
    assert!(e3.collection_consistent());
}
