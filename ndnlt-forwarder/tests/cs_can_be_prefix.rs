//! Interests answered straight out of the content store, including the
//! CanBePrefix case where the cached Data's name is strictly longer than
//! the query.

use ndnlt_common::clock::TestClock;
use ndnlt_common::name::Name;
use ndnlt_common::packet::{Data, Interest, Signature, SignatureType};
use ndnlt_forwarder::config::ForwarderConfig;
use ndnlt_forwarder::Forwarder;
use std::cell::RefCell;
use std::rc::Rc;

fn fresh_data(name: &str, content: &[u8]) -> Data {
    let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
    Data::new(Name::from_str(name).unwrap(), content.to_vec(), sig)
        .unwrap()
        .with_freshness_period(1000)
}

#[test]
fn can_be_prefix_interest_is_satisfied_from_a_longer_cached_name() {
    let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
    fwd.put_data(fresh_data("/x/y", b"hello")).unwrap();

    let received: Rc<RefCell<Option<Vec<u8>>>> = Rc::new(RefCell::new(None));
    let received_cb = received.clone();
    let interest = Interest::new(Name::from_str("/x").unwrap(), 1)
        .with_can_be_prefix(true)
        .with_must_be_fresh(true);

    fwd.express_interest(
        interest,
        Box::new(move |data| *received_cb.borrow_mut() = Some(data.content.to_vec())),
        None,
    )
    .unwrap();

    assert_eq!(received.borrow().as_deref(), Some(b"hello".as_slice()));
}

#[test]
fn exact_match_interest_does_not_see_a_longer_cached_name() {
    let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
    fwd.put_data(fresh_data("/x/y", b"hello")).unwrap();

    let received: Rc<RefCell<bool>> = Rc::new(RefCell::new(false));
    let received_cb = received.clone();
    let interest = Interest::new(Name::from_str("/x").unwrap(), 1);

    // No CanBePrefix and no route to "/x" exists, so this must be rejected
    // with NoRoute rather than satisfied from the cache.
    let err = fwd
        .express_interest(interest, Box::new(move |_| *received_cb.borrow_mut() = true), None)
        .unwrap_err();

    assert!(matches!(err, ndnlt_forwarder::Error::NoRoute(_)));
    assert!(!*received.borrow());
}
