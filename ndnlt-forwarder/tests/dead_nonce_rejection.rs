//! A second Interest for a name already pending with the same nonce is a
//! loop, not a retransmission, and must be rejected without disturbing the
//! live PIT entry or forwarding anything further.

use bytes::BytesMut;
use ndnlt_common::clock::TestClock;
use ndnlt_common::name::Name;
use ndnlt_common::packet::Interest;
use ndnlt_forwarder::config::ForwarderConfig;
use ndnlt_forwarder::face::{Face, FaceKind, FaceState};
use ndnlt_forwarder::{Error, Forwarder};

struct NullFace;

impl Face for NullFace {
    fn up(&mut self) -> ndnlt_forwarder::Result<()> {
        Ok(())
    }
    fn send(&mut self, _packet: &[u8]) -> ndnlt_forwarder::Result<()> {
        Ok(())
    }
    fn down(&mut self) -> ndnlt_forwarder::Result<()> {
        Ok(())
    }
    fn state(&self) -> FaceState {
        FaceState::Up
    }
    fn kind(&self) -> FaceKind {
        FaceKind::Net
    }
}

fn encode(interest: &Interest) -> Vec<u8> {
    let element = interest.encode();
    let mut buf = BytesMut::new();
    element.encode(&mut buf);
    buf.to_vec()
}

#[test]
fn second_interest_with_same_nonce_on_a_different_face_is_rejected() {
    let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
    let nexthop = fwd.register_face(Box::new(NullFace)).unwrap();
    fwd.add_route(nexthop, &Name::from_str("/n").unwrap()).unwrap();
    let other_face = fwd.register_face(Box::new(NullFace)).unwrap();

    let interest = Interest::new(Name::from_str("/n").unwrap(), 0xDEADBEEF);
    fwd.express_interest(interest, Box::new(|_| {}), None).unwrap();

    let duplicate = Interest::new(Name::from_str("/n").unwrap(), 0xDEADBEEF);
    let packet = encode(&duplicate);
    let err = fwd.receive(other_face, &packet).unwrap_err();

    assert!(matches!(err, Error::InterestRejected(_)));
    assert_eq!(fwd.metrics().interests_rejected_dead_nonce.value(), 1);
    assert_eq!(fwd.metrics().interests_forwarded.value(), 1, "only the first Interest forwards");
}

#[test]
fn a_fresh_nonce_after_the_first_is_accepted() {
    let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
    let nexthop = fwd.register_face(Box::new(NullFace)).unwrap();
    fwd.add_route(nexthop, &Name::from_str("/n").unwrap()).unwrap();
    let other_face = fwd.register_face(Box::new(NullFace)).unwrap();

    let interest = Interest::new(Name::from_str("/n").unwrap(), 1);
    fwd.express_interest(interest, Box::new(|_| {}), None).unwrap();

    let retransmit = Interest::new(Name::from_str("/n").unwrap(), 2);
    let packet = encode(&retransmit);
    fwd.receive(other_face, &packet).unwrap();

    assert_eq!(fwd.metrics().interests_rejected_dead_nonce.value(), 0);
}
