//! The forwarder core: owns the name tree, face table, FIB, PIT and content
//! store, and drives the Interest/Data pipelines between them.
//!
//! A single `Forwarder` is meant to be the only place in a process that
//! mutates these tables; nothing here is `Send`/`Sync`, so a stack lives on
//! one thread and talks to async transports through channels rather than
//! shared locks (see `ndnlt-transport`'s face adapters).

use crate::cs::ContentStore;
use crate::error::{Error, Result};
use crate::face::{send_through, Face, FaceTable};
use crate::fib::Fib;
use crate::pit::{OnData, OnTimeout, Pit};
use ndnlt_common::bitset::BitSet;
use ndnlt_common::clock::Clock;
use ndnlt_common::metrics::ForwarderMetrics;
use ndnlt_common::name::Name;
use ndnlt_common::nametree::{NameTree, INVALID_ID};
use ndnlt_common::packet::{Data, Interest};
use ndnlt_common::queue::MessageQueue;
use std::time::Instant;

use crate::config::ForwarderConfig;

/// The forwarding node. Generic over the clock so tests can drive PIT
/// expiry deterministically; production code uses `SystemClock`.
pub struct Forwarder<C: Clock> {
    nametree: NameTree,
    faces: FaceTable,
    fib: Fib,
    pit: Pit,
    cs: ContentStore,
    queue: MessageQueue,
    clock: C,
    metrics: ForwarderMetrics,
}

impl<C: Clock> Forwarder<C> {
    pub fn new(config: ForwarderConfig, clock: C) -> Self {
        Self {
            nametree: NameTree::new(config.nametree_capacity),
            faces: FaceTable::new(config.face_table_capacity),
            fib: Fib::new(config.fib_capacity),
            pit: Pit::new(config.pit_capacity),
            cs: ContentStore::new(config.cs_capacity),
            queue: MessageQueue::new(),
            clock,
            metrics: ForwarderMetrics::new(),
        }
    }

    /// Read-only access to the running packet/cache/PIT counters.
    pub fn metrics(&self) -> &ForwarderMetrics {
        &self.metrics
    }

    /// Refreshes the size gauges (FIB/PIT/CS/name tree) to match the
    /// tables' current occupancy. Called after every insert/remove so the
    /// gauges never drift from the underlying tables.
    fn sync_table_gauges(&mut self) {
        self.metrics.fib_size.set(self.fib.len() as u64);
        self.metrics.pit_size.set(self.pit.iter().count() as u64);
        self.metrics.cs_size.set(self.cs.len() as u64);
        self.metrics.nametree_size.set(self.nametree.len() as u64);
    }

    /// Confirms a FIB route exists for `name` before a Pending Interest
    /// entry is created for it; an Interest with nowhere to go is rejected
    /// up front rather than sitting in the PIT until it times out.
    fn check_route(&mut self, name: &Name) -> Result<()> {
        if self.fib.prefix_match(&self.nametree, name).is_some() {
            return Ok(());
        }
        self.metrics.fib_misses.increment();
        self.metrics.interests_no_route.increment();
        Err(Error::NoRoute(name.clone()))
    }

    /// Wraps `Pit::find_or_insert`, counting a dead-nonce rejection before
    /// it propagates to the caller.
    fn find_or_insert_pit(&mut self, interest: &Interest) -> Result<u16> {
        match self.pit.find_or_insert(&mut self.nametree, interest, &self.clock) {
            Err(Error::InterestRejected(reason)) => {
                self.metrics.interests_rejected_dead_nonce.increment();
                Err(Error::InterestRejected(reason))
            }
            other => other,
        }
    }

    pub fn register_face(&mut self, face: Box<dyn Face>) -> Result<u16> {
        self.faces.register(face)
    }

    /// Removes `face_id` from the face table and scrubs it out of FIB
    /// nexthops and PIT incoming/outgoing sets.
    pub fn unregister_face(&mut self, face_id: u16) -> Result<()> {
        self.faces.unregister(face_id)?;
        self.fib.unregister_face(&mut self.nametree, face_id);
        self.pit.unregister_face(face_id);
        Ok(())
    }

    pub fn add_route(&mut self, face_id: u16, prefix: &Name) -> Result<()> {
        if !self.faces.contains(face_id) {
            return Err(Error::NoSuchFace(face_id));
        }
        let fib_id = self.fib.find_or_insert(&mut self.nametree, prefix)?;
        self.fib.get_mut(fib_id).unwrap().nexthop.set(face_id);
        self.sync_table_gauges();
        log::debug!("route added: {prefix} via face {face_id}");
        Ok(())
    }

    pub fn remove_route(&mut self, face_id: u16, prefix: &Name) -> Result<()> {
        if let Some(fib_id) = self.fib.find(&self.nametree, prefix) {
            let entry = self.fib.get_mut(fib_id).unwrap();
            entry.nexthop.clear(face_id);
            if entry.nexthop.is_empty() && entry.on_interest.is_none() {
                self.fib.remove(&mut self.nametree, prefix, fib_id);
            }
        }
        self.sync_table_gauges();
        Ok(())
    }

    pub fn remove_all_routes(&mut self, prefix: &Name) -> Result<()> {
        if let Some(fib_id) = self.fib.find(&self.nametree, prefix) {
            self.fib.remove(&mut self.nametree, prefix, fib_id);
        }
        self.sync_table_gauges();
        Ok(())
    }

    /// Registers a local application's handler for Interests matching
    /// `prefix`. A later registration on the same prefix replaces the
    /// handler, matching the reference forwarder's "latter cancels former".
    pub fn register_prefix(
        &mut self,
        prefix: &Name,
        on_interest: crate::fib::OnInterest,
    ) -> Result<()> {
        let fib_id = self.fib.find_or_insert(&mut self.nametree, prefix)?;
        self.fib.get_mut(fib_id).unwrap().on_interest = Some(on_interest);
        Ok(())
    }

    pub fn unregister_prefix(&mut self, prefix: &Name) -> Result<()> {
        if let Some(fib_id) = self.fib.find(&self.nametree, prefix) {
            let entry = self.fib.get_mut(fib_id).unwrap();
            entry.on_interest = None;
            if entry.nexthop.is_empty() {
                self.fib.remove(&mut self.nametree, prefix, fib_id);
            }
        }
        Ok(())
    }

    /// Expresses an Interest on behalf of a local application. `on_data`
    /// fires at most once; `on_timeout` fires if no Data arrives within the
    /// Interest's lifetime and `process()` is called after it elapses.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: OnData,
        on_timeout: Option<OnTimeout>,
    ) -> Result<()> {
        self.metrics.interests_sent.increment();
        if let Some(entry) = self.cs.prefix_match(
            &self.nametree,
            &interest.name,
            interest.can_be_prefix,
            interest.must_be_fresh,
            self.clock.now(),
        ) {
            self.metrics.cs_hits.increment();
            let mut on_data = on_data;
            on_data(&entry.data);
            return Ok(());
        }
        self.metrics.cs_misses.increment();
        self.check_route(&interest.name)?;

        let pit_id = self.find_or_insert_pit(&interest)?;
        {
            let entry = self.pit.get_mut(pit_id).unwrap();
            entry.on_data = Some(on_data);
            entry.on_timeout = on_timeout;
        }
        self.metrics.pit_inserts.increment();
        self.sync_table_gauges();

        self.forward_interest(&interest, pit_id, None)
    }

    /// Handles a packet arriving on `face_id`: an Interest is forwarded or
    /// answered from cache; a Data satisfies any pending Interest it
    /// matches and is cached.
    pub fn receive(&mut self, face_id: u16, packet: &[u8]) -> Result<()> {
        self.metrics.bytes_received.add(packet.len() as u64);
        let element = ndnlt_common::tlv::TlvElement::decode(&mut bytes::Bytes::copy_from_slice(packet))?;
        match element.tlv_type {
            ndnlt_common::tlv::TLV_INTEREST => {
                let interest = Interest::decode(&element)?;
                self.on_interest(face_id, interest)
            }
            ndnlt_common::tlv::TLV_DATA => {
                let data = Data::decode(&element)?;
                self.on_data(face_id, data)
            }
            other => Err(Error::Common(ndnlt_common::Error::UnsupportedFormat(format!(
                "unexpected top-level TLV {other}"
            )))),
        }
    }

    fn on_interest(&mut self, incoming_face: u16, interest: Interest) -> Result<()> {
        log::trace!("interest {} from face {}", interest.name, incoming_face);
        self.metrics.interest_processing_time.start();
        self.metrics.interests_received.increment();
        if let Some(entry) = self.cs.prefix_match(
            &self.nametree,
            &interest.name,
            interest.can_be_prefix,
            interest.must_be_fresh,
            self.clock.now(),
        ) {
            self.metrics.cs_hits.increment();
            self.metrics.interests_satisfied_from_cs.increment();
            let encoded = entry.data.encode();
            let mut buf = bytes::BytesMut::new();
            encoded.encode(&mut buf);
            if let Ok(face) = self.faces.get_mut(incoming_face) {
                let _ = send_through(face, &buf);
            }
            self.metrics.interest_processing_time.stop();
            return Ok(());
        }
        self.metrics.cs_misses.increment();
        if let Err(e) = self.check_route(&interest.name) {
            self.metrics.interest_processing_time.stop();
            return Err(e);
        }

        let pit_id = match self.find_or_insert_pit(&interest) {
            Ok(id) => id,
            Err(e) => {
                self.metrics.interest_processing_time.stop();
                return Err(e);
            }
        };
        self.pit.get_mut(pit_id).unwrap().incoming_faces.set(incoming_face);
        self.metrics.pit_inserts.increment();
        self.sync_table_gauges();

        let result = self.forward_interest(&interest, pit_id, Some(incoming_face));
        self.metrics.interest_processing_time.stop();
        result
    }

    /// Looks up the FIB and either satisfies the Interest through a locally
    /// registered prefix callback or forwards it to the route's nexthop
    /// faces in ascending face-id order.
    ///
    /// A zero `HopLimit` is rejected outright: the Interest has already
    /// traveled as far as its sender allowed. Otherwise the forwarded copy
    /// carries a decremented `HopLimit` so the next hop enforces the same
    /// budget.
    fn forward_interest(&mut self, interest: &Interest, pit_id: u16, incoming_face: Option<u16>) -> Result<()> {
        if interest.hop_limit == Some(0) {
            return Err(Error::InterestRejected("hop limit exhausted"));
        }

        // `check_route` already confirmed a FIB entry exists for this name
        // before the PIT entry was created; state is unchanged since then,
        // so this can only miss if that invariant is ever violated.
        let fib_id = match self.fib.prefix_match(&self.nametree, &interest.name) {
            Some(id) => id,
            None => return Err(Error::NoRoute(interest.name.clone())),
        };
        self.metrics.fib_hits.increment();

        let claimed = {
            let entry = self.fib.get_mut(fib_id).unwrap();
            match entry.on_interest.as_mut() {
                Some(cb) => cb(interest, incoming_face.unwrap_or(INVALID_ID)),
                None => false,
            }
        };
        if claimed {
            return Ok(());
        }

        let nexthop = self.fib.get(fib_id).unwrap().nexthop.clone();
        let already_sent = self
            .pit
            .get(pit_id)
            .map(|entry| entry.outgoing_faces.clone())
            .unwrap_or_default();

        let outgoing: Vec<u16> = nexthop
            .iter()
            .filter(|&id| incoming_face != Some(id) && !already_sent.contains(id))
            .collect();

        if let Some(entry) = self.pit.get_mut(pit_id) {
            for &face_id in &outgoing {
                entry.outgoing_faces.set(face_id);
            }
        }

        let outgoing_interest = match interest.hop_limit {
            Some(hop_limit) => interest.clone().with_hop_limit(hop_limit - 1),
            None => interest.clone(),
        };
        let encoded = outgoing_interest.encode();
        let mut buf = bytes::BytesMut::new();
        encoded.encode(&mut buf);

        for face_id in outgoing {
            if let Ok(face) = self.faces.get_mut(face_id) {
                if send_through(face, &buf).is_ok() {
                    self.metrics.interests_forwarded.increment();
                    self.metrics.bytes_sent.add(buf.len() as u64);
                }
            }
        }

        Ok(())
    }

    fn on_data(&mut self, incoming_face: u16, data: Data) -> Result<()> {
        self.metrics.data_processing_time.start();
        self.metrics.data_received.increment();
        let pit_id = match self.pit.prefix_match(&self.nametree, &data.name) {
            Some(id) => id,
            None => {
                log::debug!("unsolicited data {}: no matching pit entry", data.name);
                self.metrics.pit_misses.increment();
                self.metrics.data_processing_time.stop();
                return Ok(());
            }
        };
        self.metrics.pit_hits.increment();

        let (incoming_faces, mut on_data) = {
            let entry = self.pit.get_mut(pit_id).unwrap();
            (entry.incoming_faces.clone(), entry.on_data.take())
        };

        if let Some(cb) = &mut on_data {
            cb(&data);
        }

        let encoded = data.encode();
        let mut buf = bytes::BytesMut::new();
        encoded.encode(&mut buf);
        for face_id in incoming_faces.iter() {
            if face_id == incoming_face {
                continue;
            }
            if let Ok(face) = self.faces.get_mut(face_id) {
                if send_through(face, &buf).is_ok() {
                    self.metrics.data_sent.increment();
                    self.metrics.bytes_sent.add(buf.len() as u64);
                }
            }
        }

        let (_, evicted) = self.cs.insert(&mut self.nametree, data, &self.clock)?;
        self.metrics.cs_inserts.increment();
        if evicted {
            self.metrics.cs_evictions.increment();
        }
        self.pit.remove(&mut self.nametree, pit_id);
        self.sync_table_gauges();
        self.metrics.data_processing_time.stop();
        Ok(())
    }

    /// Publishes Data produced locally (e.g. answering a claimed Interest
    /// from `register_prefix`'s callback), satisfying any pending Interest
    /// and caching it.
    pub fn put_data(&mut self, data: Data) -> Result<()> {
        self.on_data(INVALID_ID, data)
    }

    /// Sweeps expired PIT entries, running each one's `on_timeout` once.
    /// Should be called periodically alongside `process_queue`.
    pub fn process_expired_interests(&mut self) {
        let now = self.clock.now();
        let expired: Vec<u16> = self
            .pit
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(id, _)| id)
            .collect();

        for pit_id in expired {
            if let Some(mut entry) = self.pit.remove(&mut self.nametree, pit_id) {
                log::debug!("interest {} timed out", entry.name);
                self.metrics.pit_timeouts.increment();
                if let Some(mut cb) = entry.on_timeout.take() {
                    cb();
                }
            }
        }
        self.sync_table_gauges();
    }

    /// Drains queued deferred work. Should be called at a fixed interval
    /// alongside `process_expired_interests`.
    pub fn process_queue(&mut self) -> usize {
        self.queue.process()
    }

    pub fn queue_mut(&mut self) -> &mut MessageQueue {
        &mut self.queue
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn multicast(&mut self, faces: &BitSet, packet: &[u8]) {
        self.faces.send_to_all(faces, packet);
    }

    pub fn face_table_capacity(&self) -> usize {
        self.faces.capacity()
    }

    pub fn cs(&self) -> &ContentStore {
        &self.cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceKind, FaceState};
    use ndnlt_common::clock::TestClock;
    use ndnlt_common::packet::{Signature, SignatureType};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    struct RecordingFace {
        state: FaceState,
        sent: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl Face for RecordingFace {
        fn up(&mut self) -> Result<()> {
            self.state = FaceState::Up;
            Ok(())
        }
        fn send(&mut self, packet: &[u8]) -> Result<()> {
            self.sent.borrow_mut().push(packet.to_vec());
            Ok(())
        }
        fn down(&mut self) -> Result<()> {
            self.state = FaceState::Down;
            Ok(())
        }
        fn state(&self) -> FaceState {
            self.state
        }
        fn kind(&self) -> FaceKind {
            FaceKind::Net
        }
    }

    fn recording_face() -> (Box<dyn Face>, Rc<RefCell<Vec<Vec<u8>>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        (
            Box::new(RecordingFace {
                state: FaceState::Down,
                sent: sent.clone(),
            }),
            sent,
        )
    }

    #[test]
    fn interest_with_route_is_forwarded_to_nexthop() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 1);
        fwd.on_interest(99, interest).unwrap();

        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn data_satisfies_pending_interest_and_is_cached() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();

        let interest = Interest::new(Name::from_str("/a").unwrap(), 1);
        let pit_id = fwd
            .pit
            .find_or_insert(&mut fwd.nametree, &interest, &fwd.clock)
            .unwrap();
        fwd.pit.get_mut(pit_id).unwrap().incoming_faces.set(face_id);

        let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
        let data = Data::new(Name::from_str("/a").unwrap(), b"hi".to_vec(), sig).unwrap();
        fwd.on_data(INVALID_ID, data).unwrap();

        assert_eq!(sent.borrow().len(), 1);
        assert_eq!(fwd.cs.len(), 1);
    }

    #[test]
    fn registered_prefix_callback_claims_interest() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let claimed = Rc::new(RefCell::new(false));
        let claimed2 = claimed.clone();
        fwd.register_prefix(
            &Name::from_str("/app").unwrap(),
            Box::new(move |_interest, _face| {
                *claimed2.borrow_mut() = true;
                true
            }),
        )
        .unwrap();

        let interest = Interest::new(Name::from_str("/app/ping").unwrap(), 1);
        fwd.on_interest(INVALID_ID, interest).unwrap();
        assert!(*claimed.borrow());
    }

    #[test]
    fn expired_interest_runs_timeout_callback() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, _sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let fired = Rc::new(RefCell::new(false));
        let fired2 = fired.clone();
        let interest = Interest::new(Name::from_str("/a").unwrap(), 1).with_lifetime(10);
        fwd.express_interest(
            interest,
            Box::new(|_| {}),
            Some(Box::new(move || *fired2.borrow_mut() = true)),
        )
        .unwrap();

        fwd.clock.advance(Duration::from_millis(50));
        fwd.process_expired_interests();
        assert!(*fired.borrow());
    }

    #[test]
    fn interest_with_no_route_is_rejected() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let interest = Interest::new(Name::from_str("/nowhere").unwrap(), 1);
        let err = fwd.express_interest(interest, Box::new(|_| {}), None).unwrap_err();
        assert!(matches!(err, Error::NoRoute(_)));
        assert_eq!(fwd.metrics().interests_no_route.value(), 1);
        assert_eq!(fwd.pit.iter().count(), 0);
    }

    #[test]
    fn interest_with_exhausted_hop_limit_is_rejected() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 1).with_hop_limit(0);
        let err = fwd.on_interest(99, interest).unwrap_err();
        assert!(matches!(err, Error::InterestRejected(_)));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn repeated_nonce_on_live_interest_is_rejected() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 42);
        fwd.on_interest(1, interest.clone()).unwrap();
        assert_eq!(sent.borrow().len(), 1);

        let err = fwd.on_interest(2, interest).unwrap_err();
        assert!(matches!(err, Error::InterestRejected(_)));
        assert_eq!(sent.borrow().len(), 1);
        assert_eq!(fwd.metrics().interests_rejected_dead_nonce.value(), 1);
    }

    #[test]
    fn retransmission_does_not_resend_to_an_already_pending_face() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 1);
        fwd.on_interest(99, interest).unwrap();
        assert_eq!(sent.borrow().len(), 1);

        let retransmit = Interest::new(Name::from_str("/a/b").unwrap(), 2);
        fwd.on_interest(99, retransmit).unwrap();
        assert_eq!(sent.borrow().len(), 1, "already-pending nexthop face must not be resent to");
    }

    #[test]
    fn metrics_count_interest_and_data_flow() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, _sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();

        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 1);
        fwd.on_interest(99, interest).unwrap();
        assert_eq!(fwd.metrics().interests_received.value(), 1);
        assert_eq!(fwd.metrics().cs_misses.value(), 1);
        assert_eq!(fwd.metrics().fib_hits.value(), 1);
        assert_eq!(fwd.metrics().interests_forwarded.value(), 1);

        let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
        let data = Data::new(Name::from_str("/a/b").unwrap(), b"hi".to_vec(), sig).unwrap();
        fwd.on_data(face_id, data).unwrap();
        assert_eq!(fwd.metrics().data_received.value(), 1);
        assert_eq!(fwd.metrics().pit_hits.value(), 1);
        assert_eq!(fwd.metrics().cs_inserts.value(), 1);
        assert_eq!(fwd.metrics().cs_size.value(), 1);
    }

    #[test]
    fn unregister_face_clears_routes() {
        let mut fwd = Forwarder::new(ForwarderConfig::default(), TestClock::new());
        let (face, _sent) = recording_face();
        let face_id = fwd.register_face(face).unwrap();
        fwd.add_route(face_id, &Name::from_str("/a").unwrap()).unwrap();
        fwd.unregister_face(face_id).unwrap();
        assert!(fwd.fib.find(&fwd.nametree, &Name::from_str("/a").unwrap()).is_none());
    }
}
