//! Expresses a single Interest against a remote node and prints whatever
//! Data comes back, or reports a timeout.

use anyhow::{Context, Result};
use ndnlt_common::clock::Rng;
use ndnlt_common::name::Name;
use ndnlt_common::packet::{Data, Interest};
use ndnlt_forwarder::config::ForwarderConfig;
use ndnlt_transport::{ClientOptions, NdnQuicClient};
use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::node::Node;

pub async fn send_interest(
    name_str: String,
    timeout_ms: u64,
    server_addr: SocketAddr,
    server_name: String,
) -> Result<()> {
    let name = Name::from_str(&name_str).with_context(|| format!("invalid name: {name_str}"))?;

    let (mut node, inbound_tx) = Node::new(ForwarderConfig::default());
    let client = NdnQuicClient::new(&ClientOptions::default(), inbound_tx)
        .await
        .context("failed to create QUIC client")?;

    println!("connecting to {server_addr}...");
    let pending = client
        .connect(server_addr, &server_name)
        .await
        .with_context(|| format!("failed to connect to {server_addr}"))?;
    let (face_id, _) = node.register(pending)?;
    node.route_everything_through(face_id)?;

    let nonce = node.rng.next_u32();
    let interest = Interest::new(name.clone(), nonce)
        .with_must_be_fresh(true)
        .with_lifetime(timeout_ms as u32);

    let received: Rc<RefCell<Option<Data>>> = Rc::new(RefCell::new(None));
    let received_cb = received.clone();
    let on_data = Box::new(move |data: &Data| {
        *received_cb.borrow_mut() = Some(data.clone());
    });

    println!("sending Interest for {name}");
    node.forwarder.express_interest(interest, on_data, None)?;

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline && received.borrow().is_none() {
        node.step(Duration::from_millis(20));
    }

    match received.borrow_mut().take() {
        Some(data) => {
            println!("received Data:");
            println!("  name: {}", data.name);
            println!("  freshness: {:?} ms", data.freshness_period_ms);
            match std::str::from_utf8(&data.content) {
                Ok(text) => println!("  content ({} bytes): {text}", data.content.len()),
                Err(_) => println!("  content: {} bytes (binary)", data.content.len()),
            }
        }
        None => println!("timed out after {timeout_ms}ms"),
    }

    client.close();
    Ok(())
}
