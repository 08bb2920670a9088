//! Sends a series of Interests against a single remote node, one after
//! another over the same face, and reports round-trip timing.

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
use crate::utils::{format_bytes, format_duration, print_header};

const PER_REQUEST_TIMEOUT_MS: u64 = 4000;

pub async fn run_benchmark(count: usize, prefix: String, server_addr: SocketAddr, server_name: String) -> Result<()> {
    println!("running benchmark: count={count}, prefix={prefix}");

    let (mut node, inbound_tx) = Node::new(ForwarderConfig::default());
    let client = NdnQuicClient::new(&ClientOptions::default(), inbound_tx)
        .await
        .context("failed to create QUIC client")?;
    let pending = client
        .connect(server_addr, &server_name)
        .await
        .with_context(|| format!("failed to connect to {server_addr}"))?;
    let (face_id, _) = node.register(pending)?;
    node.route_everything_through(face_id)?;

    let mut successes = 0usize;
    let mut timeouts = 0usize;
    let mut rtts = Vec::with_capacity(count);
    let start = Instant::now();

    for i in 0..count {
        let name = Name::from_str(&format!("{prefix}/{i}")).context("invalid benchmark name")?;
        let nonce = node.rng.next_u32();
        let interest = Interest::new(name, nonce)
            .with_must_be_fresh(true)
            .with_lifetime(PER_REQUEST_TIMEOUT_MS as u32);

        let received: Rc<RefCell<Option<Data>>> = Rc::new(RefCell::new(None));
        let received_cb = received.clone();
        let on_data = Box::new(move |data: &Data| {
            *received_cb.borrow_mut() = Some(data.clone());
        });

        let request_start = Instant::now();
        node.forwarder.express_interest(interest, on_data, None)?;

        let deadline = request_start + Duration::from_millis(PER_REQUEST_TIMEOUT_MS);
        while Instant::now() < deadline && received.borrow().is_none() {
            node.step(Duration::from_millis(10));
        }

        if received.borrow().is_some() {
            successes += 1;
            rtts.push(request_start.elapsed());
        } else {
            timeouts += 1;
        }

        if i % 50 == 0 {
            print!("\rprogress: {}/{count}", i + 1);
            std::io::Write::flush(&mut std::io::stdout()).ok();
        }
    }

    let total = start.elapsed();
    println!();
    print_header("benchmark results");
    println!("total interests: {count}");
    println!(
        "successful: {successes} ({:.1}%)",
        successes as f64 / count as f64 * 100.0
    );
    println!(
        "timeouts: {timeouts} ({:.1}%)",
        timeouts as f64 / count as f64 * 100.0
    );
    println!("total time: {}", format_duration(total));

    if !rtts.is_empty() {
        let total_rtt: Duration = rtts.iter().sum();
        let min_rtt = *rtts.iter().min().unwrap();
        let max_rtt = *rtts.iter().max().unwrap();
        println!("min rtt: {}", format_duration(min_rtt));
        println!("max rtt: {}", format_duration(max_rtt));
        println!("avg rtt: {}", format_duration(total_rtt / rtts.len() as u32));
    }

    let metrics = node.forwarder.metrics();
    println!(
        "local node: {} interests sent, {} received, {} sent",
        metrics.interests_sent.value(),
        format_bytes(metrics.bytes_received.value()),
        format_bytes(metrics.bytes_sent.value()),
    );

    client.close();
    Ok(())
}
