//! Runs a forwarding node: binds a QUIC listener, accepts connections from
//! peers as they arrive, and optionally serves one piece of static content
//! and/or a set of routes configured at startup.
//!
//! There's no separate daemon/control-plane split here — on a
//! resource-constrained device the FIB is whatever the device was told to
//! run with, not something a remote CLI invocation edits at runtime.

use anyhow::{Context, Result};
use ndnlt_common::name::Name;
use ndnlt_common::packet::{Data, Signature, SignatureType};
use ndnlt_forwarder::config::ForwarderConfig;
use ndnlt_transport::{NdnQuicServer, ServerOptions};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;

use crate::node::Node;

/// Route prefixes, resolved against every face as it's accepted — routes
/// can't name a specific face ahead of a peer showing up, so this CLI's
/// `--route` flags apply to whichever face connects.
pub async fn run(
    listen_addr: String,
    cert: PathBuf,
    key: PathBuf,
    routes: Vec<String>,
    publish: Option<(String, String, u32)>,
) -> Result<()> {
    let routes = routes
        .iter()
        .map(|p| Name::from_str(p).with_context(|| format!("invalid route prefix: {p}")))
        .collect::<Result<Vec<_>>>()?;

    let (mut node, inbound_tx) = Node::new(ForwarderConfig::default());

    if let Some((name, content, ttl_ms)) = publish {
        let name = Name::from_str(&name).context("invalid publish name")?;
        let signature = Signature::new(SignatureType::DigestSha256, vec![0u8; 32])?;
        let data = Data::new(name.clone(), content.into_bytes(), signature)?.with_freshness_period(ttl_ms);
        node.forwarder.put_data(data)?;
        println!("serving cached Data under {name}");
    }

    let options = ServerOptions {
        listen_addr: listen_addr.clone(),
        cert_path: cert,
        key_path: key,
        ..Default::default()
    };
    let server = NdnQuicServer::bind(&options, inbound_tx)
        .await
        .context("failed to bind QUIC listener")?;
    println!("listening on {}", server.local_addr()?);

    loop {
        tokio::select! {
            pending = server.accept() => {
                let Some(pending) = pending else {
                    println!("listener closed");
                    break;
                };
                let (face_id, remote) = node.register(pending)?;
                println!("accepted connection from {remote} as face {face_id}");
                for prefix in &routes {
                    node.forwarder.add_route(face_id, prefix)?;
                }
                if routes.is_empty() {
                    node.route_everything_through(face_id)?;
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(20)) => {
                node.step(Duration::from_millis(0));
            }
            _ = signal::ctrl_c() => {
                println!("shutting down");
                server.close();
                break;
            }
        }
    }

    let metrics = node.forwarder.metrics();
    println!(
        "served {} interests ({} from cache, {} forwarded, {} no route), {} cache hits / {} misses",
        metrics.interests_received.value(),
        metrics.interests_satisfied_from_cs.value(),
        metrics.interests_forwarded.value(),
        metrics.interests_no_route.value(),
        metrics.cs_hits.value(),
        metrics.cs_misses.value(),
    );

    Ok(())
}
