//! Publishes a single piece of Data and serves it over QUIC until the
//! process is interrupted. Thin wrapper around `serve::run` with exactly one
//! cached Data entry and no configured routes (content is answered straight
//! out of the content store regardless of the FIB).

use anyhow::Result;
use std::path::PathBuf;

use crate::commands::serve;

pub async fn publish_data(
    name: String,
    content: String,
    ttl_ms: u32,
    listen_addr: String,
    cert: PathBuf,
    key: PathBuf,
) -> Result<()> {
    serve::run(listen_addr, cert, key, Vec::new(), Some((name, content, ttl_ms))).await
}
