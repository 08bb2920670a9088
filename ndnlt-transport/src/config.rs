//! TLS/QUIC endpoint setup for turning a certificate and key on disk into
//! the `quinn::ServerConfig`/`ClientConfig` that `NdnQuicServer`/
//! `NdnQuicClient` bind to. Nothing here knows about `Face` or `Forwarder`;
//! it only prepares the two config structs quinn itself needs.

use anyhow::{Context, Result};
use quinn::{ClientConfig, ServerConfig, VarInt};
use rustls::{Certificate, PrivateKey};
use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::NDN_QUIC_ALPN;

/// Settings for the listening side of a face.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Address to bind the QUIC endpoint to.
    pub listen_addr: String,

    /// PEM-encoded certificate presented to connecting peers.
    pub cert_path: PathBuf,

    /// PEM-encoded private key matching `cert_path`.
    pub key_path: PathBuf,

    /// Connection is dropped after this much silence, in either direction.
    pub idle_timeout_ms: Option<u64>,

    /// How often to send a keep-alive when the connection is otherwise idle.
    pub keep_alive_interval_ms: Option<u64>,

    /// Upper bound on uni streams a single connection may have open at
    /// once; each inbound logical packet claims one until it's reassembled.
    pub max_concurrent_streams: Option<u32>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:6367".to_string(),
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
            idle_timeout_ms: Some(30_000),
            keep_alive_interval_ms: Some(5_000),
            max_concurrent_streams: Some(1_000),
        }
    }
}

/// Settings for the connecting side of a face.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Trust root for the server's certificate; `None` uses the platform's
    /// native root store.
    pub ca_cert_path: Option<PathBuf>,

    /// Connection is dropped after this much silence, in either direction.
    pub idle_timeout_ms: Option<u64>,

    /// How often to send a keep-alive when the connection is otherwise idle.
    pub keep_alive_interval_ms: Option<u64>,

    /// Skips certificate validation entirely. Only meant for loopback
    /// testing against a self-signed `serve` instance.
    pub verify_certificate: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            idle_timeout_ms: Some(30_000),
            keep_alive_interval_ms: Some(5_000),
            verify_certificate: true,
        }
    }
}

/// A certificate and the private key it was signed with, loaded from disk.
struct Identity {
    cert: Certificate,
    key: PrivateKey,
}

fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity> {
    Ok(Identity {
        cert: read_certificate(cert_path)?,
        key: read_private_key(key_path)?,
    })
}

/// Builds the `quinn::ServerConfig` a listening face binds to, applying the
/// idle/keep-alive/stream-count limits from `options` on top of quinn's
/// single-certificate default.
pub async fn configure_server(options: &ServerOptions) -> Result<ServerConfig> {
    let identity = load_identity(&options.cert_path, &options.key_path)
        .with_context(|| format!("loading identity for {}", options.listen_addr))?;

    let mut server_config = ServerConfig::with_single_cert(vec![identity.cert], identity.key)
        .context("building server config from certificate")?;
    server_config.alpn_protocols = vec![NDN_QUIC_ALPN.to_vec()];

    let transport = Arc::get_mut(&mut server_config.transport)
        .context("transport config already shared before it could be configured")?;
    apply_transport_limits(transport, options.idle_timeout_ms, options.keep_alive_interval_ms);
    if let Some(max_streams) = options.max_concurrent_streams {
        transport.max_concurrent_uni_streams(VarInt::from_u32(max_streams));
    }

    Ok(server_config)
}

/// Builds the `quinn::ClientConfig` a connecting face uses, wiring up
/// either native root verification, a pinned CA, or (for loopback testing)
/// no verification at all.
pub async fn configure_client(options: &ClientOptions) -> Result<ClientConfig> {
    let mut crypto = if !options.verify_certificate {
        let mut crypto = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
            .with_no_client_auth();
        crypto.enable_early_data = true;
        crypto.alpn_protocols = vec![NDN_QUIC_ALPN.to_vec()];
        return Ok(ClientConfig::new(Arc::new(crypto)));
    } else if let Some(ca_path) = &options.ca_cert_path {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(&read_certificate(ca_path)?)?;
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth()
    } else {
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_native_roots()
            .with_no_client_auth()
    };

    crypto.enable_early_data = true;
    crypto.alpn_protocols = vec![NDN_QUIC_ALPN.to_vec()];

    let mut client_config = ClientConfig::new(Arc::new(crypto));
    let transport = Arc::get_mut(&mut client_config.transport)
        .context("transport config already shared before it could be configured")?;
    apply_transport_limits(transport, options.idle_timeout_ms, options.keep_alive_interval_ms);

    Ok(client_config)
}

fn apply_transport_limits(
    transport: &mut quinn::TransportConfig,
    idle_timeout_ms: Option<u64>,
    keep_alive_interval_ms: Option<u64>,
) {
    if let Some(idle_timeout_ms) = idle_timeout_ms {
        transport.max_idle_timeout(Some(VarInt::from_u32(idle_timeout_ms as u32)));
    }
    if let Some(keep_alive_ms) = keep_alive_interval_ms {
        transport.keep_alive_interval(Some(Duration::from_millis(keep_alive_ms)));
    }
}

fn read_certificate<P: AsRef<Path>>(path: P) -> Result<Certificate> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("opening certificate file {}", path.as_ref().display()))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .with_context(|| format!("parsing certificate file {}", path.as_ref().display()))?;
    let der = certs
        .into_iter()
        .next()
        .with_context(|| format!("no certificate in {}", path.as_ref().display()))?;

    Ok(Certificate(der))
}

/// Tries PKCS8 first, then falls back to PKCS1/RSA, rewinding the reader
/// between attempts since both parsers consume it.
fn read_private_key<P: AsRef<Path>>(path: P) -> Result<PrivateKey> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("opening key file {}", path.as_ref().display()))?;
    let mut reader = BufReader::new(file);

    if let Ok(keys) = rustls_pemfile::pkcs8_private_keys(&mut reader) {
        if let Some(key) = keys.into_iter().next() {
            return Ok(PrivateKey(key));
        }
    }

    reader.seek(SeekFrom::Start(0))?;

    if let Ok(keys) = rustls_pemfile::rsa_private_keys(&mut reader) {
        if let Some(key) = keys.into_iter().next() {
            return Ok(PrivateKey(key));
        }
    }

    anyhow::bail!("no private key (PKCS8 or RSA) found in {}", path.as_ref().display())
}

/// Accepts any server certificate. Only ever installed when
/// `ClientOptions::verify_certificate` is explicitly set to `false`.
struct SkipServerVerification;

impl rustls::client::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> std::result::Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}
