use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;
mod node;
mod utils;

/// Command-line tool for running and exercising a lightweight NDN forwarder.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a forwarding node: bind a QUIC listener and accept connections
    Serve {
        /// Address to listen on
        #[clap(short, long, default_value = "0.0.0.0:6367")]
        listen: String,

        /// Path to the TLS certificate
        #[clap(long, default_value = "cert.pem")]
        cert: PathBuf,

        /// Path to the TLS private key
        #[clap(long, default_value = "key.pem")]
        key: PathBuf,

        /// Route prefix to install for every accepted face (repeatable);
        /// with none given, each face gets a default route for everything
        #[clap(short, long = "route")]
        routes: Vec<String>,
    },

    /// Send an Interest and print the Data response
    Interest {
        /// Name to request (NDN URI format)
        name: String,

        /// Timeout in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u64,

        /// Address of the node to connect to
        #[clap(short, long, default_value = "127.0.0.1:6367")]
        server: SocketAddr,

        /// TLS server name to present during the handshake
        #[clap(long, default_value = "localhost")]
        server_name: String,
    },

    /// Publish Data under a name and serve it until interrupted
    Publish {
        /// Name to publish under (NDN URI format)
        name: String,

        /// Content to publish (string)
        content: String,

        /// Freshness period in milliseconds
        #[clap(short, long, default_value = "60000")]
        ttl: u32,

        /// Address to listen on
        #[clap(short, long, default_value = "0.0.0.0:6367")]
        listen: String,

        /// Path to the TLS certificate
        #[clap(long, default_value = "cert.pem")]
        cert: PathBuf,

        /// Path to the TLS private key
        #[clap(long, default_value = "key.pem")]
        key: PathBuf,
    },

    /// Benchmark round-trip Interest/Data exchange against a running node
    Benchmark {
        /// Number of Interests to send
        #[clap(short, long, default_value = "1000")]
        count: usize,

        /// Name prefix to use for the benchmark
        #[clap(short, long, default_value = "/benchmark")]
        prefix: String,

        /// Address of the node to connect to
        #[clap(short, long, default_value = "127.0.0.1:6367")]
        server: SocketAddr,

        /// TLS server name to present during the handshake
        #[clap(long, default_value = "localhost")]
        server_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Serve { listen, cert, key, routes } => {
            commands::serve::run(listen, cert, key, routes, None).await?;
        }
        Commands::Interest { name, timeout, server, server_name } => {
            commands::interest::send_interest(name, timeout, server, server_name).await?;
        }
        Commands::Publish { name, content, ttl, listen, cert, key } => {
            commands::publish::publish_data(name, content, ttl, listen, cert, key).await?;
        }
        Commands::Benchmark { count, prefix, server, server_name } => {
            commands::benchmark::run_benchmark(count, prefix, server, server_name).await?;
        }
    }

    Ok(())
}
