//! Binary entry point for voltara.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::signal;

use voltara::config::{NetworkType, NodeConfig};
use voltara::{Chain, Mempool, Node, NodeType};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NetworkArg {
    Mainnet,
    Testnet,
}

impl From<NetworkArg> for NetworkType {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Mainnet => NetworkType::Mainnet,
            NetworkArg::Testnet => NetworkType::Testnet,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Full,
    Wallet,
    SoloMiner,
}

impl From<RoleArg> for NodeType {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Full => NodeType::Full,
            RoleArg::Wallet => NodeType::Wallet,
            RoleArg::SoloMiner => NodeType::SoloMiner,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "voltara", about = "Educational proof-of-work cryptocurrency node")]
struct Args {
    /// Network to join.
    #[arg(long, value_enum, default_value_t = NetworkArg::Mainnet)]
    network: NetworkArg,

    /// Node role.
    #[arg(long, value_enum, default_value_t = RoleArg::Full)]
    role: RoleArg,

    /// Listen/dial port; defaults to the network's well-known port.
    #[arg(long)]
    port: Option<u16>,

    /// Node GUID; random when omitted.
    #[arg(long)]
    guid: Option<u64>,

    /// IPv4 of a peer to add on startup.
    #[arg(long)]
    peer: Option<String>,

    /// Flush loop tick, in milliseconds.
    #[arg(long, default_value_t = 50)]
    flush_interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let network: NetworkType = args.network.into();
    let role: NodeType = args.role.into();

    let config = NodeConfig {
        network,
        port: args.port.unwrap_or_else(|| network.default_port()),
        guid: args.guid.unwrap_or_else(rand::random),
        initial_peer: args.peer,
        flush_interval_ms: args.flush_interval_ms,
    };

    // Every role here runs with in-memory state; the chain and mempool
    // are only attached where the role calls for them.
    let chain = match role {
        NodeType::Full | NodeType::SoloMiner => Some(Arc::new(Mutex::new(Chain::new()))),
        NodeType::Wallet => None,
    };
    let mempool = match role {
        NodeType::SoloMiner => Some(Arc::new(Mutex::new(Mempool::new()))),
        _ => None,
    };

    let mut node = Node::new(role, mempool, chain, config.port, config.network).await?;
    node.init(config.guid, None);
    log::info!(
        "node {} ({role:?}) listening on port {} ({network:?})",
        config.guid,
        node.port()
    );

    if let Some(peer) = &config.initial_peer {
        node.add_peer(peer).await?;
        log::info!("requested identity of peer {peer}");
    }

    let mut flush_tick = tokio::time::interval(Duration::from_millis(config.flush_interval_ms));
    let mut status_tick = tokio::time::interval(Duration::from_secs(10));

    loop {
        tokio::select! {
            _ = flush_tick.tick() => {
                if let Err(err) = node.flush().await {
                    log::warn!("flush error: {err}");
                }
            }
            _ = status_tick.tick() => {
                log::info!(
                    "peers={} connections={}",
                    node.peers().len(),
                    node.server().connection_count().await
                );
            }
            _ = signal::ctrl_c() => break,
        }
    }

    log::info!("shutdown signal received, exiting");
    Ok(())
}
