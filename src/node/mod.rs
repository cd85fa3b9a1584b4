//! A network node: the dual-role composition of a listening server and
//! a dialing client around the local mempool and chain. Inbound
//! messages are dispatched here; outbound request helpers live in
//! [`requests`].

pub mod requests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::oneshot;

use crate::blockchain::{Chain, Mempool};
use crate::config::NetworkType;
use crate::error::{ErrorCode, Result};
use crate::network::message::{Message, MessageKind, ReceivedMessage};
use crate::network::{TcpClient, TcpServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Full,
    Wallet,
    SoloMiner,
}

impl NodeType {
    /// Wire tags are fixed: 0 = full, 1 = wallet, 2 = solo miner.
    pub fn wire_tag(self) -> i32 {
        match self {
            NodeType::Full => 0,
            NodeType::Wallet => 1,
            NodeType::SoloMiner => 2,
        }
    }

    pub fn from_wire_tag(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(NodeType::Full),
            1 => Ok(NodeType::Wallet),
            2 => Ok(NodeType::SoloMiner),
            _ => Err(ErrorCode::ReceivedTransmittedDataInvalid),
        }
    }
}

/// An entry in a node's peer list, learned through the GUID exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub node_type: NodeType,
    pub guid: u64,
    pub address: String,
    pub stores_full_chain: bool,
}

/// Tagged result delivered through a pending-request future. Only
/// balances today; the tag leaves room for further request kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    Balance(f64),
}

/// Balance value a responder sends when it could not serve the request.
const BALANCE_ERROR_SENTINEL: f64 = -1.0;

pub struct Node {
    node_type: NodeType,
    guid: u64,
    network_id: u64,
    server: TcpServer,
    client: TcpClient,
    peers: StdMutex<Vec<Peer>>,
    pending: StdMutex<HashMap<u32, oneshot::Sender<ResponseValue>>>,
    mempool: Option<Arc<StdMutex<Mempool>>>,
    chain: Option<Arc<StdMutex<Chain>>>,
}

impl Node {
    /// Standard construction: the node listens and dials on the same
    /// well-known port. Full nodes must carry a chain and solo miners a
    /// mempool; violations fail instead of half-constructing.
    pub async fn new(
        node_type: NodeType,
        mempool: Option<Arc<StdMutex<Mempool>>>,
        chain: Option<Arc<StdMutex<Chain>>>,
        port: u16,
        network: NetworkType,
    ) -> Result<Self> {
        Self::with_ports(node_type, mempool, chain, port, port, network).await
    }

    /// Split-port construction for setups (and tests) where several
    /// nodes share one host: `listen_port` may be 0 for an ephemeral
    /// bind while `dial_port` stays the network's well-known port.
    pub async fn with_ports(
        node_type: NodeType,
        mempool: Option<Arc<StdMutex<Mempool>>>,
        chain: Option<Arc<StdMutex<Chain>>>,
        listen_port: u16,
        dial_port: u16,
        network: NetworkType,
    ) -> Result<Self> {
        if node_type == NodeType::Full && chain.is_none() {
            return Err(ErrorCode::NodeChainRequired);
        }
        if node_type == NodeType::SoloMiner && mempool.is_none() {
            return Err(ErrorCode::NodeMempoolRequired);
        }

        let mut server = TcpServer::new(listen_port);
        server.start_listener().await?;

        Ok(Self {
            node_type,
            guid: 0,
            network_id: network.network_id(),
            server,
            client: TcpClient::new(dial_port),
            peers: StdMutex::new(Vec::new()),
            pending: StdMutex::new(HashMap::new()),
            mempool,
            chain,
        })
    }

    /// Assigns the node identity and optionally seeds the peer list.
    pub fn init(&mut self, guid: u64, peers: Option<Vec<Peer>>) {
        self.guid = guid;
        if let Some(peers) = peers {
            *self.peers.lock().expect("peer list lock") = peers;
        }
    }

    /// One node cycle: pump the client and server sockets, then
    /// dispatch everything that arrived. Client-side messages are
    /// handled before server-side ones.
    pub async fn flush(&mut self) -> Result<()> {
        self.client.update().await?;

        self.server.update().await;
        if let Some(err) = self.server.listener_error() {
            return Err(err);
        }

        loop {
            let msg = self.client.inbound().lock().expect("inbound lock").pop_front();
            match msg {
                Some(msg) => self.dispatch_client_message(msg).await?,
                None => break,
            }
        }

        loop {
            let msg = self.server.inbound().lock().expect("inbound lock").pop_front();
            match msg {
                Some(msg) => self.dispatch_server_message(msg).await?,
                None => break,
            }
        }

        Ok(())
    }

    /// Responses arriving on the connection this node dialed out.
    async fn dispatch_client_message(&mut self, msg: ReceivedMessage) -> Result<()> {
        if msg.message.header.network_id != self.network_id {
            log::debug!("dropping client message from foreign network");
            return Ok(());
        }

        match msg.message.header.kind {
            MessageKind::NodeGuidResponse => self.accept_peer_identity(&msg),
            MessageKind::AddressAmountResponse => self.complete_balance_request(&msg),
            _ => Ok(()),
        }
    }

    /// Requests arriving on connections other nodes opened to us.
    async fn dispatch_server_message(&mut self, msg: ReceivedMessage) -> Result<()> {
        if msg.message.header.network_id != self.network_id {
            log::debug!("dropping server message from foreign network");
            return Ok(());
        }

        match msg.message.header.kind {
            MessageKind::NodeGuidRequest => self.answer_guid_request(&msg).await,
            MessageKind::AddressAmountRequest => self.answer_balance_request(&msg).await,
            _ => Ok(()),
        }
    }

    /// Payload: `[int type, u64 guid, int stores_full_chain]` in pop
    /// order. Adds the responder to the peer list and closes the
    /// outbound connection; the exchange is complete.
    fn accept_peer_identity(&mut self, msg: &ReceivedMessage) -> Result<()> {
        let mut reader = msg.message.reader();
        let node_type = NodeType::from_wire_tag(reader.next::<i32>()?)?;
        let guid = reader.next::<u64>()?;
        let stores_full_chain = reader.next::<i32>()? != 0;

        self.client.disconnect();

        let mut peers = self.peers.lock().expect("peer list lock");
        if peers.iter().any(|peer| peer.guid == guid) {
            return Err(ErrorCode::PeerNodeAlreadyInPeerList);
        }

        peers.push(Peer {
            node_type,
            guid,
            address: msg.sender_address.clone(),
            stores_full_chain,
        });
        log::info!("added peer {guid} at {}", msg.sender_address);
        Ok(())
    }

    /// Answers a GUID request with this node's identity triple.
    async fn answer_guid_request(&mut self, msg: &ReceivedMessage) -> Result<()> {
        let mut response = Message::new(MessageKind::NodeGuidResponse, self.network_id);
        response
            .push(self.chain.is_some() as i32)
            .push(self.guid)
            .push(self.node_type.wire_tag());

        self.server.push_response(msg, response).await
    }

    /// Payload: `[string address, u32 request id]` in pop order. The
    /// answered balance is `-1.0` when this node cannot serve it.
    async fn answer_balance_request(&mut self, msg: &ReceivedMessage) -> Result<()> {
        let mut reader = msg.message.reader();
        let address = reader.next_string()?;
        let request_id = reader.next::<u32>()?;

        let balance = match (&self.chain, crate::crypto::KeyPair::from_public_hex(&address)) {
            (Some(chain), Ok(_)) => chain.lock().expect("chain lock").address_balance(&address),
            _ => BALANCE_ERROR_SENTINEL,
        };

        let mut response = Message::new(MessageKind::AddressAmountResponse, self.network_id);
        response.push(request_id).push(balance);

        self.server.push_response(msg, response).await
    }

    /// Payload: `[f64 balance, u32 request id]` in pop order. Fulfills
    /// and removes the matching pending request.
    fn complete_balance_request(&mut self, msg: &ReceivedMessage) -> Result<()> {
        let mut reader = msg.message.reader();
        let balance = reader.next::<f64>()?;
        let request_id = reader.next::<u32>()?;

        if balance == BALANCE_ERROR_SENTINEL {
            return Err(ErrorCode::BalanceRequestPeerSideError);
        }

        let sender = self
            .pending
            .lock()
            .expect("pending table lock")
            .remove(&request_id);

        if let Some(sender) = sender {
            // The requester may have dropped its future; nothing to do.
            let _ = sender.send(ResponseValue::Balance(balance));
        }

        Ok(())
    }

    pub fn guid(&self) -> u64 {
        self.guid
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// The server's actual listen port (resolved after an ephemeral
    /// bind).
    pub fn port(&self) -> u16 {
        self.server.port()
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.peers.lock().expect("peer list lock").clone()
    }

    pub fn chain(&self) -> Option<&Arc<StdMutex<Chain>>> {
        self.chain.as_ref()
    }

    pub fn mempool(&self) -> Option<&Arc<StdMutex<Mempool>>> {
        self.mempool.as_ref()
    }

    pub fn server(&self) -> &TcpServer {
        &self.server
    }

    pub fn client(&mut self) -> &mut TcpClient {
        &mut self.client
    }

    pub(crate) fn client_ref(&self) -> &TcpClient {
        &self.client
    }

    pub(crate) fn pending_table(
        &self,
    ) -> &StdMutex<HashMap<u32, oneshot::Sender<ResponseValue>>> {
        &self.pending
    }
}
