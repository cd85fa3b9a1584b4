//! Outbound request helpers: each dials a peer, queues the request
//! frame and transmits it; the matching response is picked up by a
//! later [`Node::flush`](crate::node::Node::flush) cycle.

use tokio::sync::oneshot;

use crate::config::PEER_CONNECT_ATTEMPTS;
use crate::error::{ErrorCode, Result};
use crate::network::message::{Message, MessageKind};
use crate::node::{Node, NodeType, ResponseValue};

impl Node {
    /// Dials `ipv4` and asks for the remote node's identity. The
    /// response lands in the peer list on a following flush cycle.
    pub async fn add_peer(&mut self, ipv4: &str) -> Result<()> {
        self.client().connect(ipv4).await?;

        let request = Message::new(MessageKind::NodeGuidRequest, self.network_id());
        self.client().push_outbound(request);
        self.client().transmit_outbound_only().await
    }

    /// Asks a chain-bearing peer for the balance of `public_key_hex`.
    /// Returns a one-shot future the answering flush cycle fulfills
    /// with [`ResponseValue::Balance`].
    pub async fn request_address_balance(
        &mut self,
        public_key_hex: &str,
    ) -> Result<oneshot::Receiver<ResponseValue>> {
        let target = self
            .peers()
            .into_iter()
            .find(|peer| {
                peer.node_type == NodeType::Full
                    || (peer.node_type == NodeType::SoloMiner && peer.stores_full_chain)
            })
            .ok_or(ErrorCode::NoSuitableNodeInNodePeerList)?;

        let mut last_error = None;
        for attempt in 1..=PEER_CONNECT_ATTEMPTS {
            match self.client().connect(&target.address).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(err) => {
                    log::debug!(
                        "connect attempt {attempt}/{PEER_CONNECT_ATTEMPTS} to {} failed: {err}",
                        target.address
                    );
                    last_error = Some(err);
                }
            }
        }
        if let Some(err) = last_error {
            return Err(err);
        }

        let request_id = self.generate_request_id();
        let (sender, receiver) = oneshot::channel();
        self.pending_table()
            .lock()
            .expect("pending table lock")
            .insert(request_id, sender);

        let mut request = Message::new(MessageKind::AddressAmountRequest, self.network_id());
        request.push(request_id).push_str(public_key_hex);

        self.client().push_outbound(request);
        self.client().transmit_outbound_only().await?;

        Ok(receiver)
    }

    /// A fresh 32-bit request id no pending entry is using.
    fn generate_request_id(&self) -> u32 {
        let pending = self.pending_table().lock().expect("pending table lock");
        loop {
            let id = rand::random::<u32>();
            if !pending.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkType;
    use crate::node::Peer;

    #[tokio::test]
    async fn balance_request_needs_a_chain_bearing_peer() {
        let mut node = Node::new(NodeType::Wallet, None, None, 0, NetworkType::Testnet)
            .await
            .unwrap();
        node.init(1, None);

        // Empty peer list.
        assert!(matches!(
            node.request_address_balance("vpk_ab").await,
            Err(ErrorCode::NoSuitableNodeInNodePeerList)
        ));

        // Wallets and chainless solo miners don't qualify either.
        node.init(
            1,
            Some(vec![
                Peer {
                    node_type: NodeType::Wallet,
                    guid: 7,
                    address: "127.0.0.1".to_string(),
                    stores_full_chain: false,
                },
                Peer {
                    node_type: NodeType::SoloMiner,
                    guid: 8,
                    address: "127.0.0.1".to_string(),
                    stores_full_chain: false,
                },
            ]),
        );
        assert!(matches!(
            node.request_address_balance("vpk_ab").await,
            Err(ErrorCode::NoSuitableNodeInNodePeerList)
        ));
    }

    #[tokio::test]
    async fn unreachable_suitable_peer_fails_after_retries() {
        // Bind-then-drop for a dead port.
        let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = probe.local_addr().unwrap().port();
        drop(probe);

        let mut node = Node::with_ports(
            NodeType::Wallet,
            None,
            None,
            0,
            dead_port,
            NetworkType::Testnet,
        )
        .await
        .unwrap();
        node.init(
            1,
            Some(vec![Peer {
                node_type: NodeType::Full,
                guid: 7,
                address: "127.0.0.1".to_string(),
                stores_full_chain: true,
            }]),
        );

        assert!(node.request_address_balance("vpk_ab").await.is_err());
    }
}
