//! Accepting side of a node. A dedicated task accepts inbound peers
//! and parks them in an id-keyed connection table; the application
//! drives `update` cycles to pump every connection's socket.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{ErrorCode, Result};
use crate::network::connection::{new_inbound_queue, Connection, InboundQueue};
use crate::network::message::{Message, ReceivedMessage};

type ConnectionTable = Arc<Mutex<BTreeMap<u32, Connection>>>;

pub struct TcpServer {
    port: u16,
    connections: ConnectionTable,
    inbound: InboundQueue,
    listening: Arc<AtomicBool>,
    listener_error: Arc<StdMutex<Option<ErrorCode>>>,
    shutdown: Option<watch::Sender<bool>>,
    acceptor: Option<JoinHandle<()>>,
}

impl TcpServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            connections: Arc::new(Mutex::new(BTreeMap::new())),
            inbound: new_inbound_queue(),
            listening: Arc::new(AtomicBool::new(false)),
            listener_error: Arc::new(StdMutex::new(None)),
            shutdown: None,
            acceptor: None,
        }
    }

    /// Binds the listen port and spawns the acceptor task. Calling this
    /// while already listening is a no-op. Port 0 binds an ephemeral
    /// port, readable back through [`TcpServer::port`].
    pub async fn start_listener(&mut self) -> Result<()> {
        if self.listening.load(Ordering::SeqCst) {
            return Ok(());
        }

        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        self.port = listener.local_addr()?.port();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.shutdown = Some(shutdown_tx);
        self.listening.store(true, Ordering::SeqCst);

        let connections = Arc::clone(&self.connections);
        let inbound = Arc::clone(&self.inbound);
        let listening = Arc::clone(&self.listening);
        let listener_error = Arc::clone(&self.listener_error);

        self.acceptor = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            let connection =
                                Connection::new(stream, Arc::clone(&inbound));
                            log::debug!(
                                "accepted connection {} from {}",
                                connection.id(),
                                addr
                            );
                            connections.lock().await.insert(connection.id(), connection);
                        }
                        Err(err) => {
                            log::warn!("listener accept failed: {err}");
                            *listener_error.lock().expect("listener error lock") =
                                Some(ErrorCode::from_io(err));
                        }
                    },
                }
            }

            listening.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Stops the acceptor task. Existing connections stay in the table
    /// and keep being flushed by `update`.
    pub fn stop_listener(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }
        self.listening.store(false, Ordering::SeqCst);
    }

    /// Queues `msg` on the connection a request arrived through.
    pub async fn push_response(&self, received: &ReceivedMessage, msg: Message) -> Result<()> {
        let mut connections = self.connections.lock().await;

        match connections.get_mut(&received.connection_id) {
            Some(connection) => {
                connection.push_outbound(msg);
                Ok(())
            }
            None => Err(ErrorCode::ConnectionNoLongerOpen),
        }
    }

    /// Queues `msg` on every open connection.
    pub async fn broadcast(&self, msg: Message) {
        let mut connections = self.connections.lock().await;
        for connection in connections.values_mut() {
            connection.push_outbound(msg.clone());
        }
    }

    /// One pump cycle: flush every connection, dropping those whose
    /// sockets reported a terminal error.
    pub async fn update(&self) {
        let mut connections = self.connections.lock().await;
        let mut closed = Vec::new();

        for (id, connection) in connections.iter_mut() {
            if let Err(err) = connection.flush().await {
                if err.is_terminal() {
                    log::debug!("connection {id} closed: {err}");
                    closed.push(*id);
                } else {
                    log::warn!("connection {id} flush error: {err}");
                }
            }
        }

        for id in closed {
            connections.remove(&id);
        }
    }

    pub fn inbound(&self) -> InboundQueue {
        Arc::clone(&self.inbound)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Takes the last acceptor error, if one was recorded.
    pub fn listener_error(&self) -> Option<ErrorCode> {
        self.listener_error.lock().expect("listener error lock").take()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of live connections; used by tests and status logging.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop_listener();
    }
}
