//! Dialing side of a node: at most one outbound connection at a time,
//! reconnected per request and dropped once the exchange finishes.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::{ErrorCode, Result};
use crate::network::connection::{new_inbound_queue, Connection, InboundQueue};
use crate::network::message::Message;

pub struct TcpClient {
    port: u16,
    connection: Option<Connection>,
    inbound: InboundQueue,
}

impl TcpClient {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            connection: None,
            inbound: new_inbound_queue(),
        }
    }

    /// Synchronously dials `ipv4` on the client's fixed port. Fails with
    /// `ClientConnectionOccupied` while a connection is already up.
    pub async fn connect(&mut self, ipv4: &str) -> Result<()> {
        if self.connection.is_some() {
            return Err(ErrorCode::ClientConnectionOccupied);
        }

        let stream = TcpStream::connect((ipv4, self.port))
            .await
            .map_err(ErrorCode::from_io)?;

        self.connection = Some(Connection::new(stream, Arc::clone(&self.inbound)));
        Ok(())
    }

    /// Drops the outbound connection, closing its socket.
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn push_outbound(&mut self, msg: Message) {
        if let Some(connection) = self.connection.as_mut() {
            connection.push_outbound(msg);
        }
    }

    /// Sends everything queued without running a receive cycle.
    pub async fn transmit_outbound_only(&mut self) -> Result<()> {
        match self.connection.as_mut() {
            Some(connection) => connection.transmit_outbound().await,
            None => Ok(()),
        }
    }

    /// One full flush cycle on the outbound connection; a terminal
    /// socket error drops the connection before the error is returned.
    pub async fn update(&mut self) -> Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };

        match connection.flush().await {
            Ok(()) => Ok(()),
            Err(err) if err.is_terminal() => {
                self.disconnect();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn inbound(&self) -> InboundQueue {
        Arc::clone(&self.inbound)
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
