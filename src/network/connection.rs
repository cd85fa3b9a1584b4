//! A single peer stream endpoint. Each connection owns its outbound
//! queue and shares the inbound queue of whichever server or client it
//! belongs to. All socket work happens inside one bounded `flush`
//! cycle: at most one frame out, at most one frame in.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ErrorCode, Result};
use crate::network::message::{Header, Message, ReceivedMessage, HEADER_LEN};

/// Inbound queues are produced by whatever task drives the sockets and
/// consumed by the application thread.
pub type InboundQueue = Arc<Mutex<VecDeque<ReceivedMessage>>>;

pub fn new_inbound_queue() -> InboundQueue {
    Arc::new(Mutex::new(VecDeque::new()))
}

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

pub struct Connection {
    id: u32,
    remote_address: String,
    stream: TcpStream,
    outbound: VecDeque<Message>,
    inbound: InboundQueue,
}

impl Connection {
    /// Wraps an established stream. Every connection gets the next id
    /// from a process-wide monotonically increasing counter.
    pub fn new(stream: TcpStream, inbound: InboundQueue) -> Self {
        let remote_address = stream
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();

        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            remote_address,
            stream,
            outbound: VecDeque::new(),
            inbound,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Remote IPv4 as text, recorded with every received message.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    pub fn push_outbound(&mut self, msg: Message) {
        self.outbound.push_back(msg);
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// One flush cycle: transmit the next queued frame (if any), then
    /// receive one frame if bytes are already available. The transmit
    /// error takes precedence over the receive error.
    pub async fn flush(&mut self) -> Result<()> {
        let transmitted = self.transmit_one().await;
        let received = self.receive_available().await;
        transmitted.and(received)
    }

    /// Drains the entire outbound queue without touching the receive
    /// side; used when a request must leave before the next full cycle.
    pub async fn transmit_outbound(&mut self) -> Result<()> {
        while self.transmit_one().await?.is_some() {}
        Ok(())
    }

    async fn transmit_one(&mut self) -> Result<Option<()>> {
        let Some(msg) = self.outbound.pop_front() else {
            return Ok(None);
        };

        self.stream
            .write_all(&msg.to_frame())
            .await
            .map_err(ErrorCode::from_io)?;
        Ok(Some(()))
    }

    async fn receive_available(&mut self) -> Result<()> {
        let mut header_buf = [0u8; HEADER_LEN];

        // Availability probe; a frame is only read once its first bytes
        // have actually arrived, so an idle cycle never blocks.
        let probed = match self.stream.try_read(&mut header_buf) {
            Ok(0) => return Err(ErrorCode::Eof),
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
            Err(err) => return Err(ErrorCode::from_io(err)),
        };

        if probed < HEADER_LEN {
            self.stream
                .read_exact(&mut header_buf[probed..])
                .await
                .map_err(ErrorCode::from_io)?;
        }

        let header = Header::from_bytes(&header_buf)?;
        let mut payload = vec![0u8; header.size_bytes as usize];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(ErrorCode::from_io)?;

        let received = ReceivedMessage {
            connection_id: self.id,
            sender_address: self.remote_address.clone(),
            message: Message { header, payload },
        };

        self.inbound.lock().expect("inbound queue lock").push_back(received);
        Ok(())
    }
}
