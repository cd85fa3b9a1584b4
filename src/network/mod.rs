pub mod client;
pub mod connection;
pub mod message;
pub mod server;

pub use client::TcpClient;
pub use connection::Connection;
pub use message::{Header, Message, MessageKind, MessageReader, ReceivedMessage};
pub use server::TcpServer;
