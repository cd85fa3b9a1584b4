use thiserror::Error;

/// Crate-wide result alias; every fallible operation returns the first
/// error it encounters by value.
pub type Result<T> = std::result::Result<T, ErrorCode>;

#[derive(Error, Debug)]
pub enum ErrorCode {
    // ----- Mempool admission -----
    #[error("Transaction already in mempool")]
    TransactionAlreadyInMempool,

    #[error("Transaction amount invalid")]
    TransactionAmountInvalid,

    #[error("Transaction sender or recipient key not specified")]
    TransactionKeyNotSpecified,

    #[error("Transaction expired")]
    TransactionExpired,

    #[error("Sender balance insufficient for transaction")]
    TransactionSenderBalanceInsufficient,

    // ----- Block / chain validation -----
    #[error("Block previous hash invalid")]
    BlockPreviousHashInvalid,

    #[error("Block timestamp invalid")]
    BlockTimestampInvalid,

    #[error("Block index invalid")]
    BlockIndexInvalid,

    #[error("Genesis block invalid")]
    GenesisBlockInvalid,

    #[error("Block hash invalid")]
    BlockHashInvalid,

    #[error("Block hash does not satisfy difficulty")]
    BlockHashDifficultyInsufficient,

    #[error("Chain holds no blocks beyond genesis")]
    ChainEmpty,

    // ----- Mining -----
    #[error("Nonce range minimum larger than maximum")]
    NonceMinLargerThanNonceMax,

    #[error("No hash solution found in nonce range")]
    NoHashSolutionFoundInNonceRange,

    // ----- Crypto -----
    #[error("Signiture invalid")]
    SignitureInvalid,

    #[error("ECDSA public key invalid")]
    EcdsaPublicKeyInvalid,

    #[error("ECDSA private key required for this operation")]
    EcdsaPrivateKeyRequired,

    #[error("ECDSA public key required for this operation")]
    EcdsaPublicKeyRequired,

    #[error("Message data must not be empty")]
    MessageEmpty,

    // ----- Networking -----
    #[error("Connection no longer open")]
    ConnectionNoLongerOpen,

    #[error("Client already occupied by an open connection")]
    ClientConnectionOccupied,

    #[error("Peer node already in peer list")]
    PeerNodeAlreadyInPeerList,

    #[error("No suitable node in peer list")]
    NoSuitableNodeInNodePeerList,

    #[error("Connection reset by remote host")]
    ConnectionReset,

    #[error("Socket not connected")]
    NotConnected,

    #[error("End of stream reached")]
    Eof,

    #[error("Received transmitted data invalid")]
    ReceivedTransmittedDataInvalid,

    #[error("Received data incomplete")]
    ReceivedDataIncomplete,

    // ----- Request / response -----
    #[error("Peer-side error while answering balance request")]
    BalanceRequestPeerSideError,

    #[error("Transaction not found in chain")]
    TransactionNotFound,

    #[error("Transaction hash malformed")]
    TransactionHashInvalid,

    // ----- Node construction contract -----
    #[error("Full nodes require a chain")]
    NodeChainRequired,

    #[error("Solo miner nodes require a mempool")]
    NodeMempoolRequired,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode {
    /// Terminal connection errors; the owning server/client closes the
    /// socket and drops the connection when one of these surfaces.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionReset | ErrorCode::NotConnected | ErrorCode::Eof
        )
    }

    /// Maps socket-layer errors onto the taxonomy, collapsing the
    /// disconnect family into the terminal codes.
    pub fn from_io(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => ErrorCode::ConnectionReset,
            ErrorKind::NotConnected => ErrorCode::NotConnected,
            ErrorKind::UnexpectedEof => ErrorCode::Eof,
            _ => ErrorCode::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn terminal_classification() {
        assert!(ErrorCode::ConnectionReset.is_terminal());
        assert!(ErrorCode::NotConnected.is_terminal());
        assert!(ErrorCode::Eof.is_terminal());
        assert!(!ErrorCode::ChainEmpty.is_terminal());
        assert!(!ErrorCode::SignitureInvalid.is_terminal());
    }

    #[test]
    fn io_mapping_collapses_disconnects() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            ErrorCode::from_io(reset),
            ErrorCode::ConnectionReset
        ));

        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(ErrorCode::from_io(eof), ErrorCode::Eof));

        let other = io::Error::new(io::ErrorKind::AddrInUse, "busy");
        assert!(matches!(ErrorCode::from_io(other), ErrorCode::Io(_)));
    }
}
