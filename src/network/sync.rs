use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::{Block, Transaction};

/// Protocol tag carried by every sync packet
pub const SYNC_PROTOCOL: &str = "ferrochain-sync";

/// Errors that can occur in the sync adapter
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Payload encoding error: {0}")]
    Encoding(String),

    #[error("Payload decoding error: {0}")]
    Decoding(String),

    #[error("Packet carries foreign protocol tag {0}")]
    WrongProtocol(String),
}

/// A transport packet: addressing plus an opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Address of the receiving endpoint
    pub destination: String,

    /// Address of the sending endpoint
    pub source: String,

    /// Protocol tag the payload belongs to
    pub protocol: String,

    /// Encoded payload; the transport never looks inside
    pub payload: Vec<u8>,
}

/// The payloads the sync layer exchanges between nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    Block(Block),
    Transaction(Transaction),
}

/// Callback invoked with the source address and the decoded message
pub type SyncCallback = Box<dyn Fn(&str, SyncMessage) + Send + Sync>;

/// Thin shim between the sync layer and the packet transport
///
/// Outbound, it wraps a message into an addressed packet under the sync
/// protocol tag; inbound, it decodes the payload of packets carrying that tag
/// and hands the message to the registered callback. It performs no semantic
/// validation of the payload; that stays with the consumer.
pub struct SyncHandler {
    addr: String,
    callback: SyncCallback,
}

impl std::fmt::Debug for SyncHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandler")
            .field("addr", &self.addr)
            .finish()
    }
}

impl SyncHandler {
    /// Creates a handler for one endpoint
    ///
    /// # Arguments
    ///
    /// * `addr` - The endpoint address outbound packets carry as their source
    /// * `callback` - Invoked for every decoded inbound message
    pub fn new(addr: impl Into<String>, callback: SyncCallback) -> Self {
        SyncHandler {
            addr: addr.into(),
            callback,
        }
    }

    /// Gets the endpoint address this handler speaks for
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Wraps a message into a packet addressed to a destination endpoint
    pub fn build_outbound(
        &self,
        destination: &str,
        message: &SyncMessage,
    ) -> Result<Packet, SyncError> {
        let payload =
            bincode::serialize(message).map_err(|e| SyncError::Encoding(e.to_string()))?;

        Ok(Packet {
            destination: destination.to_string(),
            source: self.addr.clone(),
            protocol: SYNC_PROTOCOL.to_string(),
            payload,
        })
    }

    /// Decodes an inbound packet and dispatches it to the callback
    ///
    /// Packets carrying a different protocol tag are rejected before any
    /// decoding happens.
    pub fn on_inbound(&self, packet: &Packet) -> Result<(), SyncError> {
        if packet.protocol != SYNC_PROTOCOL {
            warn!(
                "Dropping packet from {} with unknown protocol {}",
                packet.source, packet.protocol
            );
            return Err(SyncError::WrongProtocol(packet.protocol.clone()));
        }

        let message: SyncMessage =
            bincode::deserialize(&packet.payload).map_err(|e| SyncError::Decoding(e.to_string()))?;

        debug!("Sync message from {} dispatched", packet.source);
        (self.callback)(&packet.source, message);
        Ok(())
    }
}
