use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use super::sync::Packet;

/// Errors that can occur while moving packets between endpoints
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No endpoint registered for destination {0}")]
    UnknownDestination(String),

    #[error("Endpoint {0} is no longer receiving")]
    Disconnected(String),

    #[error("Endpoint {0} is already registered")]
    AlreadyRegistered(String),
}

/// The abstract messaging channel the node hands its packets to
pub trait Transport: Send + Sync {
    /// Delivers a packet to the endpoint named by its destination
    fn deliver(&self, packet: Packet) -> Result<(), TransportError>;
}

/// In-memory transport routing packets between registered endpoints
///
/// Each endpoint registers under an address and receives its packets through
/// a dedicated channel. Delivery is synchronous and in order per sender;
/// there is no protocol logic here.
#[derive(Debug, Default)]
pub struct LocalTransport {
    endpoints: DashMap<String, Sender<Packet>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
        }
    }

    /// Registers an endpoint and returns the receiving end of its mailbox
    pub fn register(&self, addr: &str) -> Result<Receiver<Packet>, TransportError> {
        // The entry holds the shard lock, so racing registrations cannot
        // both claim the address
        match self.endpoints.entry(addr.to_string()) {
            Entry::Occupied(_) => Err(TransportError::AlreadyRegistered(addr.to_string())),
            Entry::Vacant(slot) => {
                let (tx, rx) = unbounded();
                slot.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Removes an endpoint; packets addressed to it stop being deliverable
    pub fn unregister(&self, addr: &str) {
        self.endpoints.remove(addr);
    }
}

impl Transport for LocalTransport {
    fn deliver(&self, packet: Packet) -> Result<(), TransportError> {
        match self.endpoints.get(&packet.destination) {
            Some(sender) => sender
                .send(packet)
                .map_err(|err| TransportError::Disconnected(err.0.destination)),
            None => Err(TransportError::UnknownDestination(packet.destination)),
        }
    }
}
