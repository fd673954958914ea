// Network module
//
// This module contains the agreement plumbing between nodes:
// - Sync protocol adapter (packets in, callbacks out)
// - Transport boundary and its in-memory implementation

pub mod sync;
pub mod transport;

// Re-export main components for easier access
pub use sync::{SyncHandler, SyncMessage};
pub use transport::{LocalTransport, Transport};
