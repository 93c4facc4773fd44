//! A Chord distributed hash table node.
//!
//! Nodes place themselves on a ring of 2^bits identifiers by hashing
//! `address|port`, keep a finger table of shortcuts around the ring, and
//! route key operations to the responsible node in O(log N) hops. Nodes
//! talk to each other, and to clients, with a one-line text protocol over a
//! fresh TCP connection per request.

pub mod chord;
pub use chord::{Chord, ChordHandle, LocalNode, config::ChordConfig, message::Request};

pub mod adaptor;
pub use adaptor::{ChordAdaptor, tcp_adaptor::TCPAdaptor};

pub mod associate;
pub mod circular_id;
pub mod data_store;
pub mod error;
pub mod finger_table;
pub mod peer;

pub use circular_id::{CircularId, IdSpace};
pub use error::{ChordError, Result};
pub use peer::PeerRef;


pub type TCPChord = Chord<TCPAdaptor>;
pub type TCPChordHandle = ChordHandle<TCPAdaptor>;
