use std::{future::Future, time::Duration};

use tokio::{sync::{mpsc::Sender, oneshot}, task::JoinHandle};

use crate::{error::Result, peer::PeerRef};

pub mod tcp_adaptor;

/// A request line read off an inbound connection, with the slot its single
/// reply line is written back through.
pub type IncomingRequest = (String, oneshot::Sender<String>);

/// The transport a node uses to reach other nodes and to accept requests.
pub trait ChordAdaptor: Clone + Send + Sync + 'static {

	fn new(call_timeout: Option<Duration>) -> Self;

	/// Bind the listen address and spawn the accept loop. Each request read
	/// is passed into `channel`. Returns the port actually bound, which
	/// differs from `port` when `port` is 0.
	fn listen_handler(&self, address: &str, port: u16, channel: Sender<IncomingRequest>) -> impl Future<Output = Result<(u16, JoinHandle<()>)>> + Send;

	/// Send one request line to `peer` and return its reply. Transport
	/// failures come back as an empty string.
	fn call(&self, peer: &PeerRef, request: &str) -> impl Future<Output = String> + Send;
}
