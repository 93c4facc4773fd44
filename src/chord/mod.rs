use crate::{
	adaptor::{ChordAdaptor, IncomingRequest},
	associate::AssociateClient,
	circular_id::{CircularId, IdSpace},
	data_store::DataStore,
	error::Result,
	finger_table::FingerTable,
	peer::PeerRef,
};

use std::sync::Arc;

use tokio::sync::{mpsc::channel, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

pub mod config;
pub mod message;

mod private_ops;
mod public_ops;

use config::ChordConfig;
use message::Request;

/// The Chord itself. This struct acts like a builder in that it is created
/// and modified before being consumed by the start method which then
/// returns another type, ChordHandle.
#[derive(Debug)]
pub struct Chord<ADAPTOR: ChordAdaptor>{
	config: ChordConfig,
	adaptor: ADAPTOR,
}

impl<ADAPTOR: ChordAdaptor> Chord<ADAPTOR>{

	pub fn new(config: ChordConfig) -> Self{
		let adaptor = ADAPTOR::new(config.call_timeout());
		Chord{
			config,
			adaptor,
		}
	}

	pub fn config(&self) -> &ChordConfig {
		&self.config
	}

	/// Set the `host:port` of a ring member to join at start.
	pub fn set_join_addr(&mut self, addr: Option<String>){
		self.config.bootstrap = addr;
	}

	/// Set if this chord will create its own ring if the join attempt fails
	pub fn set_join_or_host(&mut self, join_or_host: bool){
		self.config.join_or_host = join_or_host;
	}

	/// Starts the node. This will take ownership of the Chord and return a
	/// ChordHandle.
	///
	/// The listener is bound first, so the identifier is derived from the
	/// port actually in use. With a bootstrap address the node joins that
	/// ring; a failed join stops the node unless join_or_host is set.
	/// Without one the node creates a new ring.
	pub async fn start(self) -> Result<ChordHandle<ADAPTOR>> {
		self.config.validate()?;
		let space = self.config.id_space()?;

		// Start listener task
		let (channel_tx, mut channel_rx) = channel::<IncomingRequest>(50);
		let (port, listener_handle) = self.adaptor.listen_handler(&self.config.address, self.config.port, channel_tx).await?;

		let this = PeerRef::new(self.config.address.clone(), port, &space);
		info!("Starting node {} with id {}", this, this.id());
		let node = Arc::new(LocalNode::new(this, space, self.adaptor, self.config.max_hops));

		// Spawn request dispatch task, one task per request. Requests in
		// flight are aborted together with the dispatcher.
		let dispatcher = node.clone();
		let processor_handle = tokio::spawn(async move{
			let mut requests = JoinSet::new();
			while let Some((line, reply)) = channel_rx.recv().await{
				let node = dispatcher.clone();
				requests.spawn(async move{
					let response = node.process_request(&line).await;
					let _ = reply.send(response);
				});
				while requests.try_join_next().is_some() {}
			}
			info!("request dispatcher terminating");
		});

		match self.config.bootstrap_addr()? {
			Some((host, port)) => {
				if let Err(e) = node.join(&host, port).await {
					if !self.config.join_or_host {
						listener_handle.abort();
						processor_handle.abort();
						return Err(e);
					}
					warn!("Could not join {}:{} ({}), creating a new ring instead", host, port, e);
					node.create().await;
				}
			},
			None => node.create().await,
		}

		// Start maintenance tasks
		let stabilizer_handle = LocalNode::spawn_stabilizer(node.clone(), self.config.stabilize_interval());
		let finger_handle = LocalNode::spawn_finger_fixer(node.clone(), self.config.fix_fingers_interval());

		Ok(ChordHandle{
			node,
			listener_handle,
			processor_handle,
			stabilizer_handle,
			finger_handle,
		})
	}
}


/// Routing state guarded by a single lock. The lock is only held for a
/// read or a read-modify-write step, never across a call to another node.
#[derive(Debug)]
pub(crate) struct RoutingState{
	predecessor: Option<PeerRef>,
	fingers: FingerTable,
}

/// A running member of the ring: its identity, routing state and data.
#[derive(Debug)]
pub struct LocalNode<ADAPTOR: ChordAdaptor>{
	this: PeerRef,
	space: IdSpace,
	routing: Mutex<RoutingState>,
	store: DataStore,
	adaptor: ADAPTOR,
	max_hops: usize,
}

impl<ADAPTOR: ChordAdaptor> LocalNode<ADAPTOR>{

	pub(crate) fn new(this: PeerRef, space: IdSpace, adaptor: ADAPTOR, max_hops: usize) -> Self{
		let fingers = FingerTable::new(this.id(), &space);
		LocalNode{
			this,
			space,
			routing: Mutex::new(RoutingState{
				predecessor: None,
				fingers,
			}),
			store: DataStore::new(),
			adaptor,
			max_hops,
		}
	}

	pub fn peer(&self) -> &PeerRef {
		&self.this
	}

	pub fn id(&self) -> &CircularId {
		self.this.id()
	}

	pub fn space(&self) -> &IdSpace {
		&self.space
	}

	pub fn store(&self) -> &DataStore {
		&self.store
	}

	pub async fn successor(&self) -> Option<PeerRef> {
		self.routing.lock().await.fingers.successor().cloned()
	}

	pub async fn predecessor(&self) -> Option<PeerRef> {
		self.routing.lock().await.predecessor.clone()
	}

	/// A copy of the current finger table.
	pub async fn finger_table(&self) -> FingerTable {
		self.routing.lock().await.fingers.clone()
	}

	/// `ip/port/id/predecessorId/successorId`
	pub async fn info(&self) -> String {
		let routing = self.routing.lock().await;
		let pred = routing.predecessor.as_ref().map_or("None".to_string(), |p| p.id().to_string());
		let succ = routing.fingers.successor().map_or("None".to_string(), |s| s.id().to_string());
		format!("{}/{}/{}/{}/{}", self.this.address(), self.this.port(), self.this.id(), pred, succ)
	}

	fn is_self(&self, peer: &PeerRef) -> bool {
		peer == &self.this
	}

	async fn call(&self, peer: &PeerRef, request: Request) -> String {
		self.adaptor.call(peer, &request.to_string()).await
	}
}



/// A ChordHandle represents a started Chord.
pub struct ChordHandle<ADAPTOR: ChordAdaptor>{
	node: Arc<LocalNode<ADAPTOR>>,

	listener_handle: JoinHandle<()>,
	processor_handle: JoinHandle<()>,
	stabilizer_handle: JoinHandle<()>,
	finger_handle: JoinHandle<()>,
}

impl<ADAPTOR: ChordAdaptor> ChordHandle<ADAPTOR> {
	pub fn node(&self) -> &Arc<LocalNode<ADAPTOR>> {
		&self.node
	}

	pub fn peer(&self) -> &PeerRef {
		self.node.peer()
	}

	/// Get a new AssociateClient talking to this node over the network.
	pub fn get_associate(&self) -> AssociateClient<ADAPTOR> {
		AssociateClient::new(self.node.adaptor.clone(), self.node.peer().clone(), self.node.space().clone())
	}

	/// Force the chord to stop. Open connections and requests still being
	/// processed are aborted with it. Other nodes find out through
	/// stabilization.
	pub async fn stop(self){
		for handle in [self.listener_handle, self.processor_handle, self.stabilizer_handle, self.finger_handle] {
			handle.abort();
			let _ = handle.await;
		}
	}
}
