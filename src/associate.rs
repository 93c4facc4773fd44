use tracing::debug;

use crate::{
	adaptor::ChordAdaptor,
	chord::message::Request,
	circular_id::{CircularId, IdSpace},
	error::{ChordError, Result},
	peer::PeerRef,
};

/// A connection to a node that may query it and receive responses, but is
/// not part of the chord itself and cannot answer queries or route requests.
#[derive(Debug, Clone)]
pub struct AssociateClient<ADAPTOR: ChordAdaptor>{
	adaptor: ADAPTOR,
	node: PeerRef,
	space: IdSpace,
}

impl<ADAPTOR: ChordAdaptor> AssociateClient<ADAPTOR> {

	pub fn new(adaptor: ADAPTOR, node: PeerRef, space: IdSpace) -> Self{
		AssociateClient {
			adaptor,
			node,
			space,
		}
	}

	/// Build a client for the node listening on `address:port`.
	pub fn connect(address: &str, port: u16, space: IdSpace) -> Self{
		let node = PeerRef::new(address, port, &space);
		Self::new(ADAPTOR::new(None), node, space)
	}

	pub fn node(&self) -> &PeerRef {
		&self.node
	}

	/// Send a request and return the raw reply. An empty reply means the
	/// node could not be reached.
	pub async fn send_op(&self, request: &Request) -> String {
		self.send_line(&request.to_string()).await
	}

	/// Send an arbitrary line, as a front-end would.
	pub async fn send_line(&self, line: &str) -> String {
		debug!("Associate sending {:?} to {}", line, self.node);
		self.adaptor.call(&self.node, line).await
	}

	pub async fn insert(&self, key: &str, value: &str) -> String {
		self.send_op(&Request::Insert { key: key.to_string(), value: value.to_string() }).await
	}

	pub async fn search(&self, key: &str) -> String {
		self.send_op(&Request::Search { key: key.to_string() }).await
	}

	pub async fn delete(&self, key: &str) -> String {
		self.send_op(&Request::Delete { key: key.to_string() }).await
	}

	pub async fn id(&self) -> Result<CircularId> {
		let reply = self.send_op(&Request::GetId).await;
		if reply.is_empty() {
			return Err(ChordError::Unavailable(self.node.to_string()));
		}
		self.space.parse(&reply).ok_or(ChordError::MalformedRequest(reply))
	}

	pub async fn successor(&self) -> Result<Option<PeerRef>> {
		let reply = self.send_op(&Request::GetSuccessor).await;
		PeerRef::from_optional_reply(&reply, &self.node, &self.space)
	}

	pub async fn predecessor(&self) -> Result<Option<PeerRef>> {
		let reply = self.send_op(&Request::GetPredecessor).await;
		PeerRef::from_optional_reply(&reply, &self.node, &self.space)
	}

	/// Ask the node which member is responsible for `id`.
	pub async fn successor_of(&self, id: &CircularId) -> Result<PeerRef> {
		let reply = self.send_op(&Request::FindSuccessor { id: id.clone() }).await;
		PeerRef::from_reply(&reply, &self.node, &self.space)
	}

	pub async fn info(&self) -> String {
		self.send_op(&Request::GetInfo).await
	}

	pub async fn finger_table(&self) -> String {
		self.send_op(&Request::GetFingerTable).await
	}

	pub async fn data_store(&self) -> String {
		self.send_op(&Request::GetDataStore).await
	}
}
