use tracing::{debug, info, instrument, warn};

use crate::{
	adaptor::ChordAdaptor,
	circular_id::CircularId,
	data_store::NOT_FOUND,
	error::{ChordError, Result},
	peer::PeerRef,
};

use super::{message::Request, LocalNode};


impl<ADAPTOR: ChordAdaptor> LocalNode<ADAPTOR>{

	/// Answer one request line. Every request gets a reply line, errors
	/// included.
	pub async fn process_request(&self, line: &str) -> String {
		let request = match Request::parse(line, &self.space) {
			Ok(request) => request,
			Err(e) => {
				warn!("Rejected request {:?}: {}", line, e);
				return format!("Error: {e}");
			},
		};
		debug!("Node {} processing {}", self.this.id(), request);

		match request{
			// Routed key operations
			Request::Insert { key, value } => {
				self.insert_key(&key, &value).await.unwrap_or_else(|e| format!("Error inserting key: {e}"))
			},
			Request::Delete { key } => {
				self.delete_key(&key).await.unwrap_or_else(|e| format!("Error deleting key: {e}"))
			},
			Request::Search { key } => match self.search_key(&key).await {
				Ok(value) => value.unwrap_or_else(|| NOT_FOUND.to_string()),
				Err(e) => format!("Error searching key: {e}"),
			},

			// Local store operations
			Request::InsertServer { key, value } => {
				self.store.insert(&key, &value);
				"Inserted".to_string()
			},
			Request::DeleteServer { key } => {
				self.store.delete(&key);
				"Deleted".to_string()
			},
			Request::SearchServer { key } => {
				self.store.lookup(&key).unwrap_or_else(|| NOT_FOUND.to_string())
			},

			// Join
			Request::JoinRequest { id } => {
				info!("Join request for id {}", id);
				peer_or_none(self.find_successor(&id).await)
			},
			Request::SendKeys { id } => self.send_keys(&id),

			// Routing
			Request::FindPredecessor { id, hops } => {
				peer_or_none(self.find_predecessor_within(&id, hops.unwrap_or(self.max_hops)).await)
			},
			Request::FindSuccessor { id } => peer_or_none(self.find_successor(&id).await),
			Request::GetSuccessor => self.successor().await.map_or("None".to_string(), |s| s.to_string()),
			Request::GetPredecessor => self.predecessor().await.map_or("None".to_string(), |p| p.to_string()),
			Request::GetId => self.this.id().to_string(),
			Request::Notify { id, address, port } => {
				let candidate = PeerRef::new(address, port, &self.space);
				if candidate.id() != &id {
					warn!("Notify from {} announced id {} but hashes to {}", candidate, id, candidate.id());
				}
				self.notify(candidate).await;
				"Done".to_string()
			},

			// Inspection
			Request::GetFingerTable => self.routing.lock().await.fingers.render(),
			Request::GetDataStore => self.store.render(),
			Request::GetInfo => self.info().await,

			Request::Unknown(operation) => {
				debug!("Ignoring unknown operation {:?}", operation);
				"Done".to_string()
			},
		}
	}

	/// The node responsible for `id`: the successor of id's predecessor.
	pub async fn find_successor(&self, id: &CircularId) -> Result<PeerRef> {
		if id == self.this.id() {
			return Ok(self.this.clone());
		}
		let predecessor = self.find_predecessor(id).await?;
		self.successor_of(&predecessor).await
	}

	/// The node whose arc (node, node.successor] holds `id`.
	pub async fn find_predecessor(&self, id: &CircularId) -> Result<PeerRef> {
		self.find_predecessor_within(id, self.max_hops).await
	}

	/// Walk towards `id`, forwarding to at most `hops` further nodes.
	pub(crate) async fn find_predecessor_within(&self, id: &CircularId, hops: usize) -> Result<PeerRef> {
		let next_hop = {
			let routing = self.routing.lock().await;
			let successor = routing.fingers
				.successor()
				.ok_or_else(|| ChordError::Unresolved(format!("{id}, node {} has no successor", self.this.id())))?;
			// also covers the ring of one, where successor is this node
			if self.space.in_half_open_arc(id, self.this.id(), successor.id()) {
				return Ok(self.this.clone());
			}
			routing.fingers.closest_preceding_node(id, &self.space).cloned()
		};

		let next_hop = next_hop.ok_or_else(|| ChordError::Unresolved(id.to_string()))?;
		if self.is_self(&next_hop) {
			return Ok(self.this.clone());
		}
		if hops == 0 {
			warn!("Lookup for {} ran out of hops at node {}", id, self.this.id());
			return Err(ChordError::Unresolved(format!("{id}, hop limit reached")));
		}

		let reply = self.call(&next_hop, Request::FindPredecessor { id: id.clone(), hops: Some(hops - 1) }).await;
		PeerRef::from_reply(&reply, &next_hop, &self.space)
	}

	/// The closest finger preceding `id`, if any finger is resolved.
	pub async fn closest_preceding_node(&self, id: &CircularId) -> Option<PeerRef> {
		let routing = self.routing.lock().await;
		routing.fingers.closest_preceding_node(id, &self.space).cloned()
	}

	pub(crate) async fn successor_of(&self, peer: &PeerRef) -> Result<PeerRef> {
		if self.is_self(peer) {
			return self.successor().await.ok_or_else(|| ChordError::Unresolved(format!("successor of {peer}")));
		}
		let reply = self.call(peer, Request::GetSuccessor).await;
		PeerRef::from_reply(&reply, peer, &self.space)
	}

	pub(crate) async fn predecessor_of(&self, peer: &PeerRef) -> Result<Option<PeerRef>> {
		if self.is_self(peer) {
			return Ok(self.predecessor().await);
		}
		let reply = self.call(peer, Request::GetPredecessor).await;
		PeerRef::from_optional_reply(&reply, peer, &self.space)
	}

	/// Store a pair on the node responsible for `key`.
	#[instrument(skip(self, value))]
	pub async fn insert_key(&self, key: &str, value: &str) -> Result<String> {
		check_field(key)?;
		check_value(value)?;
		let key_id = self.space.hash(key);
		let owner = self.find_successor(&key_id).await?;
		if self.is_self(&owner) {
			self.store.insert(key, value);
		}else{
			let reply = self.call(&owner, Request::InsertServer { key: key.to_string(), value: value.to_string() }).await;
			if reply.is_empty() {
				return Err(ChordError::Unavailable(owner.to_string()));
			}
		}
		info!("Inserted {} at node {}", key, owner.id());
		Ok(format!("Inserted at node id {} key was {} key hash was {}", owner.id(), key, key_id))
	}

	/// Remove `key` from the node responsible for it. Removing a missing key
	/// is not an error.
	#[instrument(skip(self))]
	pub async fn delete_key(&self, key: &str) -> Result<String> {
		check_field(key)?;
		let key_id = self.space.hash(key);
		let owner = self.find_successor(&key_id).await?;
		if self.is_self(&owner) {
			self.store.delete(key);
		}else{
			let reply = self.call(&owner, Request::DeleteServer { key: key.to_string() }).await;
			if reply.is_empty() {
				return Err(ChordError::Unavailable(owner.to_string()));
			}
		}
		info!("Deleted {} at node {}", key, owner.id());
		Ok(format!("Deleted at node id {} key was {} key hash was {}", owner.id(), key, key_id))
	}

	/// Look `key` up on the node responsible for it.
	#[instrument(skip(self))]
	pub async fn search_key(&self, key: &str) -> Result<Option<String>> {
		check_field(key)?;
		let key_id = self.space.hash(key);
		let owner = self.find_successor(&key_id).await?;
		if self.is_self(&owner) {
			return Ok(self.store.lookup(key));
		}
		let reply = self.call(&owner, Request::SearchServer { key: key.to_string() }).await;
		match reply.as_str() {
			"" => Err(ChordError::Unavailable(owner.to_string())),
			NOT_FOUND => Ok(None),
			_ => Ok(Some(reply)),
		}
	}
}

/// Reply text for a lookup: the peer, or `None` when it failed.
fn peer_or_none(result: Result<PeerRef>) -> String {
	match result {
		Ok(peer) => peer.to_string(),
		Err(e) => {
			warn!("Lookup failed: {}", e);
			"None".to_string()
		},
	}
}

/// Keys and values travel inside `|` and `:` separated lines.
fn check_field(field: &str) -> Result<()> {
	if field.contains(|c: char| matches!(c, '|' | ':' | '\n')) {
		return Err(ChordError::MalformedRequest(format!("{field:?} may not contain '|', ':' or a newline")));
	}
	Ok(())
}

/// A value must also read back as itself, not as a missing key or a silent
/// node.
fn check_value(value: &str) -> Result<()> {
	check_field(value)?;
	if value.is_empty() || value == NOT_FOUND {
		return Err(ChordError::MalformedRequest(format!("{value:?} cannot be stored as a value")));
	}
	Ok(())
}
