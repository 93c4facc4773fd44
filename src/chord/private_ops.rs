use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::{task::JoinHandle, time::{interval_at, Instant, MissedTickBehavior}};
use tracing::{debug, info, instrument, warn};

use crate::{
	adaptor::ChordAdaptor,
	circular_id::CircularId,
	data_store::{decode_migration, encode_migration},
	error::{ChordError, Result},
	peer::PeerRef,
};

use super::{message::Request, LocalNode};


impl<ADAPTOR: ChordAdaptor> LocalNode<ADAPTOR>{

	/// Become the only member of a new ring.
	pub(crate) async fn create(&self){
		let mut routing = self.routing.lock().await;
		routing.predecessor = Some(self.this.clone());
		routing.fingers.set_successor(Some(self.this.clone()));
		info!("Created a new ring at {} with id {}", self.this, self.this.id());
	}

	/// Join the ring `host:port` belongs to. The predecessor stays unknown
	/// until the new neighbour notifies this node.
	#[instrument(skip(self))]
	pub async fn join(&self, host: &str, port: u16) -> Result<()>{
		let bootstrap = PeerRef::new(host, port, &self.space);
		let reply = self.call(&bootstrap, Request::JoinRequest { id: self.this.id().clone() }).await;
		let successor = PeerRef::from_reply(&reply, &bootstrap, &self.space)
			.map_err(|e| ChordError::Join{bootstrap: bootstrap.to_string(), source: Box::new(e)})?;

		{
			let mut routing = self.routing.lock().await;
			routing.predecessor = None;
			routing.fingers.set_successor(Some(successor.clone()));
		}

		if successor.id() != self.this.id() {
			let data = self.call(&successor, Request::SendKeys { id: self.this.id().clone() }).await;
			let pairs = decode_migration(&data);
			info!("Received {} keys from {}", pairs.len(), successor);
			self.store.merge(pairs);
		}
		info!("Joined the ring through {}; successor is {} ({})", bootstrap, successor, successor.id());
		Ok(())
	}

	/// Hand over, and forget, every key a node at `joining_id` is now
	/// responsible for.
	pub fn send_keys(&self, joining_id: &CircularId) -> String{
		let pairs = self.store.extract_for(joining_id, self.this.id(), &self.space);
		info!("Migrating {} keys to joining node {}", pairs.len(), joining_id);
		encode_migration(&pairs)
	}

	/// One stabilization round: ask the successor for its predecessor, adopt
	/// it if it sits between this node and the successor, then notify the
	/// successor of this node.
	#[instrument(skip(self), fields(node = %self.this.id()))]
	pub async fn stabilize(&self) -> Result<()>{
		let Some(mut successor) = self.successor().await else {
			debug!("No successor yet, skipping stabilization");
			return Ok(());
		};

		let candidate = match self.predecessor_of(&successor).await {
			Ok(candidate) => candidate,
			Err(e) => {
				warn!("Could not read the predecessor of {}: {}", successor, e);
				None
			},
		};

		if let Some(candidate) = candidate {
			let mut routing = self.routing.lock().await;
			if let Some(current) = routing.fingers.successor().cloned() {
				if self.space.in_open_arc(candidate.id(), self.this.id(), current.id()) {
					info!("Adopting {} ({}) as successor", candidate, candidate.id());
					routing.fingers.set_successor(Some(candidate.clone()));
					successor = candidate;
				}else{
					successor = current;
				}
			}
		}

		if !self.is_self(&successor) {
			let notify = Request::Notify {
				id: self.this.id().clone(),
				address: self.this.address().to_string(),
				port: self.this.port(),
			};
			if self.call(&successor, notify).await.is_empty() {
				return Err(ChordError::Unavailable(successor.to_string()));
			}
		}
		Ok(())
	}

	/// `candidate` thinks it might be this node's predecessor.
	pub async fn notify(&self, candidate: PeerRef){
		if self.is_self(&candidate) {
			return;
		}
		let mut routing = self.routing.lock().await;
		let adopt = match &routing.predecessor {
			Some(predecessor) => self.space.in_open_arc(candidate.id(), predecessor.id(), self.this.id()),
			None => true,
		};
		if adopt {
			info!("Node {} adopting {} ({}) as predecessor", self.this.id(), candidate, candidate.id());
			routing.predecessor = Some(candidate.clone());
		}

		// a ring of one learns its first successor this way
		if routing.fingers.successor() == Some(&self.this) {
			info!("Node {} adopting {} ({}) as successor", self.this.id(), candidate, candidate.id());
			routing.fingers.set_successor(Some(candidate));
		}
	}

	/// Forget the predecessor if it no longer answers, so the next notify
	/// can replace it.
	pub async fn check_predecessor(&self){
		let Some(predecessor) = self.predecessor().await else {
			return;
		};
		if self.is_self(&predecessor) {
			return;
		}
		if self.call(&predecessor, Request::GetId).await.is_empty() {
			let mut routing = self.routing.lock().await;
			if routing.predecessor.as_ref() == Some(&predecessor) {
				warn!("Predecessor {} did not answer, clearing it", predecessor);
				routing.predecessor = None;
			}
		}
	}

	/// Refresh one randomly chosen finger. Finger 0 belongs to stabilization.
	pub async fn fix_fingers(&self) -> Result<()>{
		let len = self.space.bits() as usize;
		if len < 2 {
			return Ok(());
		}
		let index = rand::thread_rng().gen_range(1..len);
		self.fix_finger(index).await
	}

	/// Resolve the start of finger `index` and store the answer.
	pub async fn fix_finger(&self, index: usize) -> Result<()>{
		if index == 0 || index >= self.space.bits() as usize {
			return Err(ChordError::FingerIndex(index));
		}
		let start = match self.routing.lock().await.fingers.get(index) {
			Some(finger) => finger.start.clone(),
			None => return Err(ChordError::FingerIndex(index)),
		};
		let node = self.find_successor(&start).await?;
		debug!("Finger {} (start {}) now points at {}", index, start, node.id());
		self.routing.lock().await.fingers.set(index, Some(node));
		Ok(())
	}

	async fn log_state(&self){
		let routing = self.routing.lock().await;
		debug!(
			"Node {} predecessor {:?} successor {:?}\n{}data store: {}",
			self.this.id(),
			routing.predecessor.as_ref().map(|p| p.id().to_string()),
			routing.fingers.successor().map(|s| s.id().to_string()),
			routing.fingers.render(),
			self.store.render(),
		);
	}

	/// Run stabilization every `period` until the task is aborted.
	pub(crate) fn spawn_stabilizer(node: Arc<Self>, period: Duration) -> JoinHandle<()>{
		tokio::spawn(async move{
			let mut interval = interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop{
				interval.tick().await;
				if let Err(e) = node.stabilize().await {
					warn!("Stabilization of {} failed: {}", node.this.id(), e);
				}
				node.check_predecessor().await;
				node.log_state().await;
			}
		})
	}

	/// Refresh a random finger every `period` until the task is aborted.
	pub(crate) fn spawn_finger_fixer(node: Arc<Self>, period: Duration) -> JoinHandle<()>{
		tokio::spawn(async move{
			let mut interval = interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop{
				interval.tick().await;
				if let Err(e) = node.fix_fingers().await {
					debug!("Fixing a finger of {} failed, retrying next round: {}", node.this.id(), e);
				}
			}
		})
	}
}
