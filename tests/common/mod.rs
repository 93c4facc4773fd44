#![allow(dead_code)]

use std::net::TcpListener;

use chord_dht::{ChordConfig, CircularId, IdSpace, PeerRef, TCPChord, TCPChordHandle};

pub const ADDRESS: &str = "127.0.0.1";

/// Config for a test node. The maintenance loops are effectively parked so
/// tests drive stabilization by hand.
pub fn config(bits: u32) -> ChordConfig {
	let mut config = ChordConfig::new(ADDRESS, 0);
	config.bits = bits;
	config.stabilize_interval_ms = 3_600_000;
	config.fix_fingers_interval_ms = 3_600_000;
	config.call_timeout_ms = Some(5_000);
	config
}

/// A free local port whose node id is not in `taken`.
pub fn free_port(space: &IdSpace, taken: &[CircularId]) -> u16 {
	let mut held = Vec::new();
	loop{
		let listener = TcpListener::bind((ADDRESS, 0)).expect("a local port should be free");
		let port = listener.local_addr().expect("bound listener has an address").port();
		let id = PeerRef::new(ADDRESS, port, space).id().clone();
		if !taken.contains(&id) {
			return port;
		}
		held.push(listener);
	}
}

/// Start a node on a port that does not collide with `existing`.
pub async fn start_node(mut config: ChordConfig, existing: &[TCPChordHandle]) -> TCPChordHandle {
	let space = config.id_space().expect("test configs are valid");
	let taken: Vec<CircularId> = existing.iter().map(|handle| handle.node().id().clone()).collect();
	config.port = free_port(&space, &taken);
	TCPChord::new(config).start().await.expect("Chords should be able to start")
}

pub fn bootstrap_of(handle: &TCPChordHandle) -> String {
	format!("{}:{}", handle.peer().address(), handle.peer().port())
}

pub async fn stabilize_rounds(handles: &[TCPChordHandle], rounds: usize){
	for _ in 0..rounds {
		for handle in handles {
			let _ = handle.node().stabilize().await;
		}
	}
}

pub async fn fix_all_fingers(handles: &[TCPChordHandle]){
	for handle in handles {
		let bits = handle.node().space().bits() as usize;
		for index in 1..bits {
			let _ = handle.node().fix_finger(index).await;
		}
	}
}

/// Create a ring at the first node and join the rest through it one at a
/// time, stabilizing between joins.
pub async fn make_ring(qty: usize, bits: u32) -> Vec<TCPChordHandle> {
	let mut handles: Vec<TCPChordHandle> = Vec::new();
	for i in 0..qty {
		let mut config = config(bits);
		if i != 0 {
			config.bootstrap = Some(bootstrap_of(&handles[0]));
		}
		let handle = start_node(config, &handles).await;
		handles.push(handle);
		stabilize_rounds(&handles, 3).await;
	}
	stabilize_rounds(&handles, qty).await;
	handles
}

/// Follow successor links from the first node and check they visit every
/// node once, in increasing id order around the ring, with predecessors
/// pointing back.
pub async fn assert_ring(handles: &[TCPChordHandle]){
	let start = handles[0].peer().clone();
	let mut current = start.clone();
	let mut visited: Vec<PeerRef> = Vec::new();
	for _ in 0..handles.len() {
		let member = handles
			.iter()
			.find(|handle| handle.peer() == &current)
			.expect("successor should be a ring member");
		visited.push(current.clone());
		current = member.node().successor().await.expect("every node has a successor");
	}
	assert_eq!(current, start, "successor links should close the ring");

	let mut ids: Vec<&CircularId> = visited.iter().map(|peer| peer.id()).collect();
	let descents = (0..ids.len()).filter(|&i| ids[i] >= ids[(i + 1) % ids.len()]).count();
	if handles.len() > 1 {
		assert_eq!(descents, 1, "ring should be ordered by id: {:?}", ids);
	}
	ids.sort();
	ids.dedup();
	assert_eq!(ids.len(), handles.len(), "every node should be visited once");

	for (i, peer) in visited.iter().enumerate() {
		let before = &visited[(i + visited.len() - 1) % visited.len()];
		let member = handles.iter().find(|handle| handle.peer() == peer).unwrap();
		assert_eq!(member.node().predecessor().await.as_ref(), Some(before), "predecessor of {}", peer.id());
	}
}

pub async fn stop_all(handles: Vec<TCPChordHandle>){
	for handle in handles {
		handle.stop().await;
	}
}
