
use crate::{circular_id::{CircularId, IdSpace}, peer::PeerRef};

/// One routing entry: the fixed start of its interval and the closest known
/// node at or after that start.
#[derive(Debug, Clone)]
pub struct Finger{
	pub start: CircularId,
	pub node: Option<PeerRef>,
}

/// Per-node routing table. Entry 0 is the node's successor; there is no
/// separate successor field to keep in sync with it.
#[derive(Debug, Clone)]
pub struct FingerTable{
	owner: CircularId,
	fingers: Vec<Finger>,
}

impl FingerTable{
	pub fn new(owner: &CircularId, space: &IdSpace) -> Self{
		let fingers = (0..space.bits())
			.map(|index| Finger{
				start: space.finger_start(owner, index),
				node: None,
			})
			.collect();
		FingerTable{
			owner: owner.clone(),
			fingers,
		}
	}

	pub fn len(&self) -> usize {
		self.fingers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fingers.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&Finger> {
		self.fingers.get(index)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Finger> {
		self.fingers.iter()
	}

	pub fn successor(&self) -> Option<&PeerRef> {
		self.fingers.first().and_then(|finger| finger.node.as_ref())
	}

	pub fn set_successor(&mut self, node: Option<PeerRef>){
		self.set(0, node);
	}

	pub fn set(&mut self, index: usize, node: Option<PeerRef>){
		if let Some(finger) = self.fingers.get_mut(index) {
			finger.node = node;
		}
	}

	/// The resolved finger that gets closest to `search_id` without reaching
	/// it. Only nodes strictly inside (owner, search_id) are considered.
	pub fn closest_preceding_node(&self, search_id: &CircularId, space: &IdSpace) -> Option<&PeerRef>{
		let mut closest: Option<&PeerRef> = None;
		for finger in self.fingers.iter().rev() {
			let Some(node) = &finger.node else { continue };
			if !space.in_open_arc(node.id(), &self.owner, search_id) {
				continue;
			}
			let closer = match closest {
				Some(current) => space.forward_distance(node.id(), search_id) < space.forward_distance(current.id(), search_id),
				None => true,
			};
			if closer {
				closest = Some(node);
			}
		}
		closest
	}

	/// Text shown for `Get_Finger_Table`, one line per entry.
	pub fn render(&self) -> String{
		let mut info = String::new();
		for (index, finger) in self.fingers.iter().enumerate() {
			match &finger.node {
				Some(node) => info += &format!("Entry: {} Interval start: {} Successor: {}\n", index, finger.start, node.id()),
				None => info += &format!("Entry: {} Interval start: {} Successor: None\n", index, finger.start),
			}
		}
		info
	}
}


#[cfg(test)]
mod tests{
	use super::*;

	/// Find a port on 10.0.0.1 whose reference hashes to `target`.
	fn peer_at(space: &IdSpace, target: u64) -> PeerRef{
		let target = space.id_from(target);
		(1..=u16::MAX)
			.map(|port| PeerRef::new("10.0.0.1", port, space))
			.find(|peer| peer.id() == &target)
			.expect("every slot of a 256 ring is reachable")
	}

	#[test]
	fn starts_are_fixed_offsets(){
		let space = IdSpace::default();
		let table = FingerTable::new(&space.id_from(200), &space);
		let starts: Vec<_> = table.iter().map(|finger| finger.start.clone()).collect();
		let expected: Vec<_> = [201, 202, 204, 208, 216, 232, 8, 72].into_iter().map(|v| space.id_from(v)).collect();
		assert_eq!(starts, expected);
		assert!(table.successor().is_none());
	}

	#[test]
	fn closest_preceding_prefers_longest_jump(){
		let space = IdSpace::default();
		let mut table = FingerTable::new(&space.id_from(10), &space);
		assert!(table.closest_preceding_node(&space.id_from(100), &space).is_none());

		let near = peer_at(&space, 20);
		let mid = peer_at(&space, 60);
		let far = peer_at(&space, 150);
		table.set_successor(Some(near.clone()));
		table.set(4, Some(mid.clone()));
		table.set(7, Some(far.clone()));

		assert_eq!(table.closest_preceding_node(&space.id_from(100), &space), Some(&mid));
		assert_eq!(table.closest_preceding_node(&space.id_from(5), &space), Some(&far));
		assert_eq!(table.closest_preceding_node(&space.id_from(40), &space), Some(&near));
		// a finger sitting on the target does not precede it
		assert_eq!(table.closest_preceding_node(&space.id_from(60), &space), Some(&near));
		assert_eq!(table.closest_preceding_node(&space.id_from(15), &space), None);
	}

	#[test]
	fn render_lists_every_entry(){
		let space = IdSpace::default();
		let mut table = FingerTable::new(&space.id_from(0), &space);
		let peer = peer_at(&space, 3);
		table.set_successor(Some(peer));
		let text = table.render();
		assert_eq!(text.lines().count(), 8);
		assert_eq!(text.lines().next(), Some("Entry: 0 Interval start: 1 Successor: 3"));
		assert_eq!(text.lines().nth(7), Some("Entry: 7 Interval start: 128 Successor: None"));
	}
}
