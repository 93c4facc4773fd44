use dashmap::DashMap;

use crate::circular_id::{CircularId, IdSpace};

/// Value returned by a search for a key this node does not hold.
pub const NOT_FOUND: &str = "NOT FOUND";

/// The key-value pairs a node is responsible for. Request handlers and the
/// maintenance loops share it without taking the routing lock.
#[derive(Debug, Default)]
pub struct DataStore{
	data: DashMap<String, String>,
}

impl DataStore{
	pub fn new() -> Self{
		DataStore{
			data: DashMap::new(),
		}
	}

	pub fn insert(&self, key: &str, value: &str){
		self.data.insert(key.to_string(), value.to_string());
	}

	pub fn delete(&self, key: &str){
		self.data.remove(key);
	}

	pub fn lookup(&self, key: &str) -> Option<String>{
		self.data.get(key).map(|value| value.value().clone())
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.data.contains_key(key)
	}

	/// Remove and return every pair that a node at `joining_id` now owns
	/// instead of `owner_id`: keys whose hash is closer, walking clockwise,
	/// to the joining node than to the owner.
	pub fn extract_for(&self, joining_id: &CircularId, owner_id: &CircularId, space: &IdSpace) -> Vec<(String, String)>{
		let moving: Vec<String> = self.data
			.iter()
			.filter(|entry| {
				let key_id = space.hash(entry.key());
				space.forward_distance(&key_id, joining_id) < space.forward_distance(&key_id, owner_id)
			})
			.map(|entry| entry.key().clone())
			.collect();

		let mut pairs = Vec::with_capacity(moving.len());
		for key in moving {
			if let Some(pair) = self.data.remove(&key) {
				pairs.push(pair);
			}
		}
		pairs.sort();
		pairs
	}

	pub fn merge(&self, pairs: impl IntoIterator<Item = (String, String)>){
		for (key, value) in pairs {
			self.data.insert(key, value);
		}
	}

	/// All pairs, sorted by key.
	pub fn snapshot(&self) -> Vec<(String, String)>{
		let mut pairs: Vec<_> = self.data
			.iter()
			.map(|entry| (entry.key().clone(), entry.value().clone()))
			.collect();
		pairs.sort();
		pairs
	}

	/// Text shown for `Get_Data_Store`.
	pub fn render(&self) -> String{
		let body = self.snapshot()
			.into_iter()
			.map(|(key, value)| format!("{key}={value}"))
			.collect::<Vec<_>>()
			.join(", ");
		format!("{{{body}}}")
	}
}

/// Encode migrated pairs as `key|value:key|value:`.
pub fn encode_migration(pairs: &[(String, String)]) -> String{
	pairs.iter().map(|(key, value)| format!("{key}|{value}:")).collect()
}

/// Decode a `Send_Keys` reply. Fragments without a `|` are skipped.
pub fn decode_migration(data: &str) -> Vec<(String, String)>{
	data.trim()
		.split(':')
		.filter(|fragment| !fragment.is_empty())
		.filter_map(|fragment| {
			let (key, value) = fragment.split_once('|')?;
			Some((key.to_string(), value.to_string()))
		})
		.collect()
}
