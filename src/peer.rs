use std::fmt;

use crate::{circular_id::{CircularId, IdSpace}, error::{ChordError, Result}};

pub const INVALID_IP: &str = "Invalid IP";
pub const INVALID_PORT: &str = "Invalid Port";

/// Address of another node on the ring. A PeerRef never holds a
/// connection; every use of it dials the node again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerRef{
	address: String,
	port: u16,
	id: CircularId,
}

impl PeerRef{
	/// Build a reference, deriving the id from `address|port`.
	pub fn new(address: impl Into<String>, port: u16, space: &IdSpace) -> Self{
		let address = address.into();
		let id = space.hash(&format!("{address}|{port}"));
		PeerRef{
			address,
			port,
			id,
		}
	}

	/// Parse the wire form `ip|port`.
	pub fn from_wire(data: &str, space: &IdSpace) -> Result<Self>{
		let (ip, port) = ip_port(data);
		if ip == INVALID_IP && port == INVALID_PORT {
			return Err(ChordError::MalformedPeer(data.to_string()));
		}
		let port = port.parse::<u16>().map_err(|_| ChordError::MalformedPeer(data.to_string()))?;
		Ok(PeerRef::new(ip, port, space))
	}

	/// Parse a reply that should hold a peer. `None` and an empty reply are
	/// reported as unresolved and unavailable respectively.
	pub fn from_reply(reply: &str, asked: &PeerRef, space: &IdSpace) -> Result<Self>{
		match reply.trim() {
			"" => Err(ChordError::Unavailable(asked.to_string())),
			"None" => Err(ChordError::Unresolved(format!("asked {asked}"))),
			reply => PeerRef::from_wire(reply, space),
		}
	}

	/// Like [`PeerRef::from_reply`], but `None` is a valid answer.
	pub fn from_optional_reply(reply: &str, asked: &PeerRef, space: &IdSpace) -> Result<Option<Self>>{
		match reply.trim() {
			"" => Err(ChordError::Unavailable(asked.to_string())),
			"None" => Ok(None),
			reply => PeerRef::from_wire(reply, space).map(Some),
		}
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn id(&self) -> &CircularId {
		&self.id
	}
}

impl fmt::Display for PeerRef{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}|{}", self.address, self.port)
	}
}

/// Split a wire peer reference into ip and port. Anything with fewer than
/// two fields comes back as the invalid pair.
pub fn ip_port(data: &str) -> (String, String){
	let mut parts = data.trim().split('|');
	match (parts.next(), parts.next()) {
		(Some(ip), Some(port)) => (ip.to_string(), port.to_string()),
		_ => (INVALID_IP.to_string(), INVALID_PORT.to_string()),
	}
}


#[cfg(test)]
mod tests{
	use super::*;

	#[test]
	fn garbage_yields_invalid_pair(){
		assert_eq!(ip_port("garbage"), (INVALID_IP.to_string(), INVALID_PORT.to_string()));
		assert_eq!(ip_port(""), (INVALID_IP.to_string(), INVALID_PORT.to_string()));
		assert_eq!(ip_port("10.0.0.1|5000\n"), ("10.0.0.1".to_string(), "5000".to_string()));
	}

	#[test]
	fn malformed_references_are_routing_errors(){
		let space = IdSpace::default();
		assert!(matches!(PeerRef::from_wire("garbage", &space), Err(ChordError::MalformedPeer(_))));
		assert!(matches!(PeerRef::from_wire("10.0.0.1|port", &space), Err(ChordError::MalformedPeer(_))));

		let asked = PeerRef::new("10.0.0.1", 5000, &space);
		assert!(matches!(PeerRef::from_reply("", &asked, &space), Err(ChordError::Unavailable(_))));
		assert!(matches!(PeerRef::from_reply("None", &asked, &space), Err(ChordError::Unresolved(_))));
	}

	#[test]
	fn wire_form_round_trips_identity(){
		let space = IdSpace::default();
		let peer = PeerRef::new("10.0.0.1", 5000, &space);
		assert_eq!(peer.to_string(), "10.0.0.1|5000");
		assert_eq!(peer.id(), &space.hash("10.0.0.1|5000"));
		assert_eq!(PeerRef::from_wire(&peer.to_string(), &space).unwrap(), peer);
	}
}
