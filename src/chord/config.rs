use std::{path::Path, time::Duration};

use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{circular_id::{IdSpace, DEFAULT_BITS}, error::{ChordError, Result}};


/// Everything needed to start a node. Missing fields in a config file take
/// the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordConfig{
	/// Address this node listens on and advertises to the ring.
	pub address: String,
	/// Listen port. 0 picks a free port at start.
	pub port: u16,
	/// `host:port` of an existing member to join. None creates a new ring.
	pub bootstrap: Option<String>,
	/// Create a new ring if joining the bootstrap node fails.
	pub join_or_host: bool,

	/// Width of the identifier space in bits.
	pub bits: u32,
	/// Hop budget for a single predecessor lookup.
	pub max_hops: usize,

	pub stabilize_interval_ms: u64,
	pub fix_fingers_interval_ms: u64,
	/// Upper bound on one request/reply exchange with a peer.
	pub call_timeout_ms: Option<u64>,
}

impl Default for ChordConfig{
	fn default() -> Self {
		ChordConfig{
			address: "127.0.0.1".to_string(),
			port: 0,
			bootstrap: None,
			join_or_host: false,

			bits: DEFAULT_BITS,
			max_hops: 256,

			stabilize_interval_ms: 10_000,
			fix_fingers_interval_ms: 10_000,
			call_timeout_ms: None,
		}
	}
}

impl ChordConfig{
	pub fn new(address: impl Into<String>, port: u16) -> Self{
		ChordConfig{
			address: address.into(),
			port,
			..Default::default()
		}
	}

	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>{
		let state = fs::read_to_string(&path).await?;
		let config = serde_json::from_str(&state)?;
		Ok(config)
	}

	pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>{
		let s = serde_json::to_string_pretty(self)?;
		fs::write(path, s).await?;
		Ok(())
	}

	pub fn id_space(&self) -> Result<IdSpace>{
		IdSpace::new(self.bits)
	}

	/// Split the bootstrap address into host and port.
	pub fn bootstrap_addr(&self) -> Result<Option<(String, u16)>>{
		let Some(bootstrap) = &self.bootstrap else {
			return Ok(None);
		};
		let (host, port) = bootstrap
			.rsplit_once(':')
			.ok_or_else(|| ChordError::Config(format!("bootstrap address {bootstrap:?} is not host:port")))?;
		let port = port
			.parse()
			.map_err(|_| ChordError::Config(format!("bootstrap address {bootstrap:?} has an invalid port")))?;
		Ok(Some((host.to_string(), port)))
	}

	pub fn stabilize_interval(&self) -> Duration {
		Duration::from_millis(self.stabilize_interval_ms.max(1))
	}

	pub fn fix_fingers_interval(&self) -> Duration {
		Duration::from_millis(self.fix_fingers_interval_ms.max(1))
	}

	pub fn call_timeout(&self) -> Option<Duration> {
		self.call_timeout_ms.map(Duration::from_millis)
	}

	pub fn validate(&self) -> Result<()>{
		self.id_space()?;
		if self.max_hops == 0 {
			return Err(ChordError::Config("max_hops must be at least 1".to_string()));
		}
		self.bootstrap_addr()?;
		Ok(())
	}
}
