//! Error types for the chord node

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChordError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid Port information received: {0:?}")]
	MalformedPeer(String),

	#[error("Peer {0} did not answer")]
	Unavailable(String),

	#[error("No node could be resolved for id {0}")]
	Unresolved(String),

	#[error("Malformed request: {0}")]
	MalformedRequest(String),

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("Could not read configuration: {0}")]
	ConfigFormat(#[from] serde_json::Error),

	#[error("Finger index {0} is out of range")]
	FingerIndex(usize),

	#[error("Join through {bootstrap} failed: {source}")]
	Join{
		bootstrap: String,
		#[source]
		source: Box<ChordError>,
	},
}

pub type Result<T> = std::result::Result<T, ChordError>;
