use std::fmt;

use crate::{circular_id::{CircularId, IdSpace}, data_store::NOT_FOUND, error::{ChordError, Result}};

/// A single request line of the node protocol. Fields are separated by `|`
/// and a key/value pair by `:`, so neither may appear inside keys or values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request{
	// Routed key operations
	Insert{key: String, value: String},
	Delete{key: String},
	Search{key: String},

	// Key operations on the receiving node's own store
	InsertServer{key: String, value: String},
	DeleteServer{key: String},
	SearchServer{key: String},

	// Join
	JoinRequest{id: CircularId},
	SendKeys{id: CircularId},

	// Routing
	FindPredecessor{id: CircularId, hops: Option<usize>},
	FindSuccessor{id: CircularId},
	GetSuccessor,
	GetPredecessor,
	GetId,
	Notify{id: CircularId, address: String, port: u16},

	// Inspection
	GetFingerTable,
	GetDataStore,
	GetInfo,

	Unknown(String),
}

impl Request{
	pub fn parse(line: &str, space: &IdSpace) -> Result<Request>{
		let line = line.trim();
		let mut parts = line.split('|');
		let operation = parts.next().unwrap_or_default();
		let args: Vec<&str> = parts.collect();

		let request = match operation {
			"Insert" => {
				let (key, value) = key_value(line, &args)?;
				Request::Insert{key, value}
			},
			"Delete" => Request::Delete{key: key(line, &args)?},
			"Search" => Request::Search{key: key(line, &args)?},
			"Insert_Server" => {
				let (key, value) = key_value(line, &args)?;
				Request::InsertServer{key, value}
			},
			"Delete_Server" => Request::DeleteServer{key: key(line, &args)?},
			"Search_Server" => Request::SearchServer{key: key(line, &args)?},
			"Join_Request" => Request::JoinRequest{id: id(line, &args, space)?},
			"Send_Keys" => Request::SendKeys{id: id(line, &args, space)?},
			"Find_Predecessor" => {
				let hops = match args.get(1) {
					Some(hops) => Some(hops.trim().parse().map_err(|_| malformed(line))?),
					None => None,
				};
				Request::FindPredecessor{id: id(line, &args, space)?, hops}
			},
			"Find_Successor" => Request::FindSuccessor{id: id(line, &args, space)?},
			"Get_Successor" => Request::GetSuccessor,
			"Get_Predecessor" => Request::GetPredecessor,
			"Get_Id" => Request::GetId,
			"Get_Finger_Table" => Request::GetFingerTable,
			"Get_Data_Store" => Request::GetDataStore,
			"Get_Info" => Request::GetInfo,
			"Notify" => {
				if args.len() < 3 {
					return Err(malformed(line));
				}
				Request::Notify{
					id: id(line, &args, space)?,
					address: args[1].to_string(),
					port: args[2].trim().parse().map_err(|_| malformed(line))?,
				}
			},
			other => Request::Unknown(other.to_string()),
		};
		Ok(request)
	}
}

fn malformed(line: &str) -> ChordError{
	ChordError::MalformedRequest(line.to_string())
}

fn key(line: &str, args: &[&str]) -> Result<String>{
	match args.first() {
		Some(key) if !key.is_empty() && !key.contains(':') => Ok(key.to_string()),
		_ => Err(malformed(line)),
	}
}

fn key_value(line: &str, args: &[&str]) -> Result<(String, String)>{
	let pair = args.first().ok_or_else(|| malformed(line))?;
	let mut fields = pair.split(':');
	match (fields.next(), fields.next(), fields.next()) {
		// an empty value reads back as an unreachable node, NOT FOUND as a missing key
		(Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() && value != NOT_FOUND => {
			Ok((key.to_string(), value.to_string()))
		},
		_ => Err(malformed(line)),
	}
}

fn id(line: &str, args: &[&str], space: &IdSpace) -> Result<CircularId>{
	args.first()
		.and_then(|id| space.parse(id))
		.ok_or_else(|| malformed(line))
}

impl fmt::Display for Request{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Request::Insert { key, value } => write!(f, "Insert|{key}:{value}"),
			Request::Delete { key } => write!(f, "Delete|{key}"),
			Request::Search { key } => write!(f, "Search|{key}"),
			Request::InsertServer { key, value } => write!(f, "Insert_Server|{key}:{value}"),
			Request::DeleteServer { key } => write!(f, "Delete_Server|{key}"),
			Request::SearchServer { key } => write!(f, "Search_Server|{key}"),
			Request::JoinRequest { id } => write!(f, "Join_Request|{id}"),
			Request::SendKeys { id } => write!(f, "Send_Keys|{id}"),
			Request::FindPredecessor { id, hops: Some(hops) } => write!(f, "Find_Predecessor|{id}|{hops}"),
			Request::FindPredecessor { id, hops: None } => write!(f, "Find_Predecessor|{id}"),
			Request::FindSuccessor { id } => write!(f, "Find_Successor|{id}"),
			Request::GetSuccessor => write!(f, "Get_Successor"),
			Request::GetPredecessor => write!(f, "Get_Predecessor"),
			Request::GetId => write!(f, "Get_Id"),
			Request::Notify { id, address, port } => write!(f, "Notify|{id}|{address}|{port}"),
			Request::GetFingerTable => write!(f, "Get_Finger_Table"),
			Request::GetDataStore => write!(f, "Get_Data_Store"),
			Request::GetInfo => write!(f, "Get_Info"),
			Request::Unknown(operation) => write!(f, "{operation}"),
		}
	}
}
