use std::{io::{Error, ErrorKind}, time::Duration};

use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream},
	sync::{mpsc::Sender, oneshot},
	task::{JoinHandle, JoinSet},
	time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use super::{ChordAdaptor, IncomingRequest};
use crate::{error::Result, peer::PeerRef};

/// An implementation of ChordAdaptor speaking the line protocol over TCP:
/// one connection per request, one line in, one reply out, then close.
#[derive(Debug, Clone)]
pub struct TCPAdaptor{
	call_timeout: Option<Duration>,
}

impl ChordAdaptor for TCPAdaptor{

	fn new(call_timeout: Option<Duration>) -> Self{
		Self{
			call_timeout,
		}
	}

	async fn listen_handler(&self, address: &str, port: u16, channel: Sender<IncomingRequest>) -> Result<(u16, JoinHandle<()>)> {
		let listener = TcpListener::bind((address, port)).await?;
		let bound_port = listener.local_addr()?.port();
		info!("Listening on {}:{}", address, bound_port);

		// connections are owned by the accept loop and die with it
		let handle = tokio::spawn(async move{
			let mut connections = JoinSet::new();
			loop{
				match listener.accept().await {
					Err(e) => {
						warn!("Encountered an error in accept: {}", e);
						sleep(Duration::from_millis(100)).await;
					},
					Ok((stream, remote)) => {
						let channel = channel.clone();
						connections.spawn(async move{
							if let Err(e) = serve_connection(stream, channel).await {
								debug!("Connection from {} failed: {}", remote, e);
							}
						});
					}
				}
				while connections.try_join_next().is_some() {}
			}
		});
		Ok((bound_port, handle))
	}

	async fn call(&self, peer: &PeerRef, request: &str) -> String {
		let result = match self.call_timeout {
			Some(limit) => match timeout(limit, exchange(peer, request)).await {
				Ok(result) => result,
				Err(_) => Err(Error::new(ErrorKind::TimedOut, format!("no reply within {limit:?}"))),
			},
			None => exchange(peer, request).await,
		};
		match result {
			Ok(reply) => reply,
			Err(e) => {
				warn!("Request {:?} to {} failed: {}", request, peer, e);
				String::new()
			},
		}
	}
}

/// Read one request line, wait for the node's answer and write it back.
async fn serve_connection(stream: TcpStream, channel: Sender<IncomingRequest>) -> std::io::Result<()>{
	let (read_half, mut write_half) = stream.into_split();
	let mut reader = BufReader::new(read_half);
	let mut line = Vec::new();
	if reader.read_until(b'\n', &mut line).await? == 0 {
		return Ok(()); // closed before sending anything
	}

	let reply = match String::from_utf8(line) {
		Ok(line) => {
			let (reply_tx, reply_rx) = oneshot::channel();
			if channel.send((line.trim().to_string(), reply_tx)).await.is_ok() {
				reply_rx.await.unwrap_or_default()
			}else{
				"Error: node is shutting down".to_string()
			}
		},
		Err(e) => {
			debug!("Dropping request that is not UTF-8: {}", e);
			"Error: request is not valid UTF-8".to_string()
		},
	};

	write_half.write_all(reply.as_bytes()).await?;
	write_half.write_all(b"\n").await?;
	write_half.shutdown().await
}

/// Dial the peer, send the request and read until it closes the connection.
async fn exchange(peer: &PeerRef, request: &str) -> std::io::Result<String>{
	let mut stream = TcpStream::connect((peer.address(), peer.port())).await?;
	stream.write_all(request.as_bytes()).await?;
	stream.write_all(b"\n").await?;

	let mut reply = String::new();
	stream.read_to_string(&mut reply).await?;
	Ok(reply.trim_end_matches(|c| c == '\n' || c == '\r').to_string())
}
