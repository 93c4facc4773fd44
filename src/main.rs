//! Chord node - runs one member of a Chord ring

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chord_dht::{ChordConfig, TCPChord};

#[derive(Parser)]
#[command(name = "chord-node")]
#[command(about = "Run a Chord DHT node", long_about = None)]
struct Cli {
	/// Path to a JSON config file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Address to listen on and advertise
	#[arg(short, long)]
	address: Option<String>,

	/// Port to listen on
	#[arg(short, long)]
	port: Option<u16>,

	/// host:port of a ring member to join; omit to create a new ring
	#[arg(short, long)]
	join: Option<String>,

	/// Create a new ring if the join fails
	#[arg(long)]
	join_or_host: bool,

	/// Width of the identifier space in bits
	#[arg(short, long)]
	bits: Option<u32>,

	/// Enable verbose output
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Set up logging
	let filter = if cli.verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
	};

	tracing_subscriber::registry()
		.with(fmt::layer())
		.with(filter)
		.init();

	let mut config = match &cli.config {
		Some(path) => ChordConfig::from_file(path).await?,
		None => ChordConfig::default(),
	};
	if let Some(address) = cli.address {
		config.address = address;
	}
	if let Some(port) = cli.port {
		config.port = port;
	}
	if let Some(bits) = cli.bits {
		config.bits = bits;
	}
	if cli.join.is_some() {
		config.bootstrap = cli.join;
	}
	config.join_or_host |= cli.join_or_host;

	match &config.bootstrap {
		Some(addr) => tracing::info!("Joining ring through {}", addr),
		None => tracing::info!("Creating ring"),
	}

	let handle = TCPChord::new(config).start().await?;
	tracing::info!("Node {} running with id {}", handle.peer(), handle.node().id());

	// Keep running
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutting down");
	handle.stop().await;

	Ok(())
}
