//! recordvault CLI Client
//!
//! Command-line interface for talking to a recordvault server.

use clap::{Parser, Subcommand};
use recordvault::network::Client;
use recordvault::ErrorKind;

/// recordvault CLI
#[derive(Parser, Debug)]
#[command(name = "recordvault-cli")]
#[command(about = "CLI for the recordvault record store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7420")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a record by id
    Get {
        /// The record id
        id: i64,
    },

    /// Store a record and print its id
    Set {
        /// The record name
        name: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Commands::Get { id } => client.get(id).map(|r| println!("{}\t{}", r.id, r.name)),
        Commands::Set { name } => client.set(&name).map(|id| println!("{}", id)),
        Commands::Ping => client.ping().map(|_| println!("PONG")),
    };

    if let Err(e) = outcome {
        match e.kind() {
            ErrorKind::NotFound => eprintln!("(not found)"),
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}
