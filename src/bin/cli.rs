//! sensorhub CLI Client
//!
//! Command-line interface for reading the hub and emitting test readings.

use std::net::UdpSocket;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sensorhub::network::QueryClient;
use sensorhub::{payload, NodeView, Reading};

/// sensorhub CLI
#[derive(Parser, Debug)]
#[command(name = "sensorhub-cli")]
#[command(about = "CLI for the sensorhub telemetry hub")]
#[command(version)]
struct Args {
    /// Query service address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    /// I/O timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show every node's latest reading
    View {
        /// Also print each node's full history
        #[arg(long)]
        history: bool,
    },

    /// Show one node's latest reading and history
    Node {
        /// Node id (source IP of the sensor)
        node_id: String,
    },

    /// Ping the server
    Ping,

    /// Send a reading as a sensor node would
    Send {
        /// Temperature in °C
        #[arg(allow_hyphen_values = true)]
        temperature: f64,

        /// Relative humidity in %
        humidity: f64,

        /// Ingestion address of the hub
        #[arg(long, default_value = "[::1]:8888")]
        target: String,

        /// Number of datagrams to send
        #[arg(long, default_value = "1")]
        count: u32,

        /// Pause between datagrams in milliseconds
        #[arg(long, default_value = "5000")]
        interval_ms: u64,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.command {
        Commands::Send {
            temperature,
            humidity,
            target,
            count,
            interval_ms,
        } => send(
            &target,
            &Reading {
                temperature,
                humidity,
            },
            count,
            interval_ms,
        ),
        Commands::View { history } => {
            connect(&args.server, args.timeout_ms).and_then(|mut c| show_view(&mut c, history))
        }
        Commands::Node { node_id } => {
            connect(&args.server, args.timeout_ms).and_then(|mut c| show_node(&mut c, &node_id))
        }
        Commands::Ping => connect(&args.server, args.timeout_ms).and_then(|mut c| {
            c.ping()?;
            println!("PONG");
            Ok(())
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn connect(server: &str, timeout_ms: u64) -> sensorhub::Result<QueryClient> {
    QueryClient::connect(server, timeout_ms)
}

fn show_view(client: &mut QueryClient, with_history: bool) -> sensorhub::Result<()> {
    let views = client.view()?;
    if views.is_empty() {
        println!("(no nodes have reported yet)");
    }
    for view in &views {
        print_node(view, with_history);
    }
    Ok(())
}

fn show_node(client: &mut QueryClient, node_id: &str) -> sensorhub::Result<()> {
    match client.node(node_id)? {
        Some(view) => print_node(&view, true),
        None => println!("(node {} has not reported)", node_id),
    }
    Ok(())
}

fn send(target: &str, reading: &Reading, count: u32, interval_ms: u64) -> sensorhub::Result<()> {
    let bind_addr = if target.starts_with('[') { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(bind_addr)?;
    let datagram = payload::encode(reading);

    for i in 0..count {
        socket.send_to(datagram.as_bytes(), target)?;
        println!("Data sent: {}", datagram);
        if i + 1 < count {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }
    Ok(())
}

fn print_node(view: &NodeView, with_history: bool) {
    let row = &view.snapshot;
    println!(
        "{:<40} {:>6.1} °C {:>6.1} %  updated_at={}  from={}  ({} readings)",
        row.node_id,
        row.temperature,
        row.humidity,
        row.updated_at,
        row.source_address,
        view.history.len()
    );
    if with_history {
        for record in &view.history {
            println!(
                "    #{:<8} {:>6.1} °C {:>6.1} %  at={}",
                record.sequence_id, record.temperature, record.humidity, record.recorded_at
            );
        }
    }
}
