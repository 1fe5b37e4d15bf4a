//! # SpaceAPI Live Bridge Test
//!
//! Connects the bridge to a real MQTT broker for a while and prints the
//! resulting SpaceAPI document.

use clap::Parser;
use lib_common::core::{StatusReader, StatusRecord};
use lib_common::ingestors::{BridgeConfig, MessageBridge};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// MQTT broker host
    #[clap(long, env = "MQTT_BROKER", default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[clap(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    /// Seconds to listen before printing the document
    #[clap(short, long, default_value_t = 10)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // // Statement: Route bridge logs to stdout so connection problems are visible
    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;

    let record = Arc::new(StatusRecord::default());
    let reader = StatusReader::new(Arc::clone(&record));
    let config = BridgeConfig {
        host: args.host,
        port: args.port,
        ..BridgeConfig::default()
    };

    println!("[*] Listening on {}:{} for {}s...", config.host, config.port, args.seconds);
    let handle = MessageBridge::new(config, record).start();
    tokio::time::sleep(Duration::from_secs(args.seconds)).await;
    let final_state = handle.state();
    handle.stop().await?;

    println!("\n[RESULT] Bridge state: {:?}, space is {}", final_state, reader.state_token());
    println!("-----------------------------------------------");
    println!("{}", serde_json::to_string_pretty(&reader.document())?);
    println!("-----------------------------------------------");

    Ok(())
}
