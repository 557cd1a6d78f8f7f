// # Scale Simulator
//
// Test-harness sender that stands in for the physical scale. It binds
// the fixed source port the listener allow-lists and emits one reading
// every interval, forever.
//
// ## Usage
//
// ```bash
// # Defaults: send RTW:0.550 kg to 127.0.0.1:3666 from port 5001 every 500 ms
// cargo run --bin scale-sim
//
// # Custom weight and target
// SCALE_SIM_WEIGHT=1.282 \
// SCALE_SIM_TARGET=192.168.0.42:3666 \
// cargo run --bin scale-sim
// ```
//
// ## Environment Variables
//
// - `SCALE_SIM_TARGET`: listener endpoint (default 127.0.0.1:3666)
// - `SCALE_SIM_SOURCE_PORT`: source port to bind (default 5001)
// - `SCALE_SIM_WEIGHT`: weight to report (default 0.550)
// - `SCALE_SIM_INTERVAL_MS`: send interval (default 500)

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

#[tokio::main]
async fn main() -> Result<()> {
    let target: SocketAddr = env::var("SCALE_SIM_TARGET")
        .unwrap_or_else(|_| "127.0.0.1:3666".to_string())
        .parse()
        .context("SCALE_SIM_TARGET is not a valid socket address")?;

    let source_port: u16 = env::var("SCALE_SIM_SOURCE_PORT")
        .unwrap_or_else(|_| "5001".to_string())
        .parse()
        .context("SCALE_SIM_SOURCE_PORT is not a valid port")?;

    let weight: f64 = env::var("SCALE_SIM_WEIGHT")
        .unwrap_or_else(|_| "0.550".to_string())
        .parse()
        .context("SCALE_SIM_WEIGHT is not a number")?;

    let interval_ms: u64 = env::var("SCALE_SIM_INTERVAL_MS")
        .unwrap_or_else(|_| "500".to_string())
        .parse()
        .context("SCALE_SIM_INTERVAL_MS is not a number")?;

    let socket = UdpSocket::bind(("0.0.0.0", source_port))
        .await
        .with_context(|| format!("failed to bind source port {}", source_port))?;

    println!(
        "Scale simulator - sending from port {} to {}",
        source_port, target
    );
    println!("Weight: {} kg", weight);
    println!("Interval: {} ms", interval_ms);
    println!("Press Ctrl+C to stop.\n");

    loop {
        let message = format!("RTW:{:.3} kg", weight);
        socket.send_to(message.as_bytes(), target).await?;
        println!("Sent: {}", message);

        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}
