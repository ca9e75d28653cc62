//! # SignalEdge Node Service
//!
//! Starts the virtual sensor node: creates the shared context, runs the
//! update engine on its fixed cadence, and serves an interactive console
//! as a pure client of the control and bulk-read interfaces. Shuts down
//! cleanly on quit, end of input, or Ctrl+C.

use clap::Parser;
use signaledge::config::{ConfigLoader, NodeConfig};
use signaledge_node::{
    ControlRequest, ControlResponse, NodeContext, STATE_SIZE, UpdateEngine, init_tracing,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "signaledge_node", about = "Virtual temperature/fan sensor node")]
struct Args {
    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    config.validate()?;

    info!(
        service = %config.shared.service_name,
        segment = %config.segment,
        tick_interval_ms = config.tick_interval_ms,
        "starting node"
    );

    let ctx = Arc::new(NodeContext::create(&config)?);
    let engine = UpdateEngine::new(ctx.clone(), Duration::from_millis(config.tick_interval_ms));
    let engine_task = tokio::spawn(engine.run());

    tokio::select! {
        _ = run_console(ctx.clone()) => {
            info!("console closed");
        }
        _ = signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    engine_task.abort();
    drop(ctx);
    info!("node shutdown complete");
    Ok(())
}

/// Interactive menu over stdin, mirroring the classic controller tool.
async fn run_console(ctx: Arc<NodeContext>) {
    info!("console attached");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!();
        println!("--- SignalEdge Controller ---");
        println!("1. Set Fan Speed");
        println!("2. Set Threshold");
        println!("3. Set Control Baud");
        println!("4. Set Link Mode");
        println!("5. Set Exposed Size");
        println!("6. Get Stats");
        println!("7. Bulk Read");
        println!("8. Exit");
        println!("Enter your choice: ");

        let Some(choice) = next_number(&mut lines).await else {
            break;
        };

        let request = match choice {
            1 => prompt_value(&mut lines, "Enter new fan speed: ")
                .await
                .map(ControlRequest::SetFanSpeed),
            2 => prompt_value(&mut lines, "Enter new threshold: ")
                .await
                .map(ControlRequest::SetThreshold),
            3 => prompt_value(&mut lines, "Enter new baud rate: ")
                .await
                .map(ControlRequest::SetControlBaud),
            4 => prompt_value(&mut lines, "Enter new link mode: ")
                .await
                .map(ControlRequest::SetLinkMode),
            5 => prompt_value(&mut lines, "Enter new exposed size: ")
                .await
                .map(ControlRequest::SetExposedSize),
            6 => Some(ControlRequest::GetStats),
            7 => {
                bulk_read(&ctx, &mut lines).await;
                continue;
            }
            8 => break,
            _ => {
                println!("Invalid choice!");
                continue;
            }
        };

        let Some(request) = request else {
            break;
        };

        match ctx.execute(request) {
            Ok(ControlResponse::Ack) => println!("OK"),
            Ok(ControlResponse::Stats(stats)) => {
                println!(
                    "Stats: temp={}C fan={} threshold={} alert={} exposed={} baud={} link={}",
                    stats.temperature,
                    stats.fan_speed,
                    stats.threshold,
                    stats.alert_active(),
                    stats.exposed_size,
                    stats.control_baud,
                    stats.link_mode
                );
            }
            Err(e) => {
                error!(error = %e, "command failed");
                println!("Error: {e}");
            }
        }
    }

    info!("console detached");
}

async fn bulk_read(ctx: &NodeContext, lines: &mut Lines<BufReader<Stdin>>) {
    let Some(requested) = prompt_value(lines, "Enter read length: ").await else {
        return;
    };
    if requested < 0 {
        println!("Invalid length!");
        return;
    }

    let mut buf = vec![0u8; STATE_SIZE];
    match ctx.bulk_read(&mut buf, requested as usize) {
        Ok(n) => {
            let hex: Vec<String> = buf[..n].iter().map(|b| format!("{b:02x}")).collect();
            println!("{n} bytes: {}", hex.join(" "));
        }
        Err(e) => println!("Error: {e}"),
    }
}

async fn prompt_value(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Option<i32> {
    println!("{prompt}");
    next_number(lines).await
}

/// Next parseable integer from the console; `None` at end of input.
async fn next_number(lines: &mut Lines<BufReader<Stdin>>) -> Option<i32> {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Ok(value) = line.trim().parse::<i32>() {
                    return Some(value);
                }
                println!("Invalid input!");
            }
            Ok(None) | Err(_) => return None,
        }
    }
}
