//! danmu-ctl: sends the configured script to the overlay, one paced line at a time.

use anyhow::{Context, Result};

use danmu_core::DanmuConfig;
use danmu_ctl::{HttpEndpoint, Sender};

fn print_usage() {
    println!("Usage: danmu-ctl [--endpoint <url>] [command]");
    println!();
    println!("Commands:");
    println!("  send          Send the configured script (default)");
    println!("  help          Show this message");
    println!();
    println!("Options:");
    println!(
        "  --endpoint <url>   Overlay send endpoint (default: {})",
        danmu_core::config::DEFAULT_ENDPOINT
    );
    println!();
    println!("Config: {}", DanmuConfig::file_path().display());
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = DanmuConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        DanmuConfig::default()
    });

    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --endpoint option
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--endpoint" {
            i += 1;
            config.sender.endpoint = args
                .get(i)
                .context("--endpoint requires a value")?
                .clone();
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["send"] | [] => {}
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            return Ok(());
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }

    let endpoint = HttpEndpoint::new(config.sender.endpoint.clone());
    tracing::info!(
        endpoint = endpoint.url(),
        lines = config.sender.messages.len(),
        "danmu-ctl starting"
    );

    let sender = Sender::from_config(endpoint, &config.sender);
    let sent = sender
        .run(&config.sender.messages)
        .await
        .context("broadcast run aborted")?;

    tracing::info!(sent, "script finished");
    Ok(())
}
