//! Demo 2: Checksum Integrity Monitor
//!
//! Showcases: CRC32 verification of every book message and the
//! resubscribe that heals a diverged book
//!
//! Run: cargo run --bin checksum_monitor -- [market_id] [seconds]

use colored::*;
use obsync_sdk::prelude::*;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    let mut args = std::env::args().skip(1);
    let market_id = args
        .next()
        .unwrap_or_else(|| config.initial_market_id().to_string());
    let run_for = Duration::from_secs(args.next().and_then(|s| s.parse().ok()).unwrap_or(30));

    println!("{}", "═".repeat(65).cyan());
    println!("{}", "  CHECKSUM INTEGRITY MONITOR".cyan().bold());
    println!("{}", "  obsync Demo - CRC32 Book Validation".cyan());
    println!("{}", "═".repeat(65).cyan());
    println!();

    let mut client = OrderBookClientBuilder::from_app_config(&config)
        .with_market(market_id.clone())
        .connect()
        .await?;

    let mut events = client.events().ok_or("Events already taken")?;

    println!("{} Connected to {}", "✓".green(), config.ws_url);
    println!("{} Monitoring market {}...\n", "✓".green(), market_id);

    println!(
        "  {:>12}  {:>21}  {:>12}  {:>8}",
        "EVENT".white().bold(),
        "CHECKSUM".white().bold(),
        "STATUS".white().bold(),
        "TOTAL".white().bold()
    );
    println!("  {}", "─".repeat(59));

    let start = Instant::now();
    let mut last = SyncStats::default();
    let mut shallow = 0u64;

    loop {
        let remaining = run_for.saturating_sub(start.elapsed());
        let view = match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Some(view)) => view,
            Ok(None) | Err(_) => break,
        };

        let stats = view.stats;
        let applied = (stats.snapshots + stats.updates) - (last.snapshots + last.updates);
        if applied == 0 {
            last = stats;
            continue;
        }

        let event = if stats.snapshots > last.snapshots {
            "SNAPSHOT".cyan()
        } else {
            format!("UPDATE #{}", stats.updates).yellow()
        };

        let total = stats.snapshots + stats.updates;
        match view.last_checksum {
            Some(result) if result.is_valid() => {
                // Only print snapshots and every 10th update
                if stats.snapshots > last.snapshots || stats.updates % 10 == 0 {
                    println!(
                        "  {:>12}  {:>21}  {:>12}  {:>8}",
                        event,
                        format!("{:08X}", result.computed),
                        "VALID".green(),
                        total
                    );
                }
            }
            Some(result) => println!(
                "  {:>12}  {:>21}  {:>12}  {:>8}",
                event,
                format!("{:08X}/{:08X}", result.computed, result.expected),
                "RESYNC".red().bold(),
                total
            ),
            None => shallow += 1,
        }

        last = stats;
    }

    client.shutdown();

    let stats = client.stats();
    println!();
    println!("{}", "═".repeat(65).cyan());
    println!("  {}", "INTEGRITY REPORT".white().bold());
    println!("{}", "═".repeat(65).cyan());
    println!();
    println!("  Snapshots:        {}", stats.snapshots);
    println!("  Updates:          {}", stats.updates);
    println!("  Unverified:       {}", shallow);
    println!("  Stale frames:     {}", stats.stale_frames);
    println!("  Early updates:    {}", stats.gap_deltas);
    println!("  Parse errors:     {}", stats.parse_errors);
    let mismatches = if stats.checksum_mismatches == 0 {
        "0".green()
    } else {
        stats.checksum_mismatches.to_string().red()
    };
    println!("  Mismatches:       {}", mismatches);
    println!();
    println!(
        "  {} a mismatch re-sends the subscribe; the next snapshot replaces the book",
        "Note:".dimmed()
    );

    Ok(())
}
