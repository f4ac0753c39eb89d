//! Demo 1: Live Order Book
//!
//! Showcases: catalog lookup, market selection, spread aggregation,
//! throttled rendering of the synchronized book
//!
//! Run: cargo run --bin orderbook_monitor -- [market_id] [raw|0.01|0.1|1]
//!
//! Endpoints come from ORDERBOOK_WS_URL / ORDERBOOK_API_BASE_URL.

use colored::*;
use obsync_sdk::prelude::*;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEPTH: usize = 10;
const RENDER_EVERY: Duration = Duration::from_millis(250);
const RUN_FOR: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AppConfig::from_env();
    let mut args = std::env::args().skip(1);
    let market_id = args
        .next()
        .unwrap_or_else(|| config.initial_market_id().to_string());
    let spread: SpreadOption = match args.next() {
        Some(key) => key.parse()?,
        None => SpreadOption::Raw,
    };

    println!("{}", "═".repeat(64).cyan());
    println!("{}", "  LIVE ORDER BOOK".cyan().bold());
    println!("{}", format!("  {}", config.ws_url).cyan());
    println!("{}", "═".repeat(64).cyan());
    println!();

    let display = load_display(&config, &market_id).await;

    let client = OrderBookClientBuilder::from_app_config(&config)
        .with_market(market_id.clone())
        .with_depth(DEPTH)
        .with_spread(spread)
        .connect()
        .await?;

    println!(
        "{} Streaming {} (market {}, spread {})\n",
        "✓".green(),
        display.symbol().bold(),
        market_id,
        spread
    );

    let mut ticker = tokio::time::interval(RENDER_EVERY);
    let deadline = tokio::time::sleep(RUN_FOR);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = ticker.tick() => render(&client.view(), &display),
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
        }
    }

    client.shutdown();
    let stats = client.stats();
    println!();
    println!(
        "  {} snapshots, {} updates, {} checksum resyncs",
        stats.snapshots, stats.updates, stats.checksum_mismatches
    );

    Ok(())
}

async fn load_display(config: &AppConfig, market_id: &str) -> MarketDisplay {
    let catalog = match HttpMarketCatalog::with_config(config.catalog_config()) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Catalog unavailable: {}", e);
            return MarketDisplay::default();
        }
    };

    match catalog.fetch_markets().await {
        Ok(markets) => match markets.find(market_id) {
            Some(market) => MarketDisplay::from_market(market),
            None => {
                warn!("Market {} is not in the catalog", market_id);
                MarketDisplay::default()
            }
        },
        Err(e) => {
            warn!("Catalog fetch failed ({}): {}", e.code(), e);
            MarketDisplay::default()
        }
    }
}

fn render(view: &BookView, display: &MarketDisplay) {
    // Clear screen, cursor home
    print!("\x1B[2J\x1B[H");

    let status = if view.subscription.is_connected {
        "CONNECTED".green()
    } else {
        "DISCONNECTED".red()
    };
    println!(
        "  {}  {}  {}  {}",
        display.symbol().bold(),
        status,
        format!("market {}", view.subscription.active_market_id).dimmed(),
        format_timestamp(&view.timestamp).dimmed()
    );
    println!();

    if !view.subscription.is_initialized {
        println!("  {}", "Waiting for snapshot...".yellow());
        return;
    }

    println!(
        "  {:>18}  {:>16}  {:>16}",
        format!("PRICE ({})", display.quote).white().bold(),
        format!("SIZE ({})", display.base).white().bold(),
        "TOTAL".white().bold()
    );

    let asks = to_rows(&view.top.asks);
    for row in asks.iter().rev() {
        println!(
            "  {:>18}  {:>16}  {:>16}",
            display.price(&row.level.price).red(),
            display.quantity(&row.level.quantity),
            display.quantity(&row.cumulative_quantity).dimmed()
        );
    }

    let spread = view
        .top
        .spread()
        .map(|s| display.price(&s))
        .unwrap_or_else(|| "-".to_string());
    println!("  {:>18}  {}", spread.yellow().bold(), "spread".dimmed());

    for row in to_rows(&view.top.bids) {
        println!(
            "  {:>18}  {:>16}  {:>16}",
            display.price(&row.level.price).green(),
            display.quantity(&row.level.quantity),
            display.quantity(&row.cumulative_quantity).dimmed()
        );
    }

    println!();
    let checksum = match view.last_checksum {
        Some(result) if result.is_valid() => format!("{:08X}", result.computed).green(),
        Some(result) => format!("{:08X} != {:08X}", result.computed, result.expected).red(),
        None => "shallow".dimmed(),
    };
    println!(
        "  {} {}   {} {}",
        "checksum".dimmed(),
        checksum,
        "levels".dimmed(),
        view.level_count
    );
}
