// src/main.rs
use dotenvy::dotenv;
use the_trend_rider::config::AppConfig;
use the_trend_rider::connectors::binance::BinanceFuturesClient;
use the_trend_rider::core::engine::{RunOutcome, TradingEngine};
use the_trend_rider::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration. Nothing touches the exchange until this passes.
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let log_guard = logging::init(config.log_dir.as_deref());

    let trading = &config.trading;
    info!("========================================");
    info!("       THE TREND RIDER - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!(
        "Conf: symbol {}, interval {}, mode {}, sl {}, tp {}, size {}",
        trading.symbol,
        trading.interval,
        trading.mode,
        trading.stop_loss,
        trading.take_profit,
        trading.size_fraction
    );
    info!(
        "Mode: {}",
        if config.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );

    // 2. Initialize Components
    let client = BinanceFuturesClient::from_config(&config)?;
    let engine = TradingEngine::new(config.trading.clone(), client, config.live_trading)?;

    // 3. One decision, then exit
    match engine.run_once().await {
        Ok(outcome) => {
            match outcome {
                RunOutcome::AlreadyProtected { open_orders } => {
                    info!("Done: position already protected by {} order(s)", open_orders)
                }
                RunOutcome::BracketPlaced {
                    stop_loss,
                    take_profit,
                } => info!(
                    "Done: bracket placed (sl {}, tp {})",
                    stop_loss.client_order_id, take_profit.client_order_id
                ),
                RunOutcome::EntryPlaced { request, ack } => info!(
                    "Done: {} entry {} @ {:?} accepted as {}",
                    request.side, request.symbol, request.price, ack.client_order_id
                ),
                RunOutcome::NoSignal => info!("Done: no signal"),
            }
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            drop(log_guard);
            std::process::exit(1);
        }
    }
}
