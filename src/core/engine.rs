// src/core/engine.rs
use crate::config::TradingConfig;
use crate::connectors::traits::ExchangeClient;
use crate::core::bracket::BracketBuilder;
use crate::core::indicator::MovingAverageSet;
use crate::core::reconciler::{reconcile, Reconciliation};
use crate::error::{BotError, BotResult};
use crate::strategies::ema_trend::EmaTrendStrategy;
use crate::strategies::traits::Strategy;
use crate::types::{OrderAck, OrderLeg, OrderRequest, Side, Signal};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// How a run ended. Every variant is terminal.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Open position already has resting orders.
    AlreadyProtected { open_orders: usize },
    /// Open position had no orders; stop-loss and take-profit were attached.
    BracketPlaced {
        stop_loss: OrderAck,
        take_profit: OrderAck,
    },
    /// Flat account, trend signal fired, entry order sent.
    EntryPlaced {
        request: OrderRequest,
        ack: OrderAck,
    },
    /// Flat account, no trend. Nothing sent.
    NoSignal,
}

/// Single-shot decision engine. Holds no state between runs; every run starts
/// from a fresh exchange snapshot.
pub struct TradingEngine<C, S = EmaTrendStrategy> {
    config: TradingConfig,
    client: C,
    strategy: S,
    brackets: BracketBuilder,
    live_mode: bool,
}

impl<C> TradingEngine<C, EmaTrendStrategy>
where
    C: ExchangeClient,
{
    pub fn new(config: TradingConfig, client: C, live_mode: bool) -> BotResult<Self> {
        let strategy = EmaTrendStrategy::from_config(&config)?;
        Self::with_strategy(config, client, strategy, live_mode)
    }
}

impl<C, S> TradingEngine<C, S>
where
    C: ExchangeClient,
    S: Strategy,
{
    pub fn with_strategy(
        config: TradingConfig,
        client: C,
        strategy: S,
        live_mode: bool,
    ) -> BotResult<Self> {
        let brackets = BracketBuilder::new(config.stop_loss, config.take_profit)?;
        Ok(Self {
            config,
            client,
            strategy,
            brackets,
            live_mode,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn run_once(&self) -> BotResult<RunOutcome> {
        let symbol = self.config.symbol.as_str();
        info!(
            "Run starting: {} on {} with {} (live: {})",
            symbol,
            self.config.interval,
            self.strategy.name(),
            self.live_mode
        );

        // 1. Account snapshot
        let account = self
            .client
            .fetch_account_state(symbol)
            .await
            .map_err(|e| BotError::data("account snapshot", e))?;

        // Resting orders only matter when there is something to protect.
        let open_orders = match account.open_position(symbol) {
            Some(_) => self
                .client
                .fetch_open_orders(symbol)
                .await
                .map_err(|e| BotError::data("open orders", e))?,
            None => Vec::new(),
        };

        // 2. Reconcile: protect an open position before anything else
        match reconcile(&account, symbol, &open_orders) {
            Reconciliation::Protected { position, coverage } => {
                info!(
                    "Position {} {} @ {} already has {} open order(s). Nothing to do.",
                    position.quantity, symbol, position.entry_price, coverage.order_count
                );
                for order in &open_orders {
                    info!(
                        "  open order {} {} {}",
                        order.client_order_id, order.order_type, order.side
                    );
                }
                if !coverage.is_complete() {
                    warn!(
                        "Open orders for {} do not form a full bracket (stop-loss: {}, take-profit: {})",
                        symbol, coverage.stop_loss, coverage.take_profit
                    );
                }
                return Ok(RunOutcome::AlreadyProtected {
                    open_orders: coverage.order_count,
                });
            }
            Reconciliation::Unprotected {
                position,
                closing_side,
            } => {
                warn!(
                    "Position {} {} @ {} has no stop-loss/take-profit. Attaching bracket.",
                    position.quantity, symbol, position.entry_price
                );
                return self
                    .attach_bracket(symbol, position.entry_price, closing_side)
                    .await;
            }
            Reconciliation::Flat => {
                info!("No open position for {}. Looking for an entry.", symbol);
            }
        }

        // 3. Flat -> clear leftovers, then look for a trend entry
        if self.config.cancel_orders_when_flat {
            self.cancel_stale_orders(symbol).await?;
        }

        let closes = self
            .client
            .fetch_close_series(symbol, &self.config.interval, self.config.kline_limit)
            .await
            .map_err(|e| BotError::data("close prices", e))?;

        // Последняя свеча ещё формируется, её close = текущая цена
        let current_price = *closes.last().ok_or(BotError::InsufficientData {
            period: 1,
            available: 0,
        })?;
        let averages = MovingAverageSet::compute(&closes, &self.strategy.required_periods())?;
        info!("Current price {}: {}", current_price, averages);

        let (side, entry_price) = match self.strategy.evaluate(current_price, &averages)? {
            Signal::Advice(side, price) => (side, price),
            Signal::Hold => {
                info!("Trend conditions not met for {}. No order placed.", symbol);
                return Ok(RunOutcome::NoSignal);
            }
        };
        info!("{} signal for {} at {}", side_label(side), symbol, entry_price);

        // 4. Sizing
        let leverage = account.leverage(symbol).ok_or_else(|| {
            BotError::data(
                "leverage",
                anyhow::anyhow!("account snapshot has no record for {}", symbol),
            )
        })?;
        let quantity =
            self.strategy
                .size_order(account.margin_balance, leverage, current_price)?;

        let request = OrderRequest::limit(symbol, side, entry_price, quantity);
        let ack = self.submit(&request).await.map_err(|source| BotError::OrderRejected {
            leg: OrderLeg::Entry,
            source,
        })?;
        info!("Entry order accepted: {:?}", ack);

        Ok(RunOutcome::EntryPlaced { request, ack })
    }

    async fn attach_bracket(
        &self,
        symbol: &str,
        entry_price: Decimal,
        closing_side: Side,
    ) -> BotResult<RunOutcome> {
        let bracket = self.brackets.build(symbol, entry_price, closing_side);
        info!(
            "Bracket for {}: {} stop-loss at {}, take-profit at {}",
            symbol,
            closing_side,
            bracket.stop_loss.stop_price.unwrap_or_default(),
            bracket.take_profit.stop_price.unwrap_or_default()
        );

        let stop_loss = self
            .submit(&bracket.stop_loss)
            .await
            .map_err(|source| BotError::OrderRejected {
                leg: OrderLeg::StopLoss,
                source,
            })?;

        // Стоп уже стоит, TP не откатываем
        let take_profit = match self.submit(&bracket.take_profit).await {
            Ok(ack) => ack,
            Err(source) => {
                error!(
                    "Take-profit failed after stop-loss {} was placed for {}",
                    stop_loss.client_order_id, symbol
                );
                return Err(BotError::PartialBracket {
                    placed: OrderLeg::StopLoss,
                    failed: OrderLeg::TakeProfit,
                    source,
                });
            }
        };

        Ok(RunOutcome::BracketPlaced {
            stop_loss,
            take_profit,
        })
    }

    async fn cancel_stale_orders(&self, symbol: &str) -> BotResult<()> {
        if !self.live_mode {
            info!("Paper: would cancel open orders for {}", symbol);
            return Ok(());
        }
        self.client
            .cancel_all_orders(symbol)
            .await
            .map_err(|e| BotError::data("order cancellation", e))
    }

    async fn submit(&self, request: &OrderRequest) -> anyhow::Result<OrderAck> {
        if !self.live_mode {
            // Paper mode: log only
            info!(
                "Paper {} order: {} {} {} price={:?} stop={:?} qty={:?}",
                request.leg,
                request.order_type,
                request.side,
                request.symbol,
                request.price,
                request.stop_price,
                request.quantity
            );
            return Ok(OrderAck::paper(request));
        }
        self.client.submit_order(request).await
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Buy => "Long",
        Side::Sell => "Short",
    }
}
