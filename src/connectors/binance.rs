// src/connectors/binance.rs
use crate::config::AppConfig;
use crate::connectors::messages::{
    ApiErrorBody, FuturesAccount, FuturesOpenOrder, FuturesOrderAck, KLINE_CLOSE_INDEX,
};
use crate::connectors::traits::{AccountProvider, MarketDataProvider, OrderGateway};
use crate::types::{AccountState, OpenOrder, OrderAck, OrderRequest, Position};
use crate::utils::precision::{normalize_price, normalize_quantity};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Binance USDⓈ-M futures REST client.
pub struct BinanceFuturesClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    recv_window: u64,
    tick_size: Decimal,
    step_size: Decimal,
}

impl BinanceFuturesClient {
    pub fn new(api_key: String, secret_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            secret_key,
            http_client,
            base_rest_url: base_url.trim_end_matches('/').to_string(),
            recv_window: 5000,
            tick_size: Decimal::ZERO,
            step_size: Decimal::ZERO,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.api_key.clone(),
            config.secret_key.clone(),
            &config.base_url,
            Duration::from_millis(config.request_timeout_ms),
        )?
        .with_recv_window(config.recv_window)
        .with_precision(config.symbol_tick_size, config.symbol_step_size))
    }

    pub fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    /// Tick size for prices, step size for quantities. Zero disables rounding.
    pub fn with_precision(mut self, tick_size: Decimal, step_size: Decimal) -> Self {
        self.tick_size = tick_size;
        self.step_size = step_size;
        self
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> Result<String> {
        let mut params = params;
        params.push(("recvWindow", self.recv_window.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query_string = serde_urlencoded::to_string(&params)?;

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .context("Invalid secret key length")?;
        mac.update(query_string.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_signed_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", endpoint))?;

        read_json(endpoint, response).await
    }

    async fn send_public_request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T> {
        let query = serde_urlencoded::to_string(&params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, query);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", endpoint))?;

        read_json(endpoint, response).await
    }

    /// Query parameters for `POST /fapi/v1/order`, rounded to exchange precision.
    pub fn order_params(&self, request: &OrderRequest) -> Result<Vec<(&'static str, String)>> {
        let uid = Uuid::new_v4().simple().to_string();
        let client_order_id = format!("{}-{}", request.leg.tag(), &uid[..24]);

        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_str().to_string()),
            ("positionSide", request.position_side.as_str().to_string()),
            ("type", request.order_type.as_str().to_string()),
            ("timeInForce", request.time_in_force.as_str().to_string()),
            ("newClientOrderId", client_order_id),
        ];

        if let Some(price) = request.price {
            params.push(("price", normalize_price(price, self.tick_size).to_string()));
        }
        if let Some(stop_price) = request.stop_price {
            params.push((
                "stopPrice",
                normalize_price(stop_price, self.tick_size).to_string(),
            ));
        }
        if let Some(quantity) = request.quantity {
            let normalized = normalize_quantity(quantity, self.step_size);
            if normalized <= Decimal::ZERO {
                bail!(
                    "Quantity {} rounds to zero at lot step {}",
                    quantity,
                    self.step_size
                );
            }
            params.push(("quantity", normalized.to_string()));
        }
        if request.close_position {
            params.push(("closePosition", "true".to_string()));
        }

        Ok(params)
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(endpoint: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        // Binance кладёт причину отказа в {code, msg}
        return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => anyhow!(
                "Binance {} returned {} (code {}): {}",
                endpoint,
                status,
                err.code,
                err.msg
            ),
            Err(_) => anyhow!("Binance {} returned {}: {}", endpoint, status, body),
        });
    }

    serde_json::from_str(&body).with_context(|| format!("Malformed response from {}", endpoint))
}

#[async_trait]
impl AccountProvider for BinanceFuturesClient {
    async fn fetch_account_state(&self, symbol: &str) -> Result<AccountState> {
        let resp: FuturesAccount = self
            .send_signed_request(Method::GET, "/fapi/v2/account", vec![])
            .await?;

        let mut positions = HashMap::new();
        for p in resp.positions {
            if p.position_side != "BOTH" {
                if !p.position_amt.is_zero() {
                    warn!(
                        "Ignoring {} {} leg of {}: only one-way mode is supported",
                        p.symbol, p.position_side, p.position_amt
                    );
                }
                continue;
            }
            positions.insert(
                p.symbol.clone(),
                Position {
                    symbol: p.symbol,
                    quantity: p.position_amt,
                    entry_price: p.entry_price,
                    leverage: p.leverage,
                },
            );
        }

        match positions.get(symbol) {
            Some(p) => debug!(
                "Account: margin balance {}, {} amt {} @ {} (x{})",
                resp.total_margin_balance, symbol, p.quantity, p.entry_price, p.leverage
            ),
            None => debug!(
                "Account: margin balance {}, no {} record among {} positions",
                resp.total_margin_balance,
                symbol,
                positions.len()
            ),
        }

        Ok(AccountState {
            margin_balance: resp.total_margin_balance,
            positions,
        })
    }
}

#[async_trait]
impl MarketDataProvider for BinanceFuturesClient {
    async fn fetch_close_series(
        &self,
        symbol: &str,
        interval: &str,
        limit: u16,
    ) -> Result<Vec<Decimal>> {
        let rows: Vec<Vec<serde_json::Value>> = self
            .send_public_request(
                "/fapi/v1/klines",
                vec![
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let close = row
                    .get(KLINE_CLOSE_INDEX)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| anyhow!("Kline {} for {} has no close price", i, symbol))?;
                // Парсинг в Decimal
                Decimal::from_str(close)
                    .with_context(|| format!("Kline {} close {:?} is not a number", i, close))
            })
            .collect()
    }
}

#[async_trait]
impl OrderGateway for BinanceFuturesClient {
    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let resp: Vec<FuturesOpenOrder> = self
            .send_signed_request(
                Method::GET,
                "/fapi/v1/openOrders",
                vec![("symbol", symbol.to_string())],
            )
            .await?;

        Ok(resp
            .into_iter()
            .map(|o| OpenOrder {
                symbol: o.symbol,
                client_order_id: o.client_order_id,
                order_type: o.order_type,
                side: o.side,
            })
            .collect())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        let _: serde_json::Value = self
            .send_signed_request(
                Method::DELETE,
                "/fapi/v1/allOpenOrders",
                vec![("symbol", symbol.to_string())],
            )
            .await?;
        info!("Open orders for {} cancelled", symbol);
        Ok(())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let params = self.order_params(request)?;

        info!(
            "Sending {} order: {} {} {} price={:?} stop={:?} qty={:?}",
            request.leg,
            request.order_type,
            request.side,
            request.symbol,
            request.price,
            request.stop_price,
            request.quantity
        );

        let resp: FuturesOrderAck = self
            .send_signed_request(Method::POST, "/fapi/v1/order", params)
            .await?;

        Ok(OrderAck {
            id: resp.order_id.to_string(),
            client_order_id: resp.client_order_id,
            symbol: resp.symbol,
            status: resp.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderLeg, OrderType, Side};

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn client() -> BinanceFuturesClient {
        BinanceFuturesClient::new(
            "key".to_string(),
            "secret".to_string(),
            "http://localhost/",
            Duration::from_secs(1),
        )
        .unwrap()
        .with_precision(d("0.1"), d("0.001"))
    }

    fn lookup<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_signed_query_appends_signature() {
        let query = client()
            .sign_and_build_query(vec![("symbol", "BTCUSDT".to_string())])
            .unwrap();
        assert!(query.starts_with("symbol=BTCUSDT&recvWindow=5000&timestamp="));
        let signature = query.rsplit("signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_limit_order_params_are_rounded() {
        let request = OrderRequest::limit("BTCUSDT", Side::Buy, d("20000.04"), d("0.25079"));
        let params = client().order_params(&request).unwrap();

        assert_eq!(lookup(&params, "type"), Some("LIMIT"));
        assert_eq!(lookup(&params, "positionSide"), Some("BOTH"));
        assert_eq!(lookup(&params, "timeInForce"), Some("GTC"));
        assert_eq!(lookup(&params, "price"), Some("20000"));
        assert_eq!(lookup(&params, "quantity"), Some("0.25"));
        assert_eq!(lookup(&params, "closePosition"), None);
        assert!(lookup(&params, "newClientOrderId").unwrap().starts_with("entry-"));
        assert!(lookup(&params, "newClientOrderId").unwrap().len() <= 36);
    }

    #[test]
    fn test_close_position_params() {
        let request = OrderRequest::close_position(
            OrderLeg::StopLoss,
            "BTCUSDT",
            Side::Buy,
            OrderType::StopMarket,
            d("20400.00"),
        );
        let params = client().order_params(&request).unwrap();

        assert_eq!(lookup(&params, "type"), Some("STOP_MARKET"));
        assert_eq!(lookup(&params, "stopPrice"), Some("20400"));
        assert_eq!(lookup(&params, "closePosition"), Some("true"));
        assert_eq!(lookup(&params, "quantity"), None);
        assert!(lookup(&params, "newClientOrderId").unwrap().starts_with("sl-"));
    }

    #[test]
    fn test_dust_quantity_rejected() {
        let request = OrderRequest::limit("BTCUSDT", Side::Sell, d("20000"), d("0.0004"));
        assert!(client().order_params(&request).is_err());
    }
}
