use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use super::MarketGateway;
use crate::models::{AccountBalance, AssetBalance, Candle, OrderRequest, Trade};
use crate::{BotError, Result};

// Binance Spot REST API
// Docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
const BINANCE_LIVE_API: &str = "https://api.binance.com";
const BINANCE_TESTNET_API: &str = "https://testnet.binance.vision";
const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const RECV_WINDOW_MS: u64 = 5000;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 250;
const QUANTITY_DECIMALS: u32 = 8;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key pair for signed endpoints
#[derive(Clone)]
pub struct BinanceCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Binance spot client with rate limiting and retries
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Option<BinanceCredentials>,
    rate_limiter: Arc<BinanceRateLimiter>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    executed_qty: Option<String>,
    #[serde(default)]
    cummulative_quote_qty: Option<String>,
    #[serde(default)]
    fills: Vec<FillResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FillResponse {
    #[allow(dead_code)]
    price: String,
    #[allow(dead_code)]
    qty: String,
    commission: String,
    #[serde(default)]
    commission_asset: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    asset: String,
    free: String,
    locked: String,
}

impl BinanceClient {
    /// Client for the live exchange or the spot testnet
    pub fn new(
        sandbox: bool,
        credentials: Option<BinanceCredentials>,
        requests_per_minute: u32,
    ) -> Result<Self> {
        let base_url = if sandbox {
            BINANCE_TESTNET_API
        } else {
            BINANCE_LIVE_API
        };
        Self::with_base_url(base_url, credentials, requests_per_minute)
    }

    /// Client against an arbitrary base URL (mock servers, regional endpoints)
    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: Option<BinanceCredentials>,
        requests_per_minute: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| BotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let rpm = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| BotError::Config("requests_per_minute must be positive".into()))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `BTC/USDT` -> `BTCUSDT`
    pub fn exchange_symbol(symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    }

    fn credentials(&self) -> Result<&BinanceCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| BotError::Config("API credentials required for signed requests".into()))
    }

    /// Append timestamp, recvWindow and the HMAC-SHA256 signature to `params`
    fn signed_query(&self, params: &[(&str, String)]) -> Result<String> {
        let credentials = self.credentials()?;

        let mut query = encode_query(params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "timestamp={}&recvWindow={}",
            Utc::now().timestamp_millis(),
            RECV_WINDOW_MS
        ));

        let signature = sign(&credentials.api_secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// GET with rate limiting and exponential backoff on 429, 5xx and transport errors
    async fn get_with_retry(&self, path: &str, params: &[(&str, String)], signed: bool) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            // Signature carries a timestamp, so re-sign on every attempt
            let query = if signed {
                self.signed_query(params)?
            } else {
                encode_query(params)
            };
            let url = format!("{}{}?{}", self.base_url, path, query);

            let mut request = self.client.get(&url);
            if signed {
                request = request.header(API_KEY_HEADER, &self.credentials()?.api_key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        return Ok(body);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_error = format!("HTTP {}: {}", status, describe_api_error(&body));
                    } else {
                        return Err(BotError::DataUnavailable(format!(
                            "{} returned HTTP {}: {}",
                            path,
                            status,
                            describe_api_error(&body)
                        )));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_RETRIES {
                let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                tracing::warn!(
                    "Binance {} failed ({}), retrying in {}ms (attempt {}/{})",
                    path,
                    last_error,
                    backoff_ms,
                    attempt,
                    MAX_RETRIES
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(BotError::DataUnavailable(format!(
            "{} failed after {} attempts: {}",
            path, MAX_RETRIES, last_error
        )))
    }
}

#[async_trait]
impl MarketGateway for BinanceClient {
    async fn fetch_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let params = [
            ("symbol", Self::exchange_symbol(symbol)),
            ("interval", timeframe.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get_with_retry("/api/v3/klines", &params, false).await?;

        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(&body)
            .map_err(|e| BotError::DataUnavailable(format!("Failed to decode klines: {}", e)))?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Trade> {
        let client_order_id = Uuid::new_v4();
        let symbol = Self::exchange_symbol(&request.symbol);

        let mut params = vec![
            ("symbol", symbol),
            ("side", request.side.as_str().to_string()),
        ];
        match request.price {
            None => params.push(("type", "MARKET".to_string())),
            Some(price) => {
                params.push(("type", "LIMIT".to_string()));
                params.push(("timeInForce", "GTC".to_string()));
                params.push(("price", format_decimal(price)?));
            }
        }
        params.push(("quantity", format_decimal(request.quantity)?));
        params.push(("newClientOrderId", client_order_id.simple().to_string()));
        params.push(("newOrderRespType", "FULL".to_string()));

        self.rate_limiter.until_ready().await;
        let query = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        // Never retried: a lost response may still have placed the order
        let response = self
            .client
            .request(Method::POST, &url)
            .header(API_KEY_HEADER, &self.credentials()?.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() && status.as_u16() != 429 {
            return Err(BotError::OrderRejected(describe_api_error(&body)));
        }
        if !status.is_success() {
            return Err(BotError::DataUnavailable(format!(
                "Order endpoint returned HTTP {}: {}",
                status,
                describe_api_error(&body)
            )));
        }

        let order: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::DataUnavailable(format!("Failed to decode order response: {}", e)))?;

        let executed_qty = parse_optional(order.executed_qty.as_deref())?.unwrap_or(0.0);
        let quote_qty = parse_optional(order.cummulative_quote_qty.as_deref())?.unwrap_or(0.0);

        // A market order that filled nothing, or any order the exchange already closed unfilled,
        // left no exposure behind
        if executed_qty <= 0.0 && (request.price.is_none() || is_terminal_status(&order.status)) {
            tracing::warn!(
                "Order {} {} {} {:.8} ended {} with nothing filled",
                order.order_id,
                request.side.as_str(),
                request.symbol,
                request.quantity,
                order.status
            );
            return Err(BotError::OrderRejected(format!(
                "order {} {} with nothing filled",
                order.order_id, order.status
            )));
        }

        let mut fees: HashMap<String, f64> = HashMap::new();
        for fill in &order.fills {
            *fees.entry(fill.commission_asset.clone()).or_insert(0.0) += parse_number(&fill.commission)?;
        }

        let (quantity, price) = if executed_qty > 0.0 {
            (executed_qty, Some(quote_qty / executed_qty))
        } else {
            (request.quantity, request.price)
        };

        tracing::info!(
            "Order {} {} {} {:.8} -> {} (filled {:.8})",
            order.order_id,
            request.side.as_str(),
            request.symbol,
            request.quantity,
            order.status,
            executed_qty
        );

        Ok(Trade {
            id: client_order_id,
            exchange_order_id: Some(order.order_id),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity,
            price,
            fees,
            timestamp: Utc::now(),
        })
    }

    async fn fetch_balance(&self) -> Result<AccountBalance> {
        let body = self.get_with_retry("/api/v3/account", &[], true).await?;

        let account: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::DataUnavailable(format!("Failed to decode account: {}", e)))?;

        let mut balance = AccountBalance::default();
        for entry in account.balances {
            balance.assets.insert(
                entry.asset,
                AssetBalance {
                    free: parse_number(&entry.free)?,
                    locked: parse_number(&entry.locked)?,
                },
            );
        }

        Ok(balance)
    }
}

// Values are symbols, enum names, numbers and uuids, none of which need escaping
fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BotError::Config(format!("Failed to init signer: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Plain decimal string, at most 8 places, no exponent
fn format_decimal(value: f64) -> Result<String> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(QUANTITY_DECIMALS).normalize().to_string())
        .ok_or_else(|| BotError::OrderRejected(format!("Cannot express {} as a decimal", value)))
}

/// Order states in which nothing more will be filled
fn is_terminal_status(status: &str) -> bool {
    matches!(
        status,
        "CANCELED" | "PENDING_CANCEL" | "REJECTED" | "EXPIRED" | "EXPIRED_IN_MATCH"
    )
}

fn describe_api_error(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => format!("{} (code {})", err.msg, err.code),
        Err(_) => body.to_string(),
    }
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| BotError::DataUnavailable(format!("Invalid number from exchange: {:?}", raw)))
}

fn parse_optional(raw: Option<&str>) -> Result<Option<f64>> {
    raw.map(parse_number).transpose()
}

/// Kline row: [open time ms, "open", "high", "low", "close", "volume", close time, ...]
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(BotError::DataUnavailable(format!(
            "Kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time_ms = row[0]
        .as_i64()
        .ok_or_else(|| BotError::DataUnavailable("Kline open time is not an integer".into()))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time_ms)
        .ok_or_else(|| BotError::DataUnavailable(format!("Kline open time {} out of range", open_time_ms)))?;

    let field = |i: usize| -> Result<f64> {
        match &row[i] {
            serde_json::Value::String(s) => parse_number(s),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| BotError::DataUnavailable(format!("Kline field {} out of range", i))),
            other => Err(BotError::DataUnavailable(format!(
                "Kline field {} has unexpected type: {}",
                i, other
            ))),
        }
    };

    Ok(Candle {
        timestamp,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exchange_symbol() {
        assert_eq!(BinanceClient::exchange_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(BinanceClient::exchange_symbol("eth-usdt"), "ETHUSDT");
        assert_eq!(BinanceClient::exchange_symbol("SOLUSDT"), "SOLUSDT");
    }

    #[test]
    fn test_sign_known_vector() {
        // Example from the Binance API documentation
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let payload = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign(secret, payload).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(0.001).unwrap(), "0.001");
        assert_eq!(format_decimal(0.00000001).unwrap(), "0.00000001");
        assert_eq!(format_decimal(65000.0).unwrap(), "65000");
        assert!(format_decimal(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_kline() {
        let row = vec![
            json!(1_700_000_000_000i64),
            json!("36500.10"),
            json!("36600.00"),
            json!("36450.00"),
            json!("36550.55"),
            json!("12.5"),
            json!(1_700_000_299_999i64),
        ];
        let candle = parse_kline(&row).unwrap();

        assert_eq!(candle.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(candle.open, 36500.10);
        assert_eq!(candle.close, 36550.55);
        assert_eq!(candle.volume, 12.5);
    }

    #[test]
    fn test_parse_kline_rejects_short_rows() {
        let row = vec![json!(1_700_000_000_000i64), json!("1.0")];
        assert!(matches!(parse_kline(&row), Err(BotError::DataUnavailable(_))));
    }

    #[test]
    fn test_terminal_status() {
        assert!(is_terminal_status("EXPIRED"));
        assert!(is_terminal_status("CANCELED"));
        assert!(is_terminal_status("REJECTED"));
        assert!(!is_terminal_status("NEW"));
        assert!(!is_terminal_status("PARTIALLY_FILLED"));
        assert!(!is_terminal_status("FILLED"));
    }

    #[test]
    fn test_describe_api_error() {
        let body = r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#;
        assert_eq!(
            describe_api_error(body),
            "Account has insufficient balance for requested action. (code -2010)"
        );
        assert_eq!(describe_api_error("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_signed_request_needs_credentials() {
        let client = BinanceClient::new(true, None, 600).unwrap();
        assert!(matches!(client.signed_query(&[]), Err(BotError::Config(_))));
        assert_eq!(client.base_url(), BINANCE_TESTNET_API);
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = BinanceCredentials {
            api_key: "key".into(),
            api_secret: "super-secret".into(),
        };
        assert!(!format!("{:?}", credentials).contains("super-secret"));
    }
}
