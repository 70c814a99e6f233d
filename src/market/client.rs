//! Premium exchange HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::api::{BeginQuote, ConfirmReceipt, ExchangeApi};
use super::session::{Endpoint, Endpoints, SessionCookie};
use super::types::{
    MarketConstants, MarketSnapshot, PerResource, Resource, TaxRates, VillageState, WholeAmount,
};
use crate::config::Config;
use crate::error::{BotError, MarketError};
use crate::metrics;
use crate::trading::TradeAction;
use crate::utils::unix_time;

/// Header the game expects on ajax requests that should return game data.
const AJAX_HEADER: &str = "TribalWars-Ajax";

/// Premium exchange API client.
#[derive(Debug, Clone)]
pub struct GameClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Endpoint URL templates.
    endpoints: Endpoints,
    /// Session cookie source.
    session: SessionCookie,
}

/// Market poll response.
#[derive(Debug, Deserialize)]
struct PollEnvelope {
    response: PollMarket,
    game_data: GameData,
}

#[derive(Debug, Deserialize)]
struct PollMarket {
    merchants: WholeAmount,
    constants: MarketConstants,
    stock: PerResource<WholeAmount>,
    capacity: PerResource<WholeAmount>,
    tax: TaxRates,
}

#[derive(Debug, Deserialize)]
struct GameData {
    #[serde(default)]
    csrf: Option<String>,
    village: PerResource<WholeAmount>,
    player: Player,
}

#[derive(Debug, Deserialize)]
struct Player {
    pp: WholeAmount,
}

/// One entry of the begin response array.
#[derive(Debug, Deserialize)]
struct BeginEntry {
    rate_hash: String,
    amount: WholeAmount,
}

/// Confirm response.
#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    transactions: Vec<Transaction>,
    data: ConfirmData,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    amount: WholeAmount,
}

#[derive(Debug, Deserialize)]
struct ConfirmData {
    merchants: WholeAmount,
}

impl GameClient {
    /// Create a client from config, loading the endpoint table.
    pub fn new(config: &Config) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(2))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let endpoints = Endpoints::load(&config.urls_file)?;

        Ok(Self::from_parts(
            http,
            endpoints,
            SessionCookie::new(&config.session_file),
        ))
    }

    /// Assemble a client from already-built parts.
    pub fn from_parts(http: reqwest::Client, endpoints: Endpoints, session: SessionCookie) -> Self {
        Self {
            http,
            endpoints,
            session,
        }
    }

    /// Get the endpoint table.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Get the session cookie source.
    pub fn session(&self) -> &SessionCookie {
        &self.session
    }

    /// Build the request URL: template, then `h=<csrf>` once known, then
    /// `client_time=<unix seconds>`.
    pub fn request_url(&self, endpoint: Endpoint, csrf: Option<&str>) -> Url {
        let mut url = self.endpoints.url(endpoint).clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(token) = csrf.filter(|t| !t.is_empty()) {
                query.append_pair("h", token);
            }
            query.append_pair("client_time", &unix_time().to_string());
        }
        url
    }

    /// Send a request with the session cookie and validate the body.
    async fn send(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<Value, MarketError> {
        let cookie = self.session.header_value()?;

        let timer = metrics::LatencyTimer::new(endpoint);
        let response = request.header(COOKIE, cookie).send().await?;
        debug!(%endpoint, status = %response.status(), latency_ms = timer.elapsed_ms(), "Exchange responded");
        drop(timer);

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::FetchFailed {
                endpoint,
                reason: format!("HTTP {}", status),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketError::ParseError(format!("{}: {}", endpoint, e)))?;

        check_rejection(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl ExchangeApi for GameClient {
    async fn poll_market(&self) -> Result<MarketSnapshot, MarketError> {
        let url = self.request_url(Endpoint::CheckMarket, None);
        debug!(url = %url, "Polling market");

        let request = self.http.get(url).header(AJAX_HEADER, "1");
        let body = self.send(Endpoint::CheckMarket, request).await?;
        parse_market(body)
    }

    async fn begin_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        csrf: Option<&str>,
    ) -> Result<BeginQuote, MarketError> {
        let url = self.request_url(Endpoint::ExchangeBegin, csrf);
        debug!(%action, %resource, "Beginning trade");

        let form = [(action.field(resource), "1".to_string())];
        let request = self.http.post(url).form(&form);
        let body = self.send(Endpoint::ExchangeBegin, request).await?;
        parse_begin(body)
    }

    async fn confirm_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        rate_hash: &str,
        amount: i64,
        csrf: Option<&str>,
    ) -> Result<ConfirmReceipt, MarketError> {
        let url = self.request_url(Endpoint::ExchangeConfirm, csrf);
        debug!(%action, %resource, amount, "Confirming trade");

        let form = [
            ("mb".to_string(), "1".to_string()),
            (format!("rate_{}", resource), rate_hash.to_string()),
            (action.field(resource), amount.to_string()),
        ];
        let request = self.http.post(url).form(&form);
        let body = self.send(Endpoint::ExchangeConfirm, request).await?;
        parse_confirm(body)
    }
}

/// Reject bodies carrying a truthy `error` field or `response: false`.
pub fn check_rejection(body: &Value) -> Result<(), MarketError> {
    if let Some(error) = body.get("error").filter(|e| is_truthy(e)) {
        return Err(MarketError::Rejected(describe_error(error)));
    }

    if body.get("response") == Some(&Value::Bool(false)) {
        return Err(MarketError::Rejected(body.to_string()));
    }

    Ok(())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Convert a market poll body into a snapshot.
pub fn parse_market(body: Value) -> Result<MarketSnapshot, MarketError> {
    let envelope: PollEnvelope = serde_json::from_value(body)
        .map_err(|e| MarketError::ParseError(format!("market poll: {}", e)))?;

    let PollEnvelope {
        response,
        game_data,
    } = envelope;

    Ok(MarketSnapshot {
        village: VillageState {
            available: game_data.village.map(|v| v.0),
            points: game_data.player.pp.0,
            merchants: response.merchants.0,
            csrf: game_data.csrf.filter(|t| !t.is_empty()),
        },
        constants: response.constants,
        stock: response.stock.map(|v| v.0),
        capacity: response.capacity.map(|v| v.0),
        tax: response.tax,
    })
}

/// Extract the rate lock from a begin body (`[{rate_hash, amount}, ...]`).
pub fn parse_begin(body: Value) -> Result<BeginQuote, MarketError> {
    let entries: Vec<BeginEntry> = serde_json::from_value(body)
        .map_err(|e| MarketError::ParseError(format!("exchange begin: {}", e)))?;

    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::ParseError("exchange begin: empty response".to_string()))?;

    Ok(BeginQuote {
        rate_hash: first.rate_hash,
        amount: first.amount.0,
    })
}

/// Extract the settled amount and merchants from a confirm body.
pub fn parse_confirm(body: Value) -> Result<ConfirmReceipt, MarketError> {
    let response: ConfirmResponse = serde_json::from_value(body)
        .map_err(|e| MarketError::ParseError(format!("exchange confirm: {}", e)))?;

    let first = response.transactions.first().ok_or_else(|| {
        MarketError::ParseError("exchange confirm: no transactions".to_string())
    })?;

    Ok(ConfirmReceipt {
        amount: first.amount.0,
        merchants: response.data.merchants.0,
    })
}
