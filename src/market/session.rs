//! Session cookie and endpoint table.
//!
//! Both live in side files next to the binary: the session id is pasted in
//! by hand after logging in through the browser, and the endpoint table
//! holds the village-specific exchange URLs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum::Display;
use url::Url;

use crate::error::{BotError, MarketError};

/// Game endpoint used by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Market state poll.
    CheckMarket,
    /// Begin phase of a trade.
    ExchangeBegin,
    /// Confirm phase of a trade.
    ExchangeConfirm,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointFile {
    check_market: EndpointEntry,
    exchange_begin: EndpointEntry,
    exchange_confirm: EndpointEntry,
}

#[derive(Debug, Deserialize)]
struct EndpointEntry {
    url: String,
}

/// Parsed endpoint URL templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Market poll URL.
    pub check_market: Url,
    /// Trade begin URL.
    pub exchange_begin: Url,
    /// Trade confirm URL.
    pub exchange_confirm: Url,
}

impl Endpoints {
    /// Load the endpoint table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            BotError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse the endpoint table from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, BotError> {
        let file: EndpointFile = serde_json::from_str(contents)?;
        Ok(Self {
            check_market: Url::parse(&file.check_market.url)?,
            exchange_begin: Url::parse(&file.exchange_begin.url)?,
            exchange_confirm: Url::parse(&file.exchange_confirm.url)?,
        })
    }

    /// URL template for an endpoint.
    pub fn url(&self, endpoint: Endpoint) -> &Url {
        match endpoint {
            Endpoint::CheckMarket => &self.check_market,
            Endpoint::ExchangeBegin => &self.exchange_begin,
            Endpoint::ExchangeConfirm => &self.exchange_confirm,
        }
    }
}

/// Session id read from a side file.
///
/// The file is re-read on every request so a refreshed cookie is picked up
/// without restarting the bot.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    path: PathBuf,
}

impl SessionCookie {
    /// Create a reader for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value for the `Cookie` header.
    pub fn header_value(&self) -> Result<String, MarketError> {
        let sid = fs::read_to_string(&self.path)
            .map_err(|e| MarketError::Session(format!("{}: {}", self.path.display(), e)))?;
        let sid = sid.trim();

        if sid.is_empty() {
            return Err(MarketError::Session(format!(
                "{} is empty",
                self.path.display()
            )));
        }

        Ok(format!("sid={};", sid))
    }
}
