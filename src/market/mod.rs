//! Market module for the game's premium exchange.
//!
//! This module handles:
//! - Market types and data structures
//! - The `ExchangeApi` seam and its HTTP implementation
//! - Session cookie and endpoint table
//! - Mock exchange for testing

pub mod api;
pub mod client;
pub mod mock;
pub mod session;
pub mod types;

pub use api::{BeginQuote, ConfirmReceipt, ExchangeApi};
pub use client::GameClient;
pub use mock::{MockCall, MockExchange, MockPoll, MockSnapshotBuilder};
pub use session::{Endpoint, Endpoints, SessionCookie};
pub use types::{
    MarketConstants, MarketSnapshot, PerResource, Resource, TaxRates, VillageState, WholeAmount,
};
