//! Integration tests for the exchange arbitrage bot.
//!
//! `scanner_loop` drives the scan loop through the public API against the
//! in-memory mock exchange. `client_wire` checks the HTTP client against a
//! local one-shot server. `live` talks to the real game and needs a session
//! file and endpoint table. `signals` raises SIGINT at the test process.
//! Run with: cargo test --test integration -- --ignored

mod client_wire;
mod live;
mod scanner_loop;
#[cfg(unix)]
mod signals;
