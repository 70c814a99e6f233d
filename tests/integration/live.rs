//! Tests against the real game.
//!
//! These need `sid.txt` and `urls.json` (or `SESSION_FILE` / `URLS_FILE`)
//! for a logged-in village. They only poll; no trade is ever placed.

use std::path::Path;

use tokio_test::assert_ok;

use exchange_arb::arbitrage::quote_resources;
use exchange_arb::config::Config;
use exchange_arb::market::{ExchangeApi, GameClient};

/// Get a config from environment, if the side files exist.
fn test_config() -> Option<Config> {
    let config = Config::load().ok()?;

    if !Path::new(&config.session_file).exists() || !Path::new(&config.urls_file).exists() {
        return None;
    }

    Some(config)
}

#[tokio::test]
#[ignore = "requires a live game session"]
async fn test_poll_market() {
    let config = match test_config() {
        Some(c) => c,
        None => {
            println!("Skipping: session file or endpoint table missing");
            return;
        }
    };

    let client = assert_ok!(GameClient::new(&config));
    let snapshot = assert_ok!(client.poll_market().await);

    assert!(snapshot.capacity.wood > 0);
    assert!(snapshot.village.csrf.is_some(), "csrf token missing from game data");

    let board = assert_ok!(quote_resources(&snapshot));
    println!("{}", board);
    println!("spread {}", assert_ok!(board.spread()));
}
