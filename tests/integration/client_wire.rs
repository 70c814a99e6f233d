//! HTTP client wire format against a local one-shot server.

use std::io::Write;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

use exchange_arb::error::MarketError;
use exchange_arb::market::{
    BeginQuote, ConfirmReceipt, Endpoints, ExchangeApi, GameClient, Resource, SessionCookie,
};
use exchange_arb::trading::TradeAction;

/// Serve one canned JSON response and hand back the raw request.
async fn serve_once(body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });

    (base, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn client_for(base: &str, session: &tempfile::NamedTempFile) -> GameClient {
    let endpoints = Endpoints::from_json(&format!(
        r#"{{
            "checkMarket": {{"url": "{base}/game.php?village=1&screen=market"}},
            "exchangeBegin": {{"url": "{base}/game.php?village=1&ajaxaction=exchange_begin"}},
            "exchangeConfirm": {{"url": "{base}/game.php?village=1&ajaxaction=exchange_confirm"}}
        }}"#
    ))
    .unwrap();

    GameClient::from_parts(reqwest::Client::new(), endpoints, SessionCookie::new(session.path()))
}

fn session_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "abc123").unwrap();
    file
}

const POLL_BODY: &str = r#"{
    "response": {
        "merchants": 11,
        "constants": {"resource_base_price": 0.0025, "resource_price_elasticity": 0.0015, "stock_size_modifier": 1000},
        "stock": {"wood": 0, "stone": 5000, "iron": 10000},
        "capacity": {"wood": 10000, "stone": 10000, "iron": 10000},
        "tax": {"buy": 0.05, "sell": 0.05}
    },
    "game_data": {
        "csrf": "tok42",
        "village": {"wood": 5000, "stone": 6000, "iron": 7000},
        "player": {"pp": "800"}
    }
}"#;

#[tokio::test]
async fn poll_sends_session_cookie_and_ajax_header() {
    let (base, server) = serve_once(POLL_BODY).await;
    let session = session_file();
    let client = client_for(&base, &session);

    let snapshot = assert_ok!(client.poll_market().await);
    assert_eq!(snapshot.village.merchants, 11);
    assert_eq!(snapshot.village.points, 800);
    assert_eq!(snapshot.village.csrf.as_deref(), Some("tok42"));

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("get /game.php?village=1&screen=market&client_time="));
    assert!(!request.contains("&h="));
    assert!(request.contains("cookie: sid=abc123;"));
    assert!(request.contains("tribalwars-ajax: 1"));
}

#[tokio::test]
async fn begin_posts_one_unit_form_with_csrf() {
    let (base, server) = serve_once(r#"[{"rate_hash": "f00d", "amount": -377}]"#).await;
    let session = session_file();
    let client = client_for(&base, &session);

    let quote = assert_ok!(
        client
            .begin_trade(TradeAction::Sell, Resource::Wood, Some("tok42"))
            .await
    );
    assert_eq!(
        quote,
        BeginQuote {
            rate_hash: "f00d".to_string(),
            amount: -377
        }
    );

    let request = server.await.unwrap();
    assert!(request.starts_with(
        "POST /game.php?village=1&ajaxaction=exchange_begin&h=tok42&client_time="
    ));
    assert!(request
        .to_lowercase()
        .contains("content-type: application/x-www-form-urlencoded"));
    assert!(request.ends_with("\r\n\r\nsell_wood=1"));
}

#[tokio::test]
async fn confirm_posts_rate_hash_and_amount() {
    let (base, server) =
        serve_once(r#"{"transactions": [{"amount": -377}], "data": {"merchants": 8}}"#).await;
    let session = session_file();
    let client = client_for(&base, &session);

    let receipt = assert_ok!(
        client
            .confirm_trade(TradeAction::Sell, Resource::Wood, "f00d", 377, Some("tok42"))
            .await
    );
    assert_eq!(
        receipt,
        ConfirmReceipt {
            amount: -377,
            merchants: 8
        }
    );

    let request = server.await.unwrap();
    assert!(request.ends_with("\r\n\r\nmb=1&rate_wood=f00d&sell_wood=377"));
}

#[tokio::test]
async fn error_body_is_a_rejection() {
    let (base, server) = serve_once(r#"{"error": ["Not enough resources"]}"#).await;
    let session = session_file();
    let client = client_for(&base, &session);

    let err = assert_err!(
        client
            .begin_trade(TradeAction::Buy, Resource::Iron, None)
            .await
    );
    assert!(matches!(err, MarketError::Rejected(ref msg) if msg == "Not enough resources"));
    server.await.unwrap();
}

#[tokio::test]
async fn missing_session_file_fails_before_sending() {
    let endpoints = Endpoints::from_json(
        r#"{
            "checkMarket": {"url": "http://127.0.0.1:9/game.php?screen=market"},
            "exchangeBegin": {"url": "http://127.0.0.1:9/game.php?ajaxaction=exchange_begin"},
            "exchangeConfirm": {"url": "http://127.0.0.1:9/game.php?ajaxaction=exchange_confirm"}
        }"#,
    )
    .unwrap();
    let client = GameClient::from_parts(
        reqwest::Client::new(),
        endpoints,
        SessionCookie::new("/definitely/not/here/sid.txt"),
    );

    let err = assert_err!(client.poll_market().await);
    assert!(matches!(err, MarketError::Session(_)));
}
