//! Mock Google Trends upstream for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trendscout::{Configuration, PacingPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Anti-hijacking prefix the upstream puts before every JSON body.
pub const GUARD: &str = ")]}',\n";
pub const EXPLORE: &str = "/trends/api/explore";
pub const MULTILINE: &str = "/trends/api/widgetdata/multiline";
pub const TOKEN: &str = "test-token";

/// First week of every mocked timeline.
pub const EPOCH: i64 = 1_600_000_000;
pub const WEEK: i64 = 604_800;

/// Fast retries, no pacing and no cache, pointed at the mock.
pub fn test_config(server: &MockServer) -> Configuration {
    let mut config = Configuration::new();
    config
        .with_api_url(Some(&server.uri()))
        .with_retry(3)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
        .with_request_timeout(Duration::from_secs(5))
        .with_pacing(PacingPolicy::none())
        .with_cache(false)
        .with_seed(Some(5));
    config
}

/// The decoded `req` query parameter of a received request.
pub fn req_param(request: &Request) -> serde_json::Value {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "req")
        .and_then(|(_, v)| serde_json::from_str(&v).ok())
        .unwrap_or(serde_json::Value::Null)
}

/// Number of keywords in a `req` payload.
pub fn keyword_count(req: &serde_json::Value) -> usize {
    req["comparisonItem"].as_array().map(|a| a.len()).unwrap_or(0)
}

/// Explore body with a TIMESERIES widget echoing the request.
pub fn explore_body(req: &serde_json::Value) -> String {
    let body = serde_json::json!({
        "widgets": [
            { "id": "TIMESERIES", "token": TOKEN, "request": req },
            { "id": "GEO_MAP", "token": "geo-token", "request": {} },
        ]
    });
    format!("{}{}", GUARD, body)
}

/// Multiline body with `weeks` complete rows and one trailing partial row for `n` keywords.
pub fn timeline_body(n: usize, weeks: i64) -> String {
    let mut rows: Vec<serde_json::Value> = (0..weeks)
        .map(|week| {
            serde_json::json!({
                "time": (EPOCH + week * WEEK).to_string(),
                "formattedTime": "",
                "value": vec![(week * 10 % 100) as u32; n],
                "hasData": vec![true; n],
            })
        })
        .collect();

    rows.push(serde_json::json!({
        "time": (EPOCH + weeks * WEEK).to_string(),
        "value": vec![99u32; n],
        "hasData": vec![true; n],
        "isPartial": true,
    }));

    format!(
        "{}{}",
        GUARD,
        serde_json::json!({ "default": { "timelineData": rows, "averages": [] } })
    )
}

/// Mount an upstream that answers every batch with three complete weeks.
pub async fn mount_trends(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(|request: &Request| {
            ResponseTemplate::new(200).set_body_string(explore_body(&req_param(request)))
        })
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(MULTILINE))
        .respond_with(|request: &Request| {
            ResponseTemplate::new(200)
                .set_body_string(timeline_body(keyword_count(&req_param(request)), 3))
        })
        .mount(server)
        .await;
}

/// Requests received on a path.
pub async fn received(server: &MockServer, on: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == on)
        .collect()
}

/// Plain TCP upstream for failures wiremock cannot produce. The first
/// `broken` explore responses promise 1000 body bytes, send a fragment and hang up.
/// Everything after that is a one keyword, three week timeline.
pub struct RawUpstream {
    pub uri: String,
    explore_hits: Arc<AtomicUsize>,
}

impl RawUpstream {
    pub async fn start(broken: usize) -> RawUpstream {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        let explore_hits = Arc::new(AtomicUsize::new(0));
        let hits = explore_hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let hits = hits.clone();
                tokio::spawn(async move {
                    let head = read_head(&mut socket).await;
                    let response = if head.starts_with(&format!("GET {}", EXPLORE)) {
                        if hits.fetch_add(1, Ordering::SeqCst) < broken {
                            "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n)]}',\n{\"widgets\":"
                                .to_string()
                        } else {
                            let req = serde_json::json!({ "comparisonItem": [{ "keyword": "Matcha" }] });
                            ok(&explore_body(&req))
                        }
                    } else {
                        ok(&timeline_body(1, 3))
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        RawUpstream { uri, explore_hits }
    }

    /// Explore requests seen so far.
    pub fn explore_hits(&self) -> usize {
        self.explore_hits.load(Ordering::SeqCst)
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// An address nothing listens on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    uri
}
