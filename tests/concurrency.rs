//! Concurrent use of shared clients and the codec

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use serde_json::{json, Value};
use tokio_util::codec::{Decoder, Encoder};
use wiremock::matchers::body_partial_json;
use wiremock::{Mock, MockServer, ResponseTemplate};
use zabbix_protocol::api::http::{HttpRequest, HttpResponse, HttpTransport};
use zabbix_protocol::api::{ApiClient, AsyncApiClient};
use zabbix_protocol::config::ApiConfig;
use zabbix_protocol::core::codec::PacketCodec;
use zabbix_protocol::core::packet::Packet;
use zabbix_protocol::error::Result;

const SESSION: &str = "0424bd59b807674191e7d77572075f33";

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "result": result, "id": 1}))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_login_once() {
    let server = MockServer::start().await;
    Mock::given(body_partial_json(json!({"method": "apiinfo.version"})))
        .respond_with(rpc_result(json!("7.0.0")).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_partial_json(json!({"method": "user.login"})))
        .respond_with(rpc_result(json!(SESSION)).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(body_partial_json(json!({"method": "host.get"})))
        .respond_with(rpc_result(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(body_partial_json(json!({"method": "item.get"})))
        .respond_with(rpc_result(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = Arc::new(
        AsyncApiClient::new(ApiConfig::new(server.uri()).with_credentials("Admin", "zabbix"))
            .unwrap(),
    );
    let hosts = api.entity("host");
    let (a, b, c) = tokio::join!(
        api.call("host.get", json!({})),
        api.call("item.get", json!({})),
        hosts.call("get", json!({})),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();
    server.verify().await;
}

/// Answers like a 7.0 server and counts logins.
struct SlowServer {
    logins: AtomicUsize,
    versions: AtomicUsize,
}

impl HttpTransport for SlowServer {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let body: Value = serde_json::from_str(&request.body)?;
        let result = match body["method"].as_str() {
            Some("apiinfo.version") => {
                self.versions.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                json!("7.0.0")
            }
            Some("user.login") => {
                self.logins.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                json!(SESSION)
            }
            _ => {
                assert_eq!(
                    request.header("Authorization"),
                    Some(format!("Bearer {SESSION}").as_str())
                );
                json!([])
            }
        };
        Ok(HttpResponse {
            status: 200,
            body: json!({"jsonrpc": "2.0", "result": result, "id": body["id"]}).to_string(),
        })
    }
}

#[test]
fn concurrent_threads_login_once() {
    let transport = SlowServer {
        logins: AtomicUsize::new(0),
        versions: AtomicUsize::new(0),
    };
    let config = ApiConfig::new("localhost").with_credentials("Admin", "zabbix");
    let api = Arc::new(ApiClient::with_transport(config, transport).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let api = Arc::clone(&api);
            thread::spawn(move || api.call(if i % 2 == 0 { "host.get" } else { "item.get" }, json!({})))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(api.transport().logins.load(Ordering::SeqCst), 1);
    assert_eq!(api.transport().versions.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 2_000usize;
    let payload_sizes = [0usize, 64, 512, 4096, 65536];

    let mut tasks = JoinSet::new();
    for &size in &payload_sizes {
        tasks.spawn(async move {
            let mut codec = PacketCodec;
            let mut buf = BytesMut::new();
            for i in 0..iterations {
                let payload = "x".repeat(size);
                let compress = (i + size) % 2 == 0;
                codec.encode(Packet::new(payload.as_str(), compress).unwrap(), &mut buf).unwrap();
                let decoded = codec.decode(&mut buf).unwrap();
                assert_eq!(decoded.as_deref(), Some(payload.as_str()));
                assert!(buf.is_empty());
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}
