//! Full runs over a real HTTP server on a loopback port.

use std::sync::Arc;
use std::time::Duration;

use sweep::client::{CleanupClient, HttpTransport, Transport};
use sweep::error::ApiError;
use sweep::orchestrator::{BatchOrchestrator, HeadlessPresenter};
use sweep::server;
use sweep::types::RecordType;
use tokio::sync::oneshot;

use crate::integration::test_utils::{Fixture, ProbeTransport, TEST_TOKEN};

struct RunningServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<Result<(), ApiError>>,
}

impl RunningServer {
    async fn start(fx: &Fixture) -> Self {
        let listener = server::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let service = fx.service.clone();
        let handle = tokio::spawn(async move {
            server::serve(listener, service, async {
                let _ = rx.await;
            })
            .await
        });
        Self {
            base_url: format!("http://{}", addr),
            shutdown: Some(tx),
            handle,
        }
    }

    fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(HttpTransport::new(&self.base_url, Duration::from_secs(10)).unwrap())
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_run_matches_in_process_outcome() {
    let fx = Fixture::with_token_auth(40);
    fx.seed(RecordType::Product, 85, &[12]);
    let server = RunningServer::start(&fx).await;

    let probe = Arc::new(ProbeTransport::new(server.transport()));
    let transport: Arc<dyn Transport> = probe.clone();
    let mut presenter = HeadlessPresenter::new(true);
    let outcome = BatchOrchestrator::new(CleanupClient::new(transport, TEST_TOKEN), &mut presenter)
        .run(RecordType::Product)
        .await;

    assert!(outcome.is_success(), "{}", outcome.message());
    let summary = outcome.summary().unwrap();
    assert_eq!(summary.deleted, 84);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.remaining, Some(1));
    assert_eq!(probe.batch_offsets().len(), 3);
    assert_eq!(fx.count(RecordType::Product), 1);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_token_over_http_is_insufficient_permissions() {
    let fx = Fixture::with_token_auth(40);
    let server = RunningServer::start(&fx).await;

    let client = CleanupClient::new(server.transport(), "not-the-token");
    let err = client.get_counts().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(err.to_string(), "Insufficient permissions");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_endpoint_reports_batch_size() {
    let fx = Fixture::with_token_auth(25);
    let server = RunningServer::start(&fx).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["batch_size"], 25);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_body_is_rejected_by_the_framework() {
    let fx = Fixture::with_token_auth(40);
    let server = RunningServer::start(&fx).await;

    let response = reqwest::Client::new()
        .post(format!("{}/cleanup", server.base_url))
        .header("content-type", "application/json")
        .body(r#"{"action":"drop_everything"}"#)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    server.stop().await;
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = format!("http://127.0.0.1:{}", port);
    let transport = HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap();
    let client = CleanupClient::new(Arc::new(transport), TEST_TOKEN);

    let err = client.get_counts().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "{:?}", err);
}
