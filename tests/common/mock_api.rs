//! Wiremock scaffolding shared by the control-plane integration tests.

use std::time::Duration;

use serde_json::{Value, json};
use settle::{ApiClient, ControlPlaneConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token every test client sends.
pub const API_TOKEN: &str = "test-token";

/// Poll interval used by facades under test so waits finish quickly.
pub const FAST_POLL: Duration = Duration::from_millis(10);

/// Control-plane double plus a client pointed at it.
pub struct MockApi {
    /// The HTTP double.
    pub server: MockServer,
    /// Client configured against [`MockApi::server`].
    pub client: ApiClient,
}

impl MockApi {
    /// Starts a fresh server and builds a client for it.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = ControlPlaneConfig::new(API_TOKEN, server.uri());
        let client = match ApiClient::new(&config) {
            Ok(client) => client,
            Err(err) => panic!("failed to build client: {err}"),
        };
        Self { server, client }
    }

    /// Answers `verb path` with `status` and `body` for at most `times`
    /// requests. Earlier registrations win, so scripting a sequence means
    /// registering it in order.
    pub async fn respond(&self, verb: &str, route: &str, status: u16, body: Value, times: u64) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Answers `verb path` with `status` and `body` for every request.
    pub async fn always(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answers `verb path` with 404 for every request.
    pub async fn not_found(&self, verb: &str, route: &str) {
        self.always(verb, route, 404, json!({"message": "Resource not found"}))
            .await;
    }

    /// `METHOD /path` of every request received so far, in arrival order.
    pub async fn calls(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| format!("{} {}", request.method, request.url.path()))
            .collect()
    }
}
