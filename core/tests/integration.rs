//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and drives the client
//! over real HTTP through `UreqTransport`. The server state handle stays with
//! the test so it can inject faults and inspect what was received.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mock_server::MockState;
use serde_json::{json, Value};
use stellar_user_core::{
    ApiError, AsyncUserApiClient, ClientConfig, FailureKind, MissingCredentials, Payload,
    RetryPolicy, StaticCredentials, UreqTransport, UserApiClient,
};

/// Start the mock server on a background thread and return its base URL.
fn start_server(state: Arc<MockState>) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, state).await
        })
        .unwrap();
    });

    format!("http://{addr}/api")
}

/// Serve `response` verbatim to every connection and count the hits.
fn start_raw_server(response: &'static [u8]) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();

            stream.write_all(response).unwrap();
            stream.flush().unwrap();
        }
    });

    (format!("http://{addr}/api"), hits)
}

const NON_UTF8_OK: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Length: 4\r\n\
X-Note: caf\xe9\r\n\
Connection: close\r\n\
\r\n\
\xff\xfe\x00A";

fn fast_retries() -> RetryPolicy {
    RetryPolicy::default().with_delay(Duration::from_millis(5))
}

fn client(base_url: &str, credentials: StaticCredentials) -> UserApiClient<UreqTransport, StaticCredentials> {
    let config = ClientConfig::default().with_base_url(base_url);
    UserApiClient::new(&config, UreqTransport::new(), credentials)
        .unwrap()
        .with_retry_policy(fast_retries())
}

fn payload(value: Value) -> Payload {
    value.as_object().unwrap().clone()
}

#[test]
fn user_lifecycle() {
    let state = MockState::with_credentials("api-user", "api-pass");
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::new("api-user", "api-pass"));

    // Step 1: create a user.
    let resp = client
        .create_user(&payload(json!({"email": "ada@example.com", "password": "first", "name": "Ada"})))
        .unwrap();
    assert_eq!(resp.status, 201, "{}", resp.text());
    let created: Value = resp.json().unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Ada");

    // Step 2: fetch it back.
    let fetched: Value = client.get_user_by_id(&id).unwrap().error_for_status().unwrap().json().unwrap();
    assert_eq!(fetched["email"], "ada@example.com");

    // Step 3: authenticate and resolve the personal token.
    let login: Value = client
        .authenticate(&payload(json!({"email": "ada@example.com", "password": "first"})))
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .unwrap();
    let token = login["token"].as_str().unwrap();
    let record: Value = client.get_token(token).unwrap().json().unwrap();
    assert_eq!(record["user_id"], id.as_str());

    // Step 4: patch a field.
    let resp = client.patch_user(&payload(json!({"id": id, "name": "Countess"}))).unwrap();
    assert_eq!(resp.status, 200);
    let fetched: Value = client.get_user_by_id(&id).unwrap().json().unwrap();
    assert_eq!(fetched["name"], "Countess");

    // Step 5: reset the password.
    let resp = client.send_reset_password_link("ada@example.com", "778899").unwrap();
    assert_eq!(resp.status, 200);
    let resp = client
        .verify_reset_password_code("ada@example.com", "778899", "second")
        .unwrap();
    assert_eq!(resp.status, 200);

    // Step 6: the old password no longer works, the new one does.
    let resp = client
        .authenticate(&payload(json!({"email": "ada@example.com", "password": "first"})))
        .unwrap();
    assert_eq!(resp.status, 401);
    let resp = client
        .authenticate(&payload(json!({"email": "ada@example.com", "password": "second"})))
        .unwrap();
    assert_eq!(resp.status, 200);

    // Every request carried the configured credentials.
    let expected = "Basic YXBpLXVzZXI6YXBpLXBhc3M=";
    assert!(state
        .requests()
        .iter()
        .all(|r| r.authorization.as_deref() == Some(expected)));
}

#[test]
fn unknown_user_is_returned_as_response() {
    let base = start_server(MockState::new());
    let client = client(&base, StaticCredentials::none());

    let resp = client.get_user_by_id("does-not-exist").unwrap();
    assert_eq!(resp.status, 404);
    let err = resp.error_for_status().unwrap_err();
    assert!(matches!(err, ApiError::Upstream { status: 404, .. }));
}

#[test]
fn missing_credentials_send_no_authorization_header() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::none());

    client.get_user_by_id("1").unwrap();
    let recorded = state.requests();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].authorization.is_none());
}

#[test]
fn server_rejects_unauthenticated_fallback() {
    let base = start_server(MockState::with_credentials("api-user", "api-pass"));
    let client = client(&base, StaticCredentials::none());
    assert_eq!(client.get_user_by_id("1").unwrap().status, 401);
}

#[test]
fn fail_policy_never_reaches_server() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let config = ClientConfig::default()
        .with_base_url(&base)
        .with_missing_credentials(MissingCredentials::Fail);
    let client = UserApiClient::new(&config, UreqTransport::new(), StaticCredentials::none()).unwrap();

    let err = client.get_token("t").unwrap_err();
    assert!(matches!(err, ApiError::MissingCredentials));
    assert!(state.requests().is_empty());
}

#[test]
fn get_is_retried_through_transient_errors() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::none());

    state.fail_next(2, 503);
    let resp = client.get_user_by_id("1").unwrap();
    // Third attempt reaches the handler.
    assert_eq!(resp.status, 404);
    assert_eq!(state.requests().len(), 3);
}

#[test]
fn get_returns_last_error_status_after_budget() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::none());

    state.fail_next(5, 503);
    let resp = client.get_token("t").unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(state.requests().len(), 3);
}

#[test]
fn post_is_not_retried_on_server_error() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::none());

    state.fail_next(1, 503);
    let resp = client.create_user(&payload(json!({"email": "x@example.com"}))).unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(state.requests().len(), 1);
}

#[test]
fn post_is_retried_on_rate_limit() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let client = client(&base, StaticCredentials::none());

    state.fail_next(1, 429);
    let resp = client.create_user(&payload(json!({"email": "x@example.com"}))).unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(state.requests().len(), 2);
}

#[test]
fn connection_refused_exhausts_attempts() {
    // Bind then drop to obtain a port nothing listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client(&format!("http://{addr}/api/"), StaticCredentials::none());

    let err = client.get_user_by_id("1").unwrap_err();
    match err {
        ApiError::Transport { attempts, source, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(source.kind, FailureKind::Connect);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn async_client_matches_blocking_semantics() {
    let state = MockState::with_credentials("api-user", "api-pass");
    let base = start_server(state.clone());
    let client: AsyncUserApiClient<_, _> = client(&base, StaticCredentials::new("api-user", "api-pass")).into();

    let resp = client
        .create_user(payload(json!({"email": "async@example.com", "password": "pw"})))
        .await
        .unwrap();
    assert_eq!(resp.status, 201);
    let id = resp.json::<Value>().unwrap()["id"].as_str().unwrap().to_string();

    state.fail_next(2, 502);
    let resp = client.get_user_by_id(id).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(state.requests().len(), 4);
}

#[test]
fn non_utf8_body_is_returned_as_received() {
    let (base, hits) = start_raw_server(NON_UTF8_OK);
    let client = client(&base, StaticCredentials::none());

    let resp = client.get_user_by_id("1").unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, vec![0xff, 0xfe, 0x00, b'A']);
    assert_eq!(resp.header("x-note"), Some("caf\u{fffd}"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn non_utf8_body_after_create_is_not_a_failure() {
    let (base, hits) = start_raw_server(NON_UTF8_OK);
    let client = client(&base, StaticCredentials::none());

    let resp = client.create_user(&payload(json!({"email": "bytes@example.com"}))).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body.len(), 4);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn preconfigured_agent_is_used_for_requests() {
    let state = MockState::new();
    let base = start_server(state.clone());
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .new_agent();
    let config = ClientConfig::default().with_base_url(&base);
    let client = UserApiClient::new(&config, UreqTransport::with_agent(agent), StaticCredentials::none())
        .unwrap()
        .with_retry_policy(fast_retries());

    let resp = client.get_user_by_id("missing").unwrap();
    assert_eq!(resp.status, 404);
    assert_eq!(state.requests().len(), 1);
}
