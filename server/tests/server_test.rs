//! Tests against a real listening server.
//!
//! These exercise the full HTTP stack (form encoding, redirects and cookie
//! headers) rather than calling the router in-process.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tokio::net::TcpListener;

use listkeeper_server::config::Config;
use listkeeper_server::routes::{create_router, AppState, HealthResponse};

// ============================================================================
// Test Helpers
// ============================================================================

/// Spawns a test server on a random available port.
/// Returns the socket address and a handle to abort the server.
async fn spawn_test_server(config: Config) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let state = AppState::new(config).unwrap();
    let app = create_router(state);

    // Bind to port 0 to get a random available port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(10)).await;

    (addr, handle)
}

/// A client that does not follow redirects, so each response can be checked.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn cookie_pair(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn health_endpoint_responds() {
    let (addr, handle) = spawn_test_server(Config::default()).await;

    let response = client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = response.json().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.sessions, 0);

    handle.abort();
}

#[tokio::test]
async fn create_list_over_http() {
    let (addr, handle) = spawn_test_server(Config::default()).await;
    let client = client();

    let root = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(root.status(), StatusCode::SEE_OTHER);
    assert_eq!(root.headers().get(LOCATION).unwrap(), "/lists");

    let index = client
        .get(format!("http://{}/lists", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert!(index.headers().get(SET_COOKIE).is_none());

    let created = client
        .post(format!("http://{}/lists", addr))
        .form(&[("list_name", "Groceries & more")])
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::SEE_OTHER);
    let cookie = cookie_pair(&created);

    let html = client
        .get(format!("http://{}/lists", addr))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Groceries &amp; more"));
    assert!(html.contains("The list has been created."));

    handle.abort();
}

#[tokio::test]
async fn secure_cookie_flag_is_sent_when_configured() {
    let config = Config {
        secure_cookie: true,
        cookie_name: "lk".to_string(),
        ..Config::default()
    };
    let (addr, handle) = spawn_test_server(config).await;

    let response = client()
        .post(format!("http://{}/lists", addr))
        .form(&[("list_name", "Errands")])
        .send()
        .await
        .unwrap();

    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("lk="));
    assert!(set_cookie.contains("; Secure"));
    assert!(set_cookie.contains("SameSite=Lax"));

    handle.abort();
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (addr, handle) = spawn_test_server(Config::default()).await;

    let response = client()
        .get(format!("http://{}/nope", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    handle.abort();
}
