// Shared one-time server bootstrapping for the HTTP integration tests.
//
// Each test binary boots one server with its own game config on an ephemeral
// port; all tests in the binary share the published base URL.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use fetch_server::ServerOptions;

static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

pub struct ServerSetup {
    pub config_json: String,
    pub state_file: Option<PathBuf>,
}

// Writes the config to a temp file and boots the server exactly once.
pub fn ensure_server(setup: ServerSetup) -> &'static str {
    SERVER_READY.get_or_init(|| {
        let config_path = std::env::temp_dir().join(format!(
            "fetch-server-test-config-{}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&config_path, &setup.config_json).expect("write test config");

        let options = ServerOptions {
            config_path,
            port: 0,
            tick_period: None,
            state_file: setup.state_file,
            save_period: Duration::ZERO,
            randomize_spawn_points: false,
            database_url: None,
        };

        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // An OS thread so the server outlives individual #[tokio::test] runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                fetch_server::run(listener, options).await.expect("server failed");
            });
        });

        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// Joins the shared server and returns (token, player_id).
pub async fn join(base_url: &str, map_id: &str, user_name: &str) -> (String, u64) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/v1/game/join"))
        .json(&serde_json::json!({ "userName": user_name, "mapId": map_id }))
        .send()
        .await
        .expect("join request should succeed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("join response json");
    (
        body["authToken"].as_str().expect("authToken").to_string(),
        body["playerId"].as_u64().expect("playerId"),
    )
}

pub async fn action(base_url: &str, token: &str, move_code: &str) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/v1/game/player/action"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "move": move_code }))
        .send()
        .await
        .expect("action request should succeed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

pub async fn tick(base_url: &str, time_delta_ms: i64) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/v1/game/tick"))
        .json(&serde_json::json!({ "timeDelta": time_delta_ms }))
        .send()
        .await
        .expect("tick request should succeed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

pub async fn state(base_url: &str, token: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base_url}/api/v1/game/state"))
        .bearer_auth(token)
        .send()
        .await
        .expect("state request should succeed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json().await.expect("state response json")
}
