#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use articlegen_client::{
    ArticleClient, ClientConfig, CredentialStore, GenerationStrategy, MemoryCredentialStore,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, oneshot};

pub const VALID_USERNAME: &str = "admin";
pub const VALID_PASSWORD: &str = "admin123";
pub const ISSUED_TOKEN: &str = "tok-venezuela-1";
pub const VENEZUELA_HTML: &str =
    "<!DOCTYPE html><html><head><title>Venezuela Update</title></head><body><h1>Venezuela Update</h1></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone, Default)]
pub struct StubBehavior {
    pub fail_seo: bool,
    pub fail_full_article: bool,
    pub omit_full_article_html: bool,
    pub bare_stage_responses: bool,
}

#[derive(Clone)]
pub struct StubState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    accepted_token: Arc<Mutex<Option<String>>>,
    behavior: Arc<StubBehavior>,
    held: Arc<Mutex<HashMap<&'static str, RequestGate>>>,
}

/// Holds one request open so a test can act while it is in flight.
#[derive(Clone, Default)]
pub struct RequestGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct GeneratorStub {
    pub base_url: String,
    state: StubState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl GeneratorStub {
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().await.clone()
    }

    pub async fn call_paths(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .map(|call| call.path)
            .collect()
    }

    /// The next request to `path` waits after it is recorded until
    /// `release` is notified.
    pub async fn hold_next(&self, path: &'static str) -> RequestGate {
        let gate = RequestGate::default();
        self.state.held.lock().await.insert(path, gate.clone());
        gate
    }

    /// Makes every token issued so far invalid, as if it expired remotely.
    pub async fn revoke_tokens(&self) {
        *self.state.accepted_token.lock().await = None;
    }

    pub fn client(&self, store: Arc<dyn CredentialStore>) -> ArticleClient {
        self.client_with_strategy(store, GenerationStrategy::OneShot)
    }

    pub fn client_with_strategy(
        &self,
        store: Arc<dyn CredentialStore>,
        strategy: GenerationStrategy,
    ) -> ArticleClient {
        ArticleClient::new(self.config(strategy), store)
    }

    pub fn config(&self, strategy: GenerationStrategy) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url).unwrap_or_else(|error| {
            panic!("stub base url rejected: {error}");
        });
        config.strategy = strategy;
        config.timeout_ms = 5_000;
        config
    }

    /// A client that has already logged in against this stub.
    pub async fn signed_in_client(
        &self,
        strategy: GenerationStrategy,
    ) -> Result<(ArticleClient, Arc<MemoryCredentialStore>)> {
        let store = Arc::new(MemoryCredentialStore::new());
        let client = self.client_with_strategy(store.clone(), strategy);
        client
            .session()
            .login(VALID_USERNAME, VALID_PASSWORD)
            .await?;
        Ok((client, store))
    }
}

impl Drop for GeneratorStub {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_stub(behavior: StubBehavior) -> Result<GeneratorStub> {
    let state = StubState {
        calls: Arc::new(Mutex::new(Vec::new())),
        accepted_token: Arc::new(Mutex::new(None)),
        behavior: Arc::new(behavior),
        held: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/me", get(me))
        .route("/api/generate-full-article", post(generate_full_article))
        .route("/api/generate-article", post(generate_article))
        .route("/api/generate-seo", post(generate_seo))
        .route("/api/generate-html", post(generate_html))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    Ok(GeneratorStub {
        base_url: format!("http://{addr}"),
        state,
        shutdown: Some(shutdown_tx),
    })
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

pub fn venezuela_article() -> Value {
    json!({
        "title": "Venezuela Update",
        "introduction": "A look at recent events.",
        "sections": [
            {"heading": "Background", "content": "Context on the situation."},
            {"heading": "What Happened", "content": "The latest developments."}
        ],
        "conclusion": "What to watch next.",
        "references": ["https://example.com/venezuela"]
    })
}

pub fn venezuela_seo() -> Value {
    json!({
        "title": "Venezuela Update: Key Developments",
        "description": "A concise overview of the latest developments in Venezuela.",
        "keywords": ["venezuela", "politics", "latin america"],
        "meta_tags": {
            "og:title": "Venezuela Update",
            "og:description": "Latest developments in Venezuela"
        }
    })
}

async fn record(state: &StubState, path: &str, headers: &HeaderMap, body: Value) {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    state.calls.lock().await.push(RecordedCall {
        path: path.to_string(),
        authorization,
        body,
    });

    let gate = state.held.lock().await.remove(path);
    if let Some(gate) = gate {
        gate.entered.notify_one();
        gate.release.notified().await;
    }
}

async fn authorize(state: &StubState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string);
    let accepted = state.accepted_token.lock().await.clone();
    match (presented, accepted) {
        (Some(presented), Some(accepted)) if presented == accepted => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Could not validate credentials"})),
        )),
    }
}

async fn login(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/api/login", &headers, body.clone()).await;

    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if username != Some(VALID_USERNAME) || password != Some(VALID_PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        );
    }

    *state.accepted_token.lock().await = Some(ISSUED_TOKEN.to_string());
    (
        StatusCode::OK,
        Json(json!({"access_token": ISSUED_TOKEN, "token_type": "bearer"})),
    )
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    record(&state, "/api/me", &headers, Value::Null).await;
    if let Err(rejection) = authorize(&state, &headers).await {
        return rejection;
    }
    (
        StatusCode::OK,
        Json(json!({"username": VALID_USERNAME, "role": "editor"})),
    )
}

async fn generate_full_article(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/api/generate-full-article", &headers, body).await;
    if let Err(rejection) = authorize(&state, &headers).await {
        return rejection;
    }
    if state.behavior.fail_full_article {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Error generating article: model unavailable"})),
        );
    }
    if state.behavior.omit_full_article_html {
        return (
            StatusCode::OK,
            Json(json!({"article": venezuela_article(), "seo": venezuela_seo()})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "article": venezuela_article(),
            "seo": venezuela_seo(),
            "html": VENEZUELA_HTML
        })),
    )
}

async fn generate_article(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/api/generate-article", &headers, body).await;
    if let Err(rejection) = authorize(&state, &headers).await {
        return rejection;
    }
    if state.behavior.bare_stage_responses {
        return (StatusCode::OK, Json(venezuela_article()));
    }
    (StatusCode::OK, Json(json!({"article": venezuela_article()})))
}

async fn generate_seo(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/api/generate-seo", &headers, body).await;
    if let Err(rejection) = authorize(&state, &headers).await {
        return rejection;
    }
    if state.behavior.fail_seo {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Error generating SEO metadata: rate limited"})),
        );
    }
    if state.behavior.bare_stage_responses {
        return (StatusCode::OK, Json(venezuela_seo()));
    }
    (StatusCode::OK, Json(json!({"seo": venezuela_seo()})))
}

async fn generate_html(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let complete = body.get("article").is_some() && body.get("seo").is_some();
    record(&state, "/api/generate-html", &headers, body).await;
    if let Err(rejection) = authorize(&state, &headers).await {
        return rejection;
    }
    if !complete {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "article and seo are required"})),
        );
    }
    (StatusCode::OK, Json(json!({"html": VENEZUELA_HTML})))
}
