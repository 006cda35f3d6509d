//! Purpose: Provide the HTTP/JSON server for the blog collection.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server mapping CRUD verbs onto the store.
//! Invariants: Malformed identifiers are rejected before the store is touched.
//! Invariants: Validation failures persist nothing; delete is idempotent.
//! Invariants: Loopback-only unless explicitly allowed.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bloglist::api::{BlogStore, EntryId, Error, ErrorKind, normalize};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub store_path: PathBuf,
    pub allow_non_loopback: bool,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: u64,
}

struct AppState {
    store: Mutex<BlogStore>,
}

impl AppState {
    fn store(&self) -> MutexGuard<'_, BlogStore> {
        self.store
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let store = BlogStore::open(&config.store_path)?;
    let state = Arc::new(AppState {
        store: Mutex::new(store),
    });

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/blogs", get(list_entries).post(create_entry))
        .route("/blogs/:id", put(update_entry).delete(delete_entry))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = cors_layer(&config.cors_origins)? {
        router = router.layer(cors);
    }
    let app = router.with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    tracing::info!(
        bind = %config.bind,
        store = %config.store_path.display(),
        "serving blog collection"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("server failed")
                .with_source(err)
        })
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    let mut values = Vec::new();
    for origin in origins {
        values.push(HeaderValue::from_str(origin).map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid CORS origin: {origin}"))
                .with_hint("Use a full origin like https://app.example.com.")
        })?);
    }
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn list_entries(State(state): State<Arc<AppState>>) -> Response {
    let entries = state.store().list().to_vec();
    (StatusCode::OK, Json(entries)).into_response()
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<Value>,
) -> Response {
    let fields = match normalize(&candidate) {
        Ok(fields) => fields,
        Err(err) => return error_response(err),
    };
    match state.store().insert(fields) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(replacement): Json<Value>,
) -> Response {
    let id = match id.parse::<EntryId>() {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    let fields = match normalize(&replacement) {
        Ok(fields) => fields,
        Err(err) => return error_response(err),
    };
    match state.store().replace(id, fields) {
        Ok(Some(entry)) => (StatusCode::OK, Json(entry)).into_response(),
        Ok(None) => error_response(
            Error::new(ErrorKind::NotFound).with_message(format!("no entry with id {id}")),
        ),
        Err(err) => error_response(err),
    }
}

async fn delete_entry(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> Response {
    let id = match id.parse::<EntryId>() {
        Ok(id) => id,
        Err(err) => return error_response(err),
    };
    // Success regardless of prior existence.
    match state.store().remove(id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Busy => StatusCode::LOCKED,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            field: err.field().map(str::to_string),
            path: err.path().map(|path| path.to_string_lossy().to_string()),
        },
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServeConfig, cors_layer, serve, validate_config};

    fn config(bind: &str) -> ServeConfig {
        let temp = tempfile::tempdir().expect("tempdir");
        ServeConfig {
            bind: bind.parse().expect("bind"),
            store_path: temp.path().join("entries.json"),
            allow_non_loopback: false,
            cors_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn serve_rejects_non_loopback_bind() {
        let err = serve(config("0.0.0.0:0")).await.expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_loopback_requires_allow_flag() {
        let err = validate_config(&config("0.0.0.0:0")).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let mut allowed = config("0.0.0.0:0");
        allowed.allow_non_loopback = true;
        validate_config(&allowed).expect("config ok");
    }

    #[test]
    fn body_limit_must_be_positive() {
        let mut bad = config("127.0.0.1:0");
        bad.max_body_bytes = 0;
        let err = validate_config(&bad).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn cors_origins_must_be_header_safe() {
        let err = cors_layer(&["bad\norigin".to_string()]).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let layer = cors_layer(&["https://app.example.com".to_string()]).expect("ok");
        assert!(layer.is_some());

        let none = cors_layer(&[]).expect("ok");
        assert!(none.is_none());
    }
}
