//! Purpose: Provide the HTTP/JSON server for the bookstore service.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server translating HTTP verbs/paths to `Store` calls.
//! Invariants: Request failures never take the process down; each request
//! fails independently and the store stays usable.
//! Invariants: Non-JSON declared content types are rejected before any
//! handler touches the store.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bookstore::api::{Book, Error, ErrorKind, Store, open_backend};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub backend: String,
}

struct AppState {
    store: Arc<dyn Store>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    init_tracing();

    let store = open_backend(&config.backend)?;
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, backend = %config.backend, "bookstore server listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn router(store: Arc<dyn Store>) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/healthz", get(healthz))
        .route("/book", post(create_book).get(list_books))
        .route(
            "/book/:id",
            post(update_book).get(get_book).delete(delete_book),
        )
        .layer(middleware::from_fn(require_json_content_type))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
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

// Requests that declare a non-JSON content type never reach a handler.
// Requests without a Content-Type header pass; GET and DELETE carry no body.
async fn require_json_content_type(request: Request, next: Next) -> Response {
    if let Some(value) = request.headers().get(header::CONTENT_TYPE) {
        if !is_json_media_type(value) {
            return error_response_with_status(
                Error::new(ErrorKind::Usage)
                    .with_message("unsupported content type")
                    .with_hint("Use Content-Type: application/json."),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            );
        }
    }
    next.run(request).await
}

fn is_json_media_type(value: &HeaderValue) -> bool {
    let Ok(value) = value.to_str() else {
        return false;
    };
    let media_type = value.split(';').next().unwrap_or_default().trim();
    media_type.eq_ignore_ascii_case("application/json")
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn create_book(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let book = match decode_book(&body) {
        Ok(book) => book,
        Err(err) => return error_response(err),
    };
    if book.id.is_empty() {
        return error_response(
            Error::new(ErrorKind::Usage).with_message("book id must not be empty"),
        );
    }
    match state.store.create(&book) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_book(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    body: Bytes,
) -> Response {
    let mut book = match decode_book(&body) {
        Ok(book) => book,
        Err(err) => return error_response(err),
    };
    // The path id wins over whatever the body carries.
    book.id = id;
    match state.store.update(&book) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_book(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> Response {
    match state.store.get(&id) {
        Ok(book) => Json(book).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_books(State(state): State<Arc<AppState>>) -> Response {
    match state.store.get_all() {
        Ok(books) => Json(books).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_book(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    match state.store.delete(&id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

fn decode_book(body: &[u8]) -> Result<Book, Error> {
    serde_json::from_slice(body).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid book json")
            .with_source(err)
    })
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
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Internal | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response_with_status(err, status)
}

fn error_response_with_status(err: Error, status: StatusCode) -> Response {
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            id: err.id().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}
