use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::{Query as UrlQuery, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{debug, info};
use serde::Deserialize;
use tokio::net::TcpListener;
use crate::protocol::{Dispatcher, Query, QueryResult, Status};
use crate::Result;

/// Header carrying the time spent dispatching the query.
pub const HEADER_DURATION: &str = "x-duration";
/// Header echoing the requested key.
pub const HEADER_KEY: &str = "x-key";

/// Request/response adapter: `GET`, `PUT` and `DELETE` on `/` map to
/// select, insert and delete. The key comes from the `key` query parameter,
/// the inserted value from the request body.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyParams {
    #[serde(default)]
    key: String,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_select).put(handle_insert).delete(handle_delete))
            .with_state(self.dispatcher.clone())
    }

    /// Serves requests until the listener fails. Dropping this future stops the server.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("HTTP adapter listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_select(
    State(dispatcher): State<Arc<Dispatcher>>,
    UrlQuery(params): UrlQuery<KeyParams>,
) -> Response {
    let result = dispatcher.dispatch(Query::select(params.key.clone()));
    encode_response(&params.key, result)
}

async fn handle_insert(
    State(dispatcher): State<Arc<Dispatcher>>,
    UrlQuery(params): UrlQuery<KeyParams>,
    body: Bytes,
) -> Response {
    let result = dispatcher.dispatch(Query::insert(params.key.clone(), body.to_vec()));
    encode_response(&params.key, result)
}

async fn handle_delete(
    State(dispatcher): State<Arc<Dispatcher>>,
    UrlQuery(params): UrlQuery<KeyParams>,
) -> Response {
    let result = dispatcher.dispatch(Query::delete(params.key.clone()));
    encode_response(&params.key, result)
}

pub fn status_code(status: Status) -> StatusCode {
    match status {
        Status::Ok => StatusCode::OK,
        Status::Created => StatusCode::CREATED,
        Status::BadRequest => StatusCode::BAD_REQUEST,
        Status::NotFound => StatusCode::NOT_FOUND,
        Status::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn encode_response(key: &str, result: QueryResult) -> Response {
    debug!("http {} -> {:?} in {}", key, result.status, result.duration);

    let mut headers = HeaderMap::new();
    // Durations contain `µ`, which is valid header text but not visible ASCII.
    for (name, value) in [(HEADER_DURATION, result.duration.as_str()), (HEADER_KEY, key)] {
        if value.is_empty() {
            continue;
        }
        if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }

    (status_code(result.status), headers, result.value).into_response()
}
