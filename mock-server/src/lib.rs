use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MAX_DELAY_SECS: u64 = 10;

/// What the server saw of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub url: String,
    pub args: BTreeMap<String, String>,
    pub form: BTreeMap<String, String>,
    pub data: String,
    /// Lower-case header names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct RedirectTarget {
    pub url: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/get", get(echo))
        .route("/post", post(echo))
        .route("/put", put(echo))
        .route("/patch", patch(echo))
        .route("/delete", delete(echo))
        .route("/anything", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{secs}", get(delay))
        .route("/uuid", get(uuid))
        .route("/redirect-to", get(redirect_to))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

/// Decodes `a=1&b=2`; malformed input yields an empty map, a repeated name
/// keeps its last value.
pub fn decode_pairs(input: &str) -> BTreeMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(input)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
    let data = String::from_utf8_lossy(&body).into_owned();
    debug!(%method, %uri, bytes = body.len(), "echo");

    Json(Echo {
        method: method.to_string(),
        url: format!("http://{host}{uri}"),
        args: uri.query().map(decode_pairs).unwrap_or_default(),
        form: if is_form { decode_pairs(&data) } else { BTreeMap::new() },
        data,
        headers: collect_headers(&headers),
    })
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}

async fn delay(Path(secs): Path<u64>) -> Json<serde_json::Value> {
    let secs = secs.min(MAX_DELAY_SECS);
    tokio::time::sleep(Duration::from_secs(secs)).await;
    Json(json!({ "delay": secs }))
}

async fn uuid() -> Json<serde_json::Value> {
    Json(json!({ "uuid": Uuid::new_v4() }))
}

async fn redirect_to(Query(target): Query<RedirectTarget>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, target.url)]).into_response()
}
