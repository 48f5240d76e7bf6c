#![allow(dead_code)]

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use sample_datasource::{
    client::HttpSampleClient,
    models::{QueryRequest, QuerySpec, TimeRange},
    resolver::Resolver,
    template::ScopedVarTemplateSrv,
    DataSource,
};

/// Requests seen by the fake sample service: decoded system id and raw query string.
#[derive(Clone, Default)]
pub struct Recorded {
    pub requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl Recorded {
    pub fn all(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn samples(
    State(recorded): State<Recorded>,
    Path(system_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    recorded
        .requests
        .lock()
        .unwrap()
        .push((system_id.clone(), query.unwrap_or_default()));

    match system_id.as_str() {
        "empty" => (StatusCode::OK, "").into_response(),
        "null" => (StatusCode::OK, "null").into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "garbled" => (StatusCode::OK, r#"{"oops": true}"#).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(80)).await;
            Json(json!([{"timestamp": 100, "value": 1.0}])).into_response()
        }
        "hourly" => Json(json!([
            {"device": "d", "stream": "temp", "timestamp": "2024-01-01T00:00:00Z", "average": 2.0, "min": 1.0, "max": 3.0, "count": 4},
            {"device": "d", "stream": "temp", "timestamp": "2024-01-01T01:00:00Z", "average": 5.0, "min": 4.0, "max": 6.0, "count": 4}
        ]))
        .into_response(),
        _ => Json(json!([
            {"timestamp": 1, "value": 10.0},
            {"timestamp": 2, "value": 20.0}
        ]))
        .into_response(),
    }
}

/// Starts the fake sample service on an ephemeral port and returns its base URL.
pub async fn spawn_sample_service() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/system/:system_id/sample", get(samples))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn datasource(base_url: &str, max_concurrent_fetches: Option<usize>) -> DataSource {
    let resolver = Resolver::new(base_url, Arc::new(ScopedVarTemplateSrv)).unwrap();
    let client = HttpSampleClient::new(resolver.base_url().clone(), Duration::from_secs(5)).unwrap();
    DataSource::new(resolver, Arc::new(client), max_concurrent_fetches)
}

pub fn query_request(targets: Vec<QuerySpec>, vars: &[(&str, &str)]) -> QueryRequest {
    QueryRequest {
        range: TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap(),
        scoped_vars: vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        targets,
    }
}
