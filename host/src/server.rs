//! ==============================================================================
//! server.rs - ingestion and export api
//! ==============================================================================
//!
//! routes:
//!     POST /data        append a batch, reply {"status": "success"}
//!     GET  /export      csv attachment of the current snapshot
//!     GET  /api         store summary (counts, latest record)
//!     GET  /api/charts  latest frame produced by the refresh loop
//!
//! relationships:
//!     - writes: ingest.rs -> store.rs
//!     - reads: store.rs (snapshot), refresh.rs (DashboardFeed)
//!
//! ==============================================================================

use crate::domain::{Batch, Channel};
use crate::error::HubError;
use crate::export;
use crate::ingest::{self, Ack};
use crate::refresh::{ChartFrame, DashboardFeed};
use crate::store::{Record, SharedStore};

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tower_http::cors::CorsLayer;

/// handles shared by every route
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub feed: DashboardFeed,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/data", post(ingest_handler))
        .route("/export", get(export_handler))
        .route("/api", get(api_handler))
        .route("/api/charts", get(charts_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {}", self);
        let body = serde_json::json!({"status": "error", "message": self.to_string()});
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// ingestion endpoint
/// POST /data with a json object of channel -> value
async fn ingest_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Map<String, serde_json::Value>>,
) -> (StatusCode, Json<Ack>) {
    let batch = Batch::from_json(&body);
    let ack = ingest::ingest(&state.store, batch).await;
    (StatusCode::OK, Json(ack))
}

/// bulk export as a downloadable csv
async fn export_handler(State(state): State<AppState>) -> Result<Response, HubError> {
    let snapshot = state.store.snapshot().await;
    let body = export::to_csv(&snapshot)?;
    tracing::info!(records = snapshot.records.len(), "exported snapshot");

    let disposition = format!("attachment; filename=\"{}\"", export::EXPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, export::EXPORT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[derive(Serialize)]
struct ApiSummary {
    records: usize,
    total_ingested: u64,
    channels: BTreeMap<Channel, usize>,
    latest: Option<Record>,
}

/// json api endpoint for programmatic access
async fn api_handler(State(state): State<AppState>) -> Json<ApiSummary> {
    let snapshot = state.store.snapshot().await;
    let summary = ApiSummary {
        records: snapshot.records.len(),
        total_ingested: snapshot.total_ingested,
        channels: snapshot.channel_lengths(),
        latest: snapshot.latest().cloned(),
    };
    Json(summary)
}

async fn charts_handler(State(state): State<AppState>) -> Json<ChartFrame> {
    Json(state.feed.latest().await)
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reading;
    use crate::refresh::SnapshotSink;
    use crate::transport::{BatchSink, HttpSink};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState { store: SharedStore::default(), feed: DashboardFeed::new() }
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_post_partial_batch_grows_only_its_channels() {
        let state = state();
        let app = router(state.clone());

        let response = app
            .oneshot(post_json(r#"{"time": "2024-01-01 00:00:00", "temperature": 21.0}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, serde_json::json!({"status": "success"}));

        let snapshot = state.store.snapshot().await;
        assert_eq!(snapshot.len(Channel::Temperature), 1);
        assert_eq!(snapshot.values(Channel::Temperature).last(), Some(&21.0));
        assert_eq!(snapshot.len(Channel::Tilt), 0);
    }

    #[tokio::test]
    async fn test_known_channels_keep_non_numeric_values() {
        let state = state();
        let app = router(state.clone());

        for body in [r#"{"fire": true}"#, r#"{"shock": "high"}"#, r#"{"tilt": null}"#] {
            let response = app.clone().oneshot(post_json(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let snapshot = state.store.snapshot().await;
        assert_eq!(snapshot.records.len(), 3);
        assert_eq!(snapshot.len(Channel::Fire), 1);
        assert_eq!(snapshot.len(Channel::Shock), 1);
        assert_eq!(snapshot.len(Channel::Tilt), 1);
        // charts only plot numbers
        assert!(snapshot.points(Channel::Shock).is_empty());

        let text = String::from_utf8(body_bytes(app.oneshot(get_request("/export")).await.unwrap()).await).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[1], ",,,,true,,,");
        assert_eq!(rows[2], ",,,,,high,,");
        assert_eq!(rows[3], ",null,,,,,,");
    }

    #[tokio::test]
    async fn test_unknown_channels_are_ignored() {
        let state = state();
        state
            .store
            .append(Batch::new().with(Channel::Humidity, Reading::Value(50.0)))
            .await;

        let response = router(state.clone())
            .oneshot(post_json(r#"{"pressure": 1013.0, "co2": 400}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = state.store.snapshot().await;
        assert_eq!(snapshot.values(Channel::Humidity), vec![50.0]);
        assert_eq!(snapshot.records.len(), 1);
    }

    #[tokio::test]
    async fn test_non_object_body_is_rejected_by_extractor() {
        let state = state();
        let response = router(state.clone()).oneshot(post_json("[1, 2, 3]")).await.unwrap();

        assert!(response.status().is_client_error());
        assert!(state.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_returns_csv_attachment() {
        let state = state();
        let app = router(state.clone());
        app.clone()
            .oneshot(post_json(r#"{"time": "2024-01-01 00:00:00", "tilt": 45.0, "sound": 0.2}"#))
            .await
            .unwrap();

        let response = app.oneshot(get_request("/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("sensor_data.csv"));

        let text = String::from_utf8(body_bytes(response).await).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], "time,tilt,temperature,humidity,fire,shock,vibration,sound");
        assert_eq!(rows[1], "2024-01-01 00:00:00,45,,,,,,0.2");
    }

    #[tokio::test]
    async fn test_api_summary_reports_lengths() {
        let state = state();
        let app = router(state.clone());
        for body in [r#"{"tilt": 45.0, "fire": 0}"#, r#"{"tilt": 45.0}"#] {
            app.clone().oneshot(post_json(body)).await.unwrap();
        }

        let response = app.oneshot(get_request("/api")).await.unwrap();
        let summary: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();

        assert_eq!(summary["records"], 2);
        assert_eq!(summary["channels"]["tilt"], 2);
        assert_eq!(summary["channels"]["fire"], 1);
        assert_eq!(summary["channels"]["time"], 0);
        assert_eq!(summary["latest"]["readings"]["tilt"], 45.0);
    }

    #[tokio::test]
    async fn test_charts_serve_latest_frame() {
        let state = state();
        state
            .store
            .append(Batch::new().with(Channel::Vibration, Reading::Value(5.0)))
            .await;
        state.feed.present(state.store.snapshot().await).await;

        let response = router(state).oneshot(get_request("/api/charts")).await.unwrap();
        let frame: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();

        assert_eq!(frame["frame"], 1);
        assert_eq!(frame["charts"]["vibration"][0]["value"], 5.0);
    }

    #[tokio::test]
    async fn test_http_sink_posts_to_live_server() {
        let state = state();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_server(listener, state.clone()));

        let sink = HttpSink::new(format!("http://{}/data", addr), Duration::from_secs(5)).unwrap();
        let batch = Batch::new()
            .with(Channel::Time, Reading::Timestamp("2024-01-01 00:00:00".into()))
            .with(Channel::Shock, Reading::Value(5.0));

        let ack = sink.send(batch).await.unwrap();

        assert_eq!(ack, Ack::success());
        assert_eq!(state.store.snapshot().await.values(Channel::Shock), vec![5.0]);
    }
}
