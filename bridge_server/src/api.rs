//! HTTP API over the snapshot store.
//!
//! Routes:
//! - `GET /api/v1/data/ohlc` — latest OHLC record, or 404 when none has arrived.
//! - `GET /api/v1/data/trades` — every trade record in arrival order, or 404 when empty.
//! - `GET /health` — liveness plus current store sizes.
//!
//! Handlers only read from the store and never see ingestion errors.

use crate::store::SnapshotStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bridge_common::{BridgeError, OhlcRecord, TradeRecord};
use log::{error, info};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Requested data has not been received yet.
    #[error("{0}")]
    NotFound(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        error!("{}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Assemble the API router around a shared store.
pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/api/v1/data/ohlc", get(latest_ohlc))
        .route("/api/v1/data/trades", get(all_trades))
        .route("/health", get(health))
        .with_state(store)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    store: Arc<SnapshotStore>,
    shutdown: F,
) -> Result<(), BridgeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HTTP API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Latest OHLC snapshot.
pub async fn latest_ohlc(
    State(store): State<Arc<SnapshotStore>>,
) -> Result<Json<OhlcRecord>, ApiError> {
    store
        .latest_ohlc()
        .map(Json)
        .ok_or(ApiError::NotFound("No OHLC data available"))
}

/// All trades seen so far.
pub async fn all_trades(
    State(store): State<Arc<SnapshotStore>>,
) -> Result<Json<Vec<TradeRecord>>, ApiError> {
    let trades = store.all_trades();
    if trades.is_empty() {
        return Err(ApiError::NotFound("No trades data available"));
    }
    Ok(Json(trades))
}

async fn health(State(store): State<Arc<SnapshotStore>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ohlc": store.len_ohlc(),
        "trades": store.len_trades(),
    }))
}
