//! The HTTP surface of the store.
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /table` | [`TableStore::create`] |
//! | `GET /table` | [`TableStore::list`] |
//! | `GET /table/{id}` | [`TableStore::get`] |
//! | `PATCH /table/{id}` | [`TableStore::patch`] |
//! | `DELETE /table/{id}` | [`TableStore::delete`] |
//!
//! Failures are answered with a JSON `{"message": ...}` body.
//!
//! Store operations lock the table set and write the snapshot file, so the
//! handlers run them on the blocking thread pool.

use std::{future::Future, io, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, instrument, warn};

use crate::{error::StoreError, record::TableRecord, schema, store::TableStore};

type SharedStore = Arc<TableStore>;

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/table", post(create_table).get(list_tables))
        .route(
            "/table/{id}",
            get(get_table).patch(patch_table).delete(delete_table),
        )
        .with_state(store)
}

/// Serve the store on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    store: SharedStore,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Persist(_) | StoreError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, "Error: {}", self);
        } else {
            warn!(%status, "Error: {}", self);
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Run `operation` against the store off the async worker threads.
async fn blocking<T, F>(store: SharedStore, operation: F) -> Result<T, StoreError>
where
    F: FnOnce(&TableStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(&store)).await?
}

#[instrument(name = "POST /table", skip_all)]
async fn create_table(
    State(store): State<SharedStore>,
    body: Bytes,
) -> Result<Json<TableRecord>, StoreError> {
    let body = schema::parse_body(&body)?;
    blocking(store, move |store| store.create(&body)).await.map(Json)
}

#[instrument(name = "GET /table", skip_all)]
async fn list_tables(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<TableRecord>>, StoreError> {
    blocking(store, |store| Ok(store.list())).await.map(Json)
}

#[instrument(name = "GET /table/{id}", skip(store))]
async fn get_table(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<TableRecord>, StoreError> {
    blocking(store, move |store| store.get(&id)).await.map(Json)
}

#[instrument(name = "PATCH /table/{id}", skip(store, body))]
async fn patch_table(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TableRecord>, StoreError> {
    let body = schema::parse_body(&body)?;
    blocking(store, move |store| store.patch(&id, &body)).await.map(Json)
}

#[instrument(name = "DELETE /table/{id}", skip(store))]
async fn delete_table(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<TableRecord>, StoreError> {
    blocking(store, move |store| store.delete(&id)).await.map(Json)
}
