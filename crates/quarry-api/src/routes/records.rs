//! Record lookup routes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use quarry_core::LookupResult;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Response header carrying the snapshot key a record came from.
pub const SNAPSHOT_KEY_HEADER: &str = "x-snapshot-key";
/// Response header carrying the lookup outcome.
pub const LOOKUP_HEADER: &str = "x-lookup";

#[derive(Debug, Deserialize)]
pub(crate) struct RecordParams {
    /// Identifier to look up. Empty is treated as absent.
    pub id: Option<String>,
}

/// Creates record routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_record))
        .route("/records", get(get_record))
}

/// Returns one record from the current snapshot.
///
/// GET /records?id=<id>
///
/// With an `id`, returns the matching record; an unmatched id follows the
/// configured miss policy. Without one, returns a random record.
pub(crate) async fn get_record(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordParams>,
) -> ApiResult<Response> {
    let id = params.id.as_deref().filter(|id| !id.is_empty());

    let outcome = state.query.execute(id).await?;
    let label = outcome.result.label();

    let record = match outcome.result {
        LookupResult::Found(r) | LookupResult::Random(r) | LookupResult::FellBackToRandom(r) => r,
        LookupResult::NotFound => {
            return Err(ApiError::record_not_found(id.unwrap_or_default()));
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(outcome.key.as_str()) {
        headers.insert(HeaderName::from_static(SNAPSHOT_KEY_HEADER), value);
    }
    headers.insert(
        HeaderName::from_static(LOOKUP_HEADER),
        HeaderValue::from_static(label),
    );

    Ok((headers, Json(record)).into_response())
}
