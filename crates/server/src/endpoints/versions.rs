//! # /signatures/get_versions/{id}/
//!
//! バージョン履歴の取得。AJAX POSTを想定。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::Json;
use crits_types::VersionEntry;

use super::EXPECTED_POST;
use crate::config::AppState;
use crate::error::ServerError;

/// POST — 同一リンクの全バージョンを昇順のJSON配列で返す。
pub async fn handle_get_signature_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    method: Method,
) -> Result<Json<Vec<VersionEntry>>, ServerError> {
    if method != Method::POST {
        return Err(ServerError::bad_request(EXPECTED_POST));
    }
    Ok(Json(state.service.generate_signature_versions(&id).await))
}
