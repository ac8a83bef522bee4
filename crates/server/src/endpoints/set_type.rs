//! # /signatures/set_signature_type/{id}/
//!
//! シグネチャ種別の変更。AJAX POSTを想定。

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::{Extension, Form, Json};
use crits_types::JsonStatus;

use super::{form_data, EXPECTED_POST};
use crate::auth::RequestContext;
use crate::config::AppState;
use crate::error::ServerError;
use crate::forms::FormData;

/// POST — `data_type` フィールドの種別に変更し、ハンドラ層の結果をそのままJSONで返す。
pub async fn handle_set_signature_type(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    method: Method,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Json<JsonStatus>, ServerError> {
    if method != Method::POST {
        return Err(ServerError::bad_request(EXPECTED_POST));
    }

    let form = form_data(form);
    let Some(data_type) = form.get("data_type") else {
        return Ok(Json(JsonStatus::failure("Missing data_type")));
    };

    let status = state
        .service
        .update_signature_type(&id, data_type, &ctx.username)
        .await;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::test_helpers::{analyst_ctx, form, stub_state, StubService};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_non_post_is_rejected_before_handler() {
        let stub = StubService::default();
        let calls = stub.calls.clone();
        let result = handle_set_signature_type(
            State(stub_state(stub)),
            Extension(analyst_ctx()),
            Path("sig-1".to_string()),
            Method::GET,
            form(&[("data_type", "Yara")]),
        )
        .await;

        match result {
            Err(ServerError::BadRequest(m)) => assert_eq!(m, "Expected POST"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// ハンドラ層の失敗メッセージがそのまま返ることを確認
    #[tokio::test]
    async fn test_handler_status_is_forwarded() {
        let stub = StubService {
            set_type_status: JsonStatus::failure("Invalid data type"),
            ..Default::default()
        };
        let Json(status) = handle_set_signature_type(
            State(stub_state(stub)),
            Extension(analyst_ctx()),
            Path("sig-1".to_string()),
            Method::POST,
            form(&[("data_type", "Sigma")]),
        )
        .await
        .unwrap();
        assert_eq!(status, JsonStatus::failure("Invalid data type"));
    }

    #[tokio::test]
    async fn test_missing_field() {
        let stub = StubService::default();
        let calls = stub.calls.clone();
        let Json(status) = handle_set_signature_type(
            State(stub_state(stub)),
            Extension(analyst_ctx()),
            Path("sig-1".to_string()),
            Method::POST,
            form(&[]),
        )
        .await
        .unwrap();
        assert_eq!(status, JsonStatus::failure("Missing data_type"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
