//! # シグネチャ種別の管理補助
//!
//! - `/signatures/add_data_type/` — 種別追加
//! - `/signatures/get_data_type_dropdown/` — 種別ドロップダウン
//!
//! いずれもAJAX POSTのみ受け付ける。

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::{Extension, Form, Json};
use crits_types::TypeDropdownResponse;

use super::{form_data, is_ajax, EXPECTED_AJAX_POST};
use crate::auth::RequestContext;
use crate::config::AppState;
use crate::error::ServerError;
use crate::forms::{FormData, NewSignatureTypeForm};

fn require_ajax_post(method: &Method, headers: &HeaderMap) -> Result<(), ServerError> {
    if *method == Method::POST && is_ajax(headers) {
        Ok(())
    } else {
        Err(ServerError::bad_request(EXPECTED_AJAX_POST))
    }
}

/// AJAX POST — 種別を追加する。フォーム不正時は `{"form": ...}` のみを返す。
pub async fn handle_new_signature_type(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    headers: HeaderMap,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    require_ajax_post(&method, &headers)?;

    let name = match NewSignatureTypeForm::new(form_data(form)).clean() {
        Ok(name) => name,
        Err(invalid) => return Ok(Json(serde_json::json!({ "form": invalid.as_table() }))),
    };

    let body = if state
        .service
        .add_new_signature_type(&name, &ctx.username)
        .await
    {
        serde_json::json!({
            "message": "<div>Signature Type added successfully!</div>",
            "success": true,
        })
    } else {
        serde_json::json!({
            "message": "<div>Signature Type addition failed!</div>",
            "success": false,
        })
    };
    Ok(Json(body))
}

/// AJAX POST — 有効な種別名の一覧を返す。
pub async fn handle_signature_type_dropdown(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Json<TypeDropdownResponse>, ServerError> {
    require_ajax_post(&method, &headers)?;
    Ok(Json(TypeDropdownResponse {
        data: state.service.signature_type_names().await,
    }))
}
