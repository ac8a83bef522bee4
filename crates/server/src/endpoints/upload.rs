//! # /signatures/upload/
//!
//! シグネチャの投入。`/signatures/upload/{link_id}/` は既存リンクの新バージョン。

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::{Extension, Form, Json};

use super::form_data;
use crate::auth::RequestContext;
use crate::config::AppState;
use crate::error::ServerError;
use crate::forms::{FormData, UploadSignatureForm};
use crate::service::NewSignature;
use crate::urls;

/// 投入エンドポイントの非POST時の文言（末尾のピリオドを含む）
pub const EXPECTED_POST_UPLOAD: &str = "Expected POST.";

/// POST — 新規シグネチャを投入する。
pub async fn handle_upload_signature(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    upload(&state, &ctx, None, method, form).await
}

/// POST — 既存リンクに新バージョンを投入する。
pub async fn handle_upload_new_version(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(link_id): Path<String>,
    method: Method,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    upload(&state, &ctx, Some(link_id), method, form).await
}

async fn upload(
    state: &AppState,
    ctx: &RequestContext,
    link_id: Option<String>,
    method: Method,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if method != Method::POST {
        return Err(ServerError::bad_request(EXPECTED_POST_UPLOAD));
    }

    let data_types = state.service.signature_type_names().await;
    let form = UploadSignatureForm::new(&ctx.sources, &data_types, form_data(form));
    let fields = match form.clean() {
        Ok(fields) => fields,
        Err(invalid) => {
            return Ok(Json(serde_json::json!({
                "success": false,
                "form": invalid.as_table(),
            })));
        }
    };

    let status = state
        .service
        .handle_signature_file(NewSignature {
            data: fields.data,
            source: fields.source,
            analyst: ctx.username.clone(),
            description: fields.description,
            title: fields.title,
            data_type: fields.data_type,
            link_id,
            method: fields.method,
            reference: fields.reference,
            copy_rels: fields.copy_relationships,
            bucket_list: fields.bucket_list,
            ticket: fields.ticket,
        })
        .await;

    if !status.success {
        return Ok(Json(serde_json::json!({
            "success": false,
            "message": status.message,
        })));
    }

    let id = status
        .id
        .ok_or_else(|| ServerError::Internal("投入結果に_idが含まれていません".to_string()))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!(
            "signature uploaded successfully! <a href=\"{}\">View signature</a>",
            urls::detail_path(&id)
        ),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crits_types::UploadStatus;

    use crate::endpoints::test_helpers::{analyst_ctx, form, stub_state, StubService};

    fn valid_form() -> Result<Form<FormData>, FormRejection> {
        form(&[
            ("title", "Emotet loader"),
            ("data_type", "Yara"),
            ("data", "rule emotet { condition: true }"),
            ("source", "ACME"),
            ("bucket_list", "emotet,loader"),
            ("ticket", "T-42"),
            ("copy_relationships", "on"),
        ])
    }

    /// スタブが `{"success": true, "_id": "X"}` を返すとき、Xへのリンクを含む成功JSONになることを確認
    #[tokio::test]
    async fn test_success_links_to_new_id() {
        let stub = StubService::default();
        let last = stub.last_upload.clone();
        let Json(body) = upload(
            &stub_state(stub),
            &analyst_ctx(),
            Some("link-9".to_string()),
            Method::POST,
            valid_form(),
        )
        .await
        .unwrap();

        assert_eq!(body["success"], true);
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("<a href=\"/signatures/details/X/\">"), "{message}");

        let new = last.lock().unwrap().clone().unwrap();
        assert_eq!(new.analyst, "alice");
        assert_eq!(new.link_id.as_deref(), Some("link-9"));
        assert_eq!(new.method, "Upload");
        assert_eq!(new.bucket_list, vec!["emotet", "loader"]);
        assert_eq!(new.ticket.as_deref(), Some("T-42"));
        assert!(new.copy_rels);
    }

    /// ハンドラ層の失敗メッセージがそのままmessageに入ることを確認
    #[tokio::test]
    async fn test_failure_message_is_verbatim() {
        let stub = StubService {
            upload_status: Some(UploadStatus {
                success: false,
                id: None,
                message: "No signature found for link id <x>".to_string(),
            }),
            ..Default::default()
        };
        let Json(body) = upload(&stub_state(stub), &analyst_ctx(), None, Method::POST, valid_form())
            .await
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "No signature found for link id <x>",
            })
        );
    }

    /// フォーム不正時はハンドラ層を呼ばず、フォームのHTMLを返すことを確認
    #[tokio::test]
    async fn test_invalid_form_returns_rendered_form() {
        let stub = StubService::default();
        let last = stub.last_upload.clone();
        let Json(body) = upload(
            &stub_state(stub),
            &analyst_ctx(),
            None,
            Method::POST,
            // ユーザーに許可されていないソース
            form(&[("title", "t"), ("data_type", "Yara"), ("data", "d"), ("source", "Other")]),
        )
        .await
        .unwrap();

        assert_eq!(body["success"], false);
        let table = body["form"].as_str().unwrap();
        assert!(table.contains("Other is not one of the available choices."));
        assert!(last.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_is_rejected() {
        let stub = StubService::default();
        let calls = stub.calls.clone();
        let result = handle_upload_signature(
            State(stub_state(stub)),
            Extension(analyst_ctx()),
            Method::GET,
            valid_form(),
        )
        .await;
        match result {
            Err(ServerError::BadRequest(m)) => assert_eq!(m, "Expected POST."),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
