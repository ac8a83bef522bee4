//! # /signatures/list/
//!
//! 一覧とエクスポート。`/signatures/list/{option}/` でオプションを指定する。
//!
//! | option | 内容 |
//! |---|---|
//! | なし / `list` | 一覧ページ |
//! | `inline` | 一覧テーブルの断片 |
//! | `jtlist` | jTable形式のページングJSON |
//! | `jtdelete` | jTableからの削除（POST、管理者のみ） |
//! | `csv` | CSVエクスポート |

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form, Json};
use crits_types::{JtableListResponse, JtableResult, Signature, SignatureRecord};

use super::{form_data, EXPECTED_POST};
use crate::auth::RequestContext;
use crate::config::AppState;
use crate::error::ServerError;
use crate::forms::FormData;
use crate::render;
use crate::service::{ListQuery, SortField};
use crate::urls;

/// jTable 1ページの最大件数
const MAX_PAGE_SIZE: usize = 100;

/// CSVの列
const CSV_HEADER: [&str; 13] = [
    "id",
    "title",
    "data_type",
    "version",
    "link_id",
    "sha256",
    "description",
    "sources",
    "bucket_list",
    "status",
    "analyst",
    "created",
    "modified",
];

/// オプションなしの一覧ページ。
pub async fn handle_listing(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Response, ServerError> {
    listing(&state, &ctx, None, method, params, form).await
}

/// オプション付きの一覧。
pub async fn handle_listing_option(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(option): Path<String>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Response, ServerError> {
    listing(&state, &ctx, Some(&option), method, params, form).await
}

async fn listing(
    state: &AppState,
    ctx: &RequestContext,
    option: Option<&str>,
    method: Method,
    params: HashMap<String, String>,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<Response, ServerError> {
    match option {
        Some("csv") => export_csv(state).await,
        None | Some("list") => {
            let page = state.service.list_signatures(&list_query(&params)).await;
            Ok(Html(render::listing_page(&page)).into_response())
        }
        Some("inline") => {
            let page = state.service.list_signatures(&list_query(&params)).await;
            Ok(Html(render::listing_table(&page)).into_response())
        }
        Some("jtlist") => {
            let page = state.service.list_signatures(&list_query(&params)).await;
            Ok(Json(JtableListResponse {
                result: "OK".to_string(),
                records: page.signatures.iter().map(record).collect(),
                total_record_count: page.total,
            })
            .into_response())
        }
        Some("jtdelete") => {
            if method != Method::POST {
                return Err(ServerError::bad_request(EXPECTED_POST));
            }
            Ok(Json(jtable_delete(state, ctx, form_data(form)).await).into_response())
        }
        Some(other) => {
            tracing::debug!(option = %other, "不明な一覧オプション");
            Err(ServerError::bad_request("Invalid listing option"))
        }
    }
}

/// jTableのクエリパラメータを解釈する。不正値は既定値に倒す。
fn list_query(params: &HashMap<String, String>) -> ListQuery {
    let defaults = ListQuery::default();

    let start = params
        .get("jtStartIndex")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.start);
    let page_size = params
        .get("jtPageSize")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(defaults.page_size)
        .clamp(1, MAX_PAGE_SIZE);

    let (sort, descending) = params
        .get("jtSorting")
        .and_then(|raw| {
            let mut parts = raw.split_whitespace();
            let field = SortField::parse(parts.next()?)?;
            let descending = match parts.next() {
                None => false,
                Some(dir) if dir.eq_ignore_ascii_case("ASC") => false,
                Some(dir) if dir.eq_ignore_ascii_case("DESC") => true,
                Some(_) => return None,
            };
            Some((field, descending))
        })
        .unwrap_or((defaults.sort, defaults.descending));

    let search = params
        .get("q")
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    ListQuery {
        start,
        page_size,
        sort,
        descending,
        search,
    }
}

fn record(sig: &Signature) -> SignatureRecord {
    SignatureRecord {
        id: sig.id.clone(),
        title: sig.title.clone(),
        data_type: sig.data_type.clone(),
        version: sig.version,
        link_id: sig.link_id.clone(),
        description: sig.description.clone(),
        modified: sig.modified,
        details: urls::detail_path(&sig.id),
    }
}

async fn jtable_delete(state: &AppState, ctx: &RequestContext, form: FormData) -> JtableResult {
    if !ctx.is_admin() {
        tracing::warn!(user = %ctx.username, "jtdelete拒否: 管理者権限が必要です");
        return jtable_error("Permission denied");
    }
    let Some(id) = form.get("id").map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return jtable_error("Missing id");
    };

    if state.service.delete_signature(id, &ctx.username).await {
        JtableResult {
            result: "OK".to_string(),
            message: None,
        }
    } else {
        jtable_error("Could not delete signature")
    }
}

fn jtable_error(message: &str) -> JtableResult {
    JtableResult {
        result: "ERROR".to_string(),
        message: Some(message.to_string()),
    }
}

async fn export_csv(state: &AppState) -> Result<Response, ServerError> {
    let signatures = state.service.all_signatures().await;
    let bytes = signatures_csv(&signatures)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"signatures.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

fn signatures_csv(signatures: &[Signature]) -> Result<Vec<u8>, ServerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ServerError::Internal(format!("CSV書き込み失敗: {e}")))?;

    for sig in signatures {
        let sources = sig
            .sources
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        writer
            .write_record([
                sig.id.clone(),
                sig.title.clone(),
                sig.data_type.clone(),
                sig.version.to_string(),
                sig.link_id.clone(),
                sig.sha256.clone(),
                sig.description.clone(),
                sources,
                sig.bucket_list.join(";"),
                sig.status.clone(),
                sig.analyst.clone(),
                sig.created.to_string(),
                sig.modified.to_string(),
            ])
            .map_err(|e| ServerError::Internal(format!("CSV書き込み失敗: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| ServerError::Internal(format!("CSVフラッシュ失敗: {e}")))
}
