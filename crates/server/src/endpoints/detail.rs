//! # 詳細ページ
//!
//! - `/signatures/details/{id}/`
//! - `/signatures/details_by_link/{link}/?version=N`
//!
//! メソッドは問わない。
//!
//! 描画するテンプレート（詳細 or エラー）はハンドラ層が選ぶ。

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Extension;

use crate::auth::RequestContext;
use crate::config::AppState;
use crate::render;
use crate::service::DetailPage;

const NOT_FOUND: &str = "Signature not found";

/// IDで詳細ページを描画する。
pub async fn handle_signature_detail(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    render_detail(&state, &ctx, Some(id)).await
}

/// リンクIDとバージョン（既定1）から文書を解決して詳細ページを描画する。
pub async fn handle_details_by_link(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(link): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = match params.get("version") {
        None => state.service.get_id_from_link_and_version(&link, 1).await,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(version) => {
                state
                    .service
                    .get_id_from_link_and_version(&link, version)
                    .await
            }
            Err(_) => {
                tracing::debug!(link = %link, version = %raw, "バージョン指定を解釈できません");
                None
            }
        },
    };
    render_detail(&state, &ctx, id).await
}

async fn render_detail(state: &AppState, ctx: &RequestContext, id: Option<String>) -> Response {
    let page = match id {
        Some(id) => state.service.get_signature_details(&id, &ctx.username).await,
        None => DetailPage::Error(NOT_FOUND.to_string()),
    };

    match page {
        DetailPage::Found(detail) => Html(render::detail_page(&detail, ctx.is_admin())).into_response(),
        DetailPage::Error(message) => {
            (StatusCode::NOT_FOUND, Html(render::error_page(&message))).into_response()
        }
    }
}
