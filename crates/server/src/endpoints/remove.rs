//! # /signatures/remove/{id}
//!
//! 管理者のみ。削除後は一覧へリダイレクトする。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Extension;

use crate::auth::RequestContext;
use crate::config::AppState;
use crate::render;
use crate::urls;

/// 文書を削除する。
pub async fn handle_remove_signature(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    if state.service.delete_signature(&id, &ctx.username).await {
        Redirect::to(urls::LISTING_PATH).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Html(render::error_page("Could not delete signature")),
        )
            .into_response()
    }
}
