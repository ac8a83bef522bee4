//! # CRITs Signatures サーバー
//!
//! シグネチャ（検知ルール）管理のHTTPコントローラ。
//!
//! ## 処理の流れ
//! `authenticate → 権限ガード → メソッド/AJAX分岐 → フォーム検証 → SignatureService → 応答`
//!
//! ## API エンドポイント
//! - `/signatures/list/`, `/signatures/list/{option}/` — 一覧・CSV・jTable
//! - `POST /signatures/set_signature_type/{id}/` — 種別変更
//! - `POST /signatures/get_versions/{id}/` — バージョン履歴
//! - `/signatures/details/{id}/` — 詳細
//! - `/signatures/details_by_link/{link}/?version=N` — リンク+バージョン指定の詳細
//! - `POST /signatures/upload/`, `POST /signatures/upload/{link_id}/` — 投入
//! - `/signatures/remove/{id}` — 削除（管理者）
//! - `AJAX POST /signatures/add_data_type/` — 種別追加
//! - `AJAX POST /signatures/get_data_type_dropdown/` — 種別一覧

mod auth;
mod config;
mod endpoints;
mod error;
mod forms;
mod render;
mod service;
mod urls;

use std::sync::Arc;

use axum::middleware;
use axum::routing::any;
use axum::Router;

use crate::auth::{authenticate, require_admin, require_view_data};
use crate::config::{AppState, ServerConfig};
use crate::endpoints::*;
use crate::service::{MemorySignatureService, SignatureService};

/// ルーターを構築する。
///
/// 閲覧権限ルートと管理者ルートはそれぞれroute_layerでガードし、
/// 全体に `authenticate` を掛ける。
pub fn build_router(state: Arc<AppState>) -> Router {
    let view_data = Router::new()
        .route("/signatures/list/", any(handle_listing))
        .route("/signatures/list/{option}/", any(handle_listing_option))
        .route(
            "/signatures/set_signature_type/{id}/",
            any(handle_set_signature_type),
        )
        .route(
            "/signatures/get_versions/{id}/",
            any(handle_get_signature_versions),
        )
        .route("/signatures/details/{id}/", any(handle_signature_detail))
        .route(
            "/signatures/details_by_link/{link}/",
            any(handle_details_by_link),
        )
        .route("/signatures/upload/", any(handle_upload_signature))
        .route("/signatures/upload/{link_id}/", any(handle_upload_new_version))
        .route("/signatures/add_data_type/", any(handle_new_signature_type))
        .route(
            "/signatures/get_data_type_dropdown/",
            any(handle_signature_type_dropdown),
        )
        .route_layer(middleware::from_fn(require_view_data));

    let admin = Router::new()
        .route("/signatures/remove/{id}", any(handle_remove_signature))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(view_data)
        .merge(admin)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let users = config.load_users()?;
    tracing::info!(accounts = users.len(), "ユーザーディレクトリを構築しました");

    // ハンドラ層（スナップショット指定時は永続化あり）
    let service: Box<dyn SignatureService> = match &config.data_path {
        Some(path) => Box::new(MemorySignatureService::open(path, &config.signature_types)?),
        None => {
            tracing::warn!("CRITS_DATA_PATHが未設定です。データはメモリ内にのみ保持されます");
            Box::new(MemorySignatureService::new(&config.signature_types))
        }
    };

    let state = Arc::new(AppState { service, users });
    let app = build_router(state);

    tracing::info!("CRITs Signaturesサーバーを {} で起動します", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
