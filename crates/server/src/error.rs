//! # サーバーエラー型
//!
//! 全エンドポイントで共通のエラー型。
//! 業務上の失敗（ハンドラ層が返す `success: false`）はここに含めず、JSONで返す。

use axum::http::StatusCode;
use axum::response::Html;

use crate::render;

/// サーバーエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// 認証情報なし・不明なAPIキー
    #[error("Authentication required")]
    Unauthorized,
    /// 権限不足
    #[error("Permission denied")]
    Forbidden,
    /// プロトコル誤用（メソッド違い、AJAXヘッダなし、不正なオプション）
    #[error("{0}")]
    BadRequest(String),
    /// スナップショット保存等のストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl ServerError {
    /// "Expected POST" 等の固定エラーページ用。
    pub fn bad_request(message: &str) -> Self {
        ServerError::BadRequest(message.to_string())
    }
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Storage(_) | ServerError::Internal(_) => {
                tracing::error!(error = %self, "リクエスト処理に失敗");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Html(render::error_page(&self.to_string()))).into_response()
    }
}
