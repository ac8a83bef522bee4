//! # URL組み立て
//!
//! ルート定義（`main.rs`）とリンク生成で同じパスを使うためのヘルパー。

/// シグネチャ一覧ページ
pub const LISTING_PATH: &str = "/signatures/list/";

/// 詳細ページのパス
pub fn detail_path(id: &str) -> String {
    format!("/signatures/details/{id}/")
}

/// 削除のパス
pub fn remove_path(id: &str) -> String {
    format!("/signatures/remove/{id}")
}
