//! # シグネチャエンドポイント
//!
//! 各ハンドラは権限ガード通過後に呼ばれ、HTTPメソッド・AJAXヘッダで分岐し、
//! フォーム検証の後ハンドラ層へ委譲する。

pub mod data_type;
pub mod detail;
pub mod listing;
pub mod remove;
pub mod set_type;
pub mod upload;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_helpers;


pub use data_type::{handle_new_signature_type, handle_signature_type_dropdown};
pub use detail::{handle_details_by_link, handle_signature_detail};
pub use listing::{handle_listing, handle_listing_option};
pub use remove::handle_remove_signature;
pub use set_type::handle_set_signature_type;
pub use upload::{handle_upload_new_version, handle_upload_signature};
pub use versions::handle_get_signature_versions;

use axum::extract::rejection::FormRejection;
use axum::http::HeaderMap;
use axum::Form;

use crate::forms::FormData;

/// POST限定エンドポイントへの非POSTリクエスト
pub const EXPECTED_POST: &str = "Expected POST";
/// AJAX POST限定エンドポイントへの不正リクエスト
pub const EXPECTED_AJAX_POST: &str = "Expected AJAX POST";

/// `X-Requested-With: XMLHttpRequest` が付いているかどうか。
pub(crate) fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest")
}

/// 読み取れないフォーム本文は空のフォームとして扱う。
pub(crate) fn form_data(form: Result<Form<FormData>, FormRejection>) -> FormData {
    match form {
        Ok(Form(data)) => data,
        Err(e) => {
            tracing::debug!(error = %e, "フォーム本文を読み取れません。空として扱います");
            FormData::new()
        }
    }
}
