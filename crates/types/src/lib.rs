//! # CRITs Signatures 共有型定義
//!
//! シグネチャ文書モデルと、HTTPレスポンスのJSONエンベロープを提供する。
//!
//! ## エンコーディング規則
//! - ID: UUID v4 の文字列表現（`id`, `link_id`）
//! - ハッシュ: 小文字16進数（SHA-256）
//! - 時刻: UNIXタイムスタンプ（秒）

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// シグネチャ文書
// ---------------------------------------------------------------------------

/// 保存された検知ルール（Snort, Yara等）の1バージョン。
///
/// 同一ルールの複数バージョンは `link_id` で束ねられ、`version` は1から単調増加する。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    /// 文書ID
    #[serde(rename = "_id")]
    pub id: String,
    /// バージョン群を束ねるリンクID
    pub link_id: String,
    /// リンク内のバージョン番号（1始まり）
    pub version: u32,
    /// タイトル
    pub title: String,
    /// 説明文
    #[serde(default)]
    pub description: String,
    /// ルール本文
    pub data: String,
    /// シグネチャ種別名（SignatureType.name）
    pub data_type: String,
    /// `data` のSHA-256（16進数）
    pub sha256: String,
    /// 入手元の一覧
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    /// バケットリスト（タグ）
    #[serde(default)]
    pub bucket_list: Vec<String>,
    /// 関連チケット番号
    #[serde(default)]
    pub tickets: Vec<String>,
    /// 他オブジェクトとの関連
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// 分析ステータス（初期値 "New"）
    pub status: String,
    /// 登録したアナリスト
    pub analyst: String,
    /// 作成時刻
    pub created: u64,
    /// 最終更新時刻
    pub modified: u64,
}

/// 入手元1件。同一ソースからの複数回の投入は `instances` に積まれる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceEntry {
    /// ソース名
    pub name: String,
    /// 投入履歴
    pub instances: Vec<SourceInstance>,
}

/// ソースからの投入1回分。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInstance {
    /// 入手方法（例: "Upload"）
    pub method: String,
    /// 参照情報（URL、レポート番号等）
    pub reference: String,
    /// 投入したアナリスト
    pub analyst: String,
    /// 投入時刻
    pub date: u64,
}

/// 他のCRITsオブジェクトとの関連。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    /// 相手オブジェクトの種別（例: "Indicator"）
    pub object_type: String,
    /// 相手オブジェクトのID
    pub object_id: String,
    /// 関連の種類（例: "Related To"）
    pub relationship: String,
}

/// シグネチャ種別。管理者操作で追加される名前付きカテゴリ。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureType {
    /// 種別名（一意）
    pub name: String,
    /// 選択肢として有効かどうか
    pub active: bool,
}

// ---------------------------------------------------------------------------
// JSONエンベロープ
// ---------------------------------------------------------------------------

/// 成否とメッセージのみを返す汎用レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonStatus {
    /// 処理の成否
    pub success: bool,
    /// 補足メッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JsonStatus {
    /// 成功レスポンスを構築する。
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// 失敗レスポンスを構築する。
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// シグネチャ投入処理の結果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadStatus {
    /// 処理の成否
    pub success: bool,
    /// 作成（または既存）文書のID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 補足メッセージ（失敗時は理由）
    #[serde(default)]
    pub message: String,
}

/// バージョン履歴の1エントリ。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionEntry {
    /// タイトル
    pub title: String,
    /// バージョン番号
    pub version: u32,
    /// ルール本文
    pub data: String,
    /// 詳細ページへのリンク
    pub link: String,
}

/// 種別ドロップダウンのレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeDropdownResponse {
    /// 有効な種別名の一覧
    pub data: Vec<String>,
}

// ---------------------------------------------------------------------------
// jTable 一覧 (jtlist / jtdelete)
// ---------------------------------------------------------------------------

/// jTable一覧の1行。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureRecord {
    /// 文書ID
    #[serde(rename = "_id")]
    pub id: String,
    /// タイトル
    pub title: String,
    /// 種別名
    pub data_type: String,
    /// バージョン番号
    pub version: u32,
    /// リンクID
    pub link_id: String,
    /// 説明文
    pub description: String,
    /// 最終更新時刻
    pub modified: u64,
    /// 詳細ページへのリンク
    pub details: String,
}

/// jTable `jtlist` レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JtableListResponse {
    /// "OK" or "ERROR"
    #[serde(rename = "Result")]
    pub result: String,
    /// 現在ページの行
    #[serde(rename = "Records")]
    pub records: Vec<SignatureRecord>,
    /// 絞り込み後の総件数
    #[serde(rename = "TotalRecordCount")]
    pub total_record_count: usize,
}

/// jTable `jtdelete` レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JtableResult {
    /// "OK" or "ERROR"
    #[serde(rename = "Result")]
    pub result: String,
    /// エラー時のメッセージ
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// UploadStatusが `_id` キーで入出力されることを確認
    #[test]
    fn test_upload_status_uses_underscore_id() {
        let status: UploadStatus =
            serde_json::from_value(serde_json::json!({"success": true, "_id": "X"})).unwrap();
        assert!(status.success);
        assert_eq!(status.id.as_deref(), Some("X"));
        assert_eq!(status.message, "");

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["_id"], "X");
    }

    /// 成功時のJsonStatusにmessageキーが含まれないことを確認
    #[test]
    fn test_json_status_omits_empty_message() {
        let value = serde_json::to_value(JsonStatus::ok()).unwrap();
        assert_eq!(value, serde_json::json!({"success": true}));

        let value = serde_json::to_value(JsonStatus::failure("Invalid data type")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": false, "message": "Invalid data type"})
        );
    }

    /// jTableレスポンスのキー名がPascalCaseであることを確認
    #[test]
    fn test_jtable_keys() {
        let value = serde_json::to_value(JtableListResponse {
            result: "OK".to_string(),
            records: vec![],
            total_record_count: 0,
        })
        .unwrap();
        assert_eq!(value["Result"], "OK");
        assert_eq!(value["TotalRecordCount"], 0);
        assert!(value["Records"].as_array().unwrap().is_empty());

        let value = serde_json::to_value(JtableResult {
            result: "OK".to_string(),
            message: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"Result": "OK"}));
    }
}
