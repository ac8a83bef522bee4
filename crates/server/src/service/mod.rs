//! # シグネチャハンドラ層
//!
//! HTTPコントローラが委譲する業務ロジックの抽象インターフェース。
//! 失敗は例外ではなく戻り値（`success: false`、`false`、`None`）で表現する。
//!
//! 実装:
//! - `memory` — メモリ内保持（JSONスナップショットによる永続化はオプション）

pub mod memory;

pub use memory::MemorySignatureService;

use crits_types::{JsonStatus, Signature, UploadStatus, VersionEntry};

/// 一覧の並び替えキー。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    DataType,
    Version,
    Created,
    Modified,
}

impl SortField {
    /// jTableのフィールド名から解決する。
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "title" => Some(SortField::Title),
            "data_type" => Some(SortField::DataType),
            "version" => Some(SortField::Version),
            "created" => Some(SortField::Created),
            "modified" => Some(SortField::Modified),
            _ => None,
        }
    }
}

/// 一覧取得の条件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 先頭からのオフセット
    pub start: usize,
    /// 1ページの件数
    pub page_size: usize,
    /// 並び替えキー
    pub sort: SortField,
    /// 降順かどうか
    pub descending: bool,
    /// タイトル・説明文の部分一致検索語（大文字小文字を区別しない）
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            start: 0,
            page_size: 25,
            sort: SortField::Modified,
            descending: true,
            search: None,
        }
    }
}

/// 一覧取得の結果。
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    /// 現在ページの文書
    pub signatures: Vec<Signature>,
    /// 絞り込み後の総件数
    pub total: usize,
}

/// 詳細ページの描画内容。どのテンプレートを使うかはハンドラ層が決める。
#[derive(Debug, Clone, PartialEq)]
pub enum DetailPage {
    /// `signature_detail.html`
    Found(SignatureDetail),
    /// `error.html`
    Error(String),
}

/// 詳細ページの引数。
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureDetail {
    /// 対象の文書
    pub signature: Signature,
    /// 同一リンクの全バージョン（昇順）
    pub versions: Vec<VersionEntry>,
}

/// 投入フォームから抽出した新規シグネチャ。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSignature {
    pub data: String,
    pub source: String,
    pub analyst: String,
    pub description: String,
    pub title: String,
    pub data_type: String,
    /// 指定時は既存リンクの新バージョンとして登録する
    pub link_id: Option<String>,
    pub method: String,
    pub reference: String,
    /// 直前バージョンの関連をコピーするかどうか
    pub copy_rels: bool,
    pub bucket_list: Vec<String>,
    pub ticket: Option<String>,
}

/// シグネチャハンドラ層のトレイト。
#[async_trait::async_trait]
pub trait SignatureService: Send + Sync {
    /// 条件に合う文書を1ページ分返す。
    async fn list_signatures(&self, query: &ListQuery) -> ListPage;

    /// 全文書を返す（CSVエクスポート用）。
    async fn all_signatures(&self) -> Vec<Signature>;

    /// シグネチャ種別を変更する。
    async fn update_signature_type(&self, id: &str, data_type: &str, analyst: &str)
        -> JsonStatus;

    /// 同一リンクのバージョン一覧を昇順で返す。不明なIDなら空。
    async fn generate_signature_versions(&self, id: &str) -> Vec<VersionEntry>;

    /// 詳細ページの描画内容を返す。
    async fn get_signature_details(&self, id: &str, analyst: &str) -> DetailPage;

    /// リンクIDとバージョンから文書IDを引く。
    async fn get_id_from_link_and_version(&self, link_id: &str, version: u32) -> Option<String>;

    /// シグネチャを投入する（新規 or 新バージョン）。
    async fn handle_signature_file(&self, new: NewSignature) -> UploadStatus;

    /// 文書を削除する。
    async fn delete_signature(&self, id: &str, analyst: &str) -> bool;

    /// シグネチャ種別を追加する。既存・空の名前なら `false`。
    async fn add_new_signature_type(&self, name: &str, analyst: &str) -> bool;

    /// 有効なシグネチャ種別名を名前順で返す。
    async fn signature_type_names(&self) -> Vec<String>;
}
