//! # エンドポイントテスト用共通ヘルパー
//!
//! 呼び出し回数を数えるスタブハンドラ層と、状態・リクエストの組み立て。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Form;

use crits_types::{JsonStatus, Signature, UploadStatus, VersionEntry};

use crate::auth::{RequestContext, Role, UserAccount, UserDirectory};
use crate::config::AppState;
use crate::forms::FormData;
use crate::service::{
    DetailPage, ListPage, ListQuery, MemorySignatureService, NewSignature, SignatureService,
};

/// 固定の応答を返すスタブ。全メソッドの呼び出し回数を `calls` に数える。
pub struct StubService {
    pub calls: Arc<AtomicUsize>,
    /// `None` なら `{"success": true, "_id": "X"}`
    pub upload_status: Option<UploadStatus>,
    pub set_type_status: JsonStatus,
    pub types: Vec<String>,
    pub last_upload: Arc<Mutex<Option<NewSignature>>>,
}

impl Default for StubService {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            upload_status: None,
            set_type_status: JsonStatus::ok(),
            types: vec!["Snort".to_string(), "Yara".to_string()],
            last_upload: Arc::new(Mutex::new(None)),
        }
    }
}

impl StubService {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SignatureService for StubService {
    async fn list_signatures(&self, _query: &ListQuery) -> ListPage {
        self.hit();
        ListPage {
            signatures: vec![],
            total: 0,
        }
    }

    async fn all_signatures(&self) -> Vec<Signature> {
        self.hit();
        vec![]
    }

    async fn update_signature_type(&self, _id: &str, _data_type: &str, _analyst: &str) -> JsonStatus {
        self.hit();
        self.set_type_status.clone()
    }

    async fn generate_signature_versions(&self, _id: &str) -> Vec<VersionEntry> {
        self.hit();
        vec![]
    }

    async fn get_signature_details(&self, _id: &str, _analyst: &str) -> DetailPage {
        self.hit();
        DetailPage::Error("Signature not found".to_string())
    }

    async fn get_id_from_link_and_version(&self, _link_id: &str, _version: u32) -> Option<String> {
        self.hit();
        None
    }

    async fn handle_signature_file(&self, new: NewSignature) -> UploadStatus {
        self.hit();
        *self.last_upload.lock().unwrap() = Some(new);
        self.upload_status.clone().unwrap_or(UploadStatus {
            success: true,
            id: Some("X".to_string()),
            message: String::new(),
        })
    }

    async fn delete_signature(&self, _id: &str, _analyst: &str) -> bool {
        self.hit();
        true
    }

    async fn add_new_signature_type(&self, _name: &str, _analyst: &str) -> bool {
        self.hit();
        true
    }

    async fn signature_type_names(&self) -> Vec<String> {
        self.hit();
        self.types.clone()
    }
}

pub const ANALYST_KEY: &str = "analyst-key";
pub const ADMIN_KEY: &str = "admin-key";
pub const DISABLED_KEY: &str = "disabled-key";

pub fn account(api_key: &str, username: &str, role: Role, active: bool) -> UserAccount {
    UserAccount {
        api_key: api_key.to_string(),
        username: username.to_string(),
        role,
        sources: vec!["ACME".to_string()],
        active,
    }
}

fn users() -> UserDirectory {
    UserDirectory::new(vec![
        account(ANALYST_KEY, "alice", Role::Analyst, true),
        account(ADMIN_KEY, "root", Role::Admin, true),
        account(DISABLED_KEY, "mallory", Role::Analyst, false),
    ])
}

/// スタブを使う共有状態
pub fn stub_state(stub: StubService) -> Arc<AppState> {
    Arc::new(AppState {
        service: Box::new(stub),
        users: users(),
    })
}

/// メモリ内ハンドラを使う共有状態（種別: Snort, Yara）
pub fn memory_state() -> Arc<AppState> {
    Arc::new(AppState {
        service: Box::new(MemorySignatureService::new(&[
            "Snort".to_string(),
            "Yara".to_string(),
        ])),
        users: users(),
    })
}

pub fn analyst_ctx() -> RequestContext {
    RequestContext {
        username: "alice".to_string(),
        role: Role::Analyst,
        sources: vec!["ACME".to_string()],
        active: true,
    }
}

pub fn admin_ctx() -> RequestContext {
    RequestContext {
        username: "root".to_string(),
        role: Role::Admin,
        sources: vec!["ACME".to_string()],
        active: true,
    }
}

/// ハンドラに直接渡すフォーム抽出結果
pub fn form(pairs: &[(&str, &str)]) -> Result<Form<FormData>, FormRejection> {
    Ok(Form(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ))
}

/// ルーター経由のリクエストを組み立てる。
pub fn request(
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    ajax: bool,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    if ajax {
        builder = builder.header("x-requested-with", "XMLHttpRequest");
    }
    if !body.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// レスポンス本文を文字列として読み出す。
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// レスポンス本文をJSONとして読み出す。
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
