//! # リクエストコンテキストと権限ガード
//!
//! `Authorization: Bearer <api-key>` からアカウントを解決し、
//! `RequestContext` としてリクエスト拡張に格納する。
//! 各ルートは `require_view_data` / `require_admin` をroute_layerとして持ち、
//! 権限を満たさないリクエストはハンドラ層に到達しない。

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::config::AppState;
use crate::error::ServerError;

/// アカウントのロール。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 閲覧・投入が可能な一般アナリスト
    Analyst,
    /// 削除等の管理操作が可能
    Admin,
}

fn default_active() -> bool {
    true
}

/// ユーザー定義ファイルの1エントリ。
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    /// 認証に使うAPIキー
    pub api_key: String,
    /// ユーザー名（アナリスト名として記録される）
    pub username: String,
    /// ロール
    pub role: Role,
    /// 投入時に選択可能なソース名
    #[serde(default)]
    pub sources: Vec<String>,
    /// 有効なアカウントかどうか
    #[serde(default = "default_active")]
    pub active: bool,
}

/// リクエストごとの認証済みコンテキスト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// ユーザー名
    pub username: String,
    /// ロール
    pub role: Role,
    /// 選択可能なソース名
    pub sources: Vec<String>,
    /// 有効なアカウントかどうか
    pub active: bool,
}

impl RequestContext {
    /// データ閲覧権限。有効なアカウントであれば可。
    pub fn can_view_data(&self) -> bool {
        self.active
    }

    /// 管理者権限。
    pub fn is_admin(&self) -> bool {
        self.active && self.role == Role::Admin
    }
}

/// APIキーからアカウントを引くディレクトリ。
#[derive(Debug, Default)]
pub struct UserDirectory {
    by_key: HashMap<String, RequestContext>,
}

impl UserDirectory {
    /// アカウント一覧から構築する。APIキーが重複した場合は後勝ち。
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        let by_key = accounts
            .into_iter()
            .map(|a| {
                (
                    a.api_key,
                    RequestContext {
                        username: a.username,
                        role: a.role,
                        sources: a.sources,
                        active: a.active,
                    },
                )
            })
            .collect();
        Self { by_key }
    }

    /// APIキーに対応するコンテキストを返す。
    pub fn lookup(&self, api_key: &str) -> Option<RequestContext> {
        self.by_key.get(api_key).cloned()
    }

    /// 登録済みアカウント数
    pub fn len(&self) -> usize {
        self.by_key.len()
    }
}

/// Bearerトークンを取り出す。
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// APIキーを解決し、`RequestContext` をリクエスト拡張に挿入する。
///
/// 解決できない場合もリクエストは素通しし、判定は後段のガードに任せる。
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = bearer_token(&request).and_then(|key| state.users.lookup(key));
    if let Some(context) = context {
        request.extensions_mut().insert(context);
    }
    next.run(request).await
}

/// データ閲覧権限を要求するガード。
pub async fn require_view_data(request: Request, next: Next) -> Result<Response, ServerError> {
    guard(request, next, RequestContext::can_view_data, "view data").await
}

/// 管理者権限を要求するガード。
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ServerError> {
    guard(request, next, RequestContext::is_admin, "admin").await
}

async fn guard(
    request: Request,
    next: Next,
    predicate: fn(&RequestContext) -> bool,
    capability: &'static str,
) -> Result<Response, ServerError> {
    let Some(context) = request.extensions().get::<RequestContext>() else {
        tracing::warn!(
            path = %request.uri().path(),
            "アクセス拒否: 認証情報がありません"
        );
        return Err(ServerError::Unauthorized);
    };

    if !predicate(context) {
        tracing::warn!(
            user = %context.username,
            capability,
            path = %request.uri().path(),
            "アクセス拒否: 権限が不足しています"
        );
        return Err(ServerError::Forbidden);
    }

    tracing::debug!(user = %context.username, capability, "アクセス許可");
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::util::ServiceExt;

    use crate::endpoints::test_helpers::{account, StubService};

    async fn ok_handler() -> &'static str {
        "OK"
    }

    fn app(guard_admin: bool) -> Router {
        let state = Arc::new(AppState {
            service: Box::new(StubService::default()),
            users: UserDirectory::new(vec![
                account("analyst-key", "alice", Role::Analyst, true),
                account("admin-key", "root", Role::Admin, true),
                account("disabled-key", "mallory", Role::Admin, false),
            ]),
        });

        let route = if guard_admin {
            Router::new()
                .route("/", get(ok_handler))
                .route_layer(middleware::from_fn(require_admin))
        } else {
            Router::new()
                .route("/", get(ok_handler))
                .route_layer(middleware::from_fn(require_view_data))
        };
        route.layer(middleware::from_fn_with_state(state, authenticate))
    }

    fn request(key: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_view_data_allows_active_analyst() {
        let response = app(false).oneshot(request(Some("analyst-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_view_data_denies_missing_credentials() {
        let response = app(false).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(false).oneshot(request(Some("unknown"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_view_data_denies_inactive_account() {
        let response = app(false).oneshot(request(Some("disabled-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_guard() {
        let response = app(true).oneshot(request(Some("admin-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(true).oneshot(request(Some("analyst-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // 無効化された管理者は管理者扱いしない
        let response = app(true).oneshot(request(Some("disabled-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_bearer_prefix_required() {
        let users = UserDirectory::new(vec![account("k", "alice", Role::Analyst, true)]);
        let req = axum::http::Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, "Token k")
            .body(Body::empty())
            .unwrap();
        assert!(bearer_token(&req).is_none());
        assert!(users.lookup("k").is_some());
    }
}
