//! # サーバー設定・共有状態
//!
//! 環境変数からの設定読み込みとサーバーの共有状態の定義。
//!
//! | 環境変数 | 既定値 | 内容 |
//! |---|---|---|
//! | `CRITS_LISTEN_ADDR` | `0.0.0.0:8080` | 待ち受けアドレス |
//! | `CRITS_USERS_FILE` | なし | APIキーとアカウントのJSON配列 |
//! | `CRITS_DATA_PATH` | なし | スナップショットの保存先 |
//! | `CRITS_SIGNATURE_TYPES` | `Bro,Snort,Suricata,Yara` | 初期シグネチャ種別 |

use std::path::PathBuf;

use crate::auth::{Role, UserAccount, UserDirectory};
use crate::service::SignatureService;

/// 初期投入するシグネチャ種別の既定値
pub const DEFAULT_SIGNATURE_TYPES: &str = "Bro,Snort,Suricata,Yara";

/// サーバーの共有状態。
pub struct AppState {
    /// ハンドラ層（トレイトで抽象化）
    pub service: Box<dyn SignatureService>,
    /// APIキー → アカウント
    pub users: UserDirectory,
}

/// 環境変数から読み込んだ起動設定。
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    pub listen_addr: String,
    /// ユーザー定義ファイル
    pub users_file: Option<PathBuf>,
    /// スナップショット保存先
    pub data_path: Option<PathBuf>,
    /// 初期シグネチャ種別
    pub signature_types: Vec<String>,
}

impl ServerConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> Self {
        let listen_addr =
            std::env::var("CRITS_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let users_file = std::env::var("CRITS_USERS_FILE").ok().map(PathBuf::from);
        let data_path = std::env::var("CRITS_DATA_PATH").ok().map(PathBuf::from);
        let signature_types = parse_type_list(
            &std::env::var("CRITS_SIGNATURE_TYPES")
                .unwrap_or_else(|_| DEFAULT_SIGNATURE_TYPES.to_string()),
        );

        Self {
            listen_addr,
            users_file,
            data_path,
            signature_types,
        }
    }

    /// ユーザーディレクトリを読み込む。
    ///
    /// `CRITS_USERS_FILE` が未設定の場合は開発用の管理者アカウントを
    /// ランダムなAPIキーで生成する。
    pub fn load_users(&self) -> anyhow::Result<UserDirectory> {
        match &self.users_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let accounts: Vec<UserAccount> = serde_json::from_str(&raw)?;
                tracing::info!(
                    path = %path.display(),
                    count = accounts.len(),
                    "ユーザー定義を読み込みました"
                );
                Ok(UserDirectory::new(accounts))
            }
            None => {
                let api_key = uuid::Uuid::new_v4().simple().to_string();
                tracing::warn!(
                    api_key = %api_key,
                    "CRITS_USERS_FILEが未設定です。開発用の管理者アカウントを生成します"
                );
                Ok(UserDirectory::new(vec![UserAccount {
                    api_key,
                    username: "admin".to_string(),
                    role: Role::Admin,
                    sources: vec!["Default".to_string()],
                    active: true,
                }]))
            }
        }
    }
}

/// カンマ区切りの種別リストを分解する（空要素は捨てる）。
fn parse_type_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
