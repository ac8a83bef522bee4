//! # メモリ内シグネチャハンドラ
//!
//! 全文書と種別をメモリ内に保持する `SignatureService` 実装。
//! スナップショットパスを指定すると、変更のたびに `{signatures, types}` をJSONで書き出し、
//! 書き込みに成功した場合のみ変更を確定する。

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crits_types::{
    JsonStatus, Signature, SignatureType, SourceEntry, SourceInstance, UploadStatus,
    VersionEntry,
};

use super::{
    DetailPage, ListPage, ListQuery, NewSignature, SignatureDetail, SignatureService, SortField,
};
use crate::error::ServerError;
use crate::urls;

/// 永続化単位。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    signatures: Vec<Signature>,
    types: Vec<SignatureType>,
}

impl Snapshot {
    fn find(&self, id: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.id == id)
    }

    fn is_active_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.active && t.name == name)
    }

    /// 未登録の種別のみ追加する。
    fn seed_types(&mut self, names: &[String]) {
        for name in names {
            if !self.types.iter().any(|t| &t.name == name) {
                self.types.push(SignatureType {
                    name: name.clone(),
                    active: true,
                });
            }
        }
    }

    /// 同一リンクの文書をバージョン昇順で返す。
    fn link_versions(&self, link_id: &str) -> Vec<&Signature> {
        let mut versions: Vec<&Signature> = self
            .signatures
            .iter()
            .filter(|s| s.link_id == link_id)
            .collect();
        versions.sort_by_key(|s| s.version);
        versions
    }
}

/// メモリ内シグネチャハンドラ。
pub struct MemorySignatureService {
    inner: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

impl MemorySignatureService {
    /// 永続化なしで構築し、種別を初期投入する。
    pub fn new(seed_types: &[String]) -> Self {
        let mut snapshot = Snapshot::default();
        snapshot.seed_types(seed_types);
        Self {
            inner: RwLock::new(snapshot),
            snapshot_path: None,
        }
    }

    /// スナップショットファイルから構築する。ファイルが無ければ空から始める。
    pub fn open(path: impl Into<PathBuf>, seed_types: &[String]) -> Result<Self, ServerError> {
        let path = path.into();
        let mut snapshot = if path.exists() {
            let raw = std::fs::read(&path).map_err(|e| {
                ServerError::Storage(format!("スナップショット読み込み失敗: {e}"))
            })?;
            serde_json::from_slice::<Snapshot>(&raw).map_err(|e| {
                ServerError::Storage(format!("スナップショットのパースに失敗: {e}"))
            })?
        } else {
            Snapshot::default()
        };
        snapshot.seed_types(seed_types);

        tracing::info!(
            path = %path.display(),
            signatures = snapshot.signatures.len(),
            types = snapshot.types.len(),
            "スナップショットを読み込みました"
        );

        Ok(Self {
            inner: RwLock::new(snapshot),
            snapshot_path: Some(path),
        })
    }

    /// 変更を適用する。永続化ありの場合は複製に適用し、書き込み成功後に差し替える。
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Snapshot) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut guard = self.inner.write().await;
        let Some(path) = &self.snapshot_path else {
            return mutate(&mut *guard);
        };

        let mut next = guard.clone();
        let value = mutate(&mut next)?;
        if let Err(e) = write_snapshot(path, &next).await {
            tracing::error!(error = %e, "スナップショットの保存に失敗");
            return Err(format!("Could not save changes: {e}"));
        }
        *guard = next;
        Ok(value)
    }
}

/// 一時ファイルに書いてから置き換える。
async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), ServerError> {
    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| ServerError::Internal(format!("スナップショットのシリアライズに失敗: {e}")))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| ServerError::Storage(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ServerError::Storage(e.to_string()))
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn version_entry(s: &Signature) -> VersionEntry {
    VersionEntry {
        title: s.title.clone(),
        version: s.version,
        data: s.data.clone(),
        link: urls::detail_path(&s.id),
    }
}

/// ソースの投入履歴を追加する。同名ソースがあればそこに積む。
fn add_source_instance(sources: &mut Vec<SourceEntry>, name: &str, instance: SourceInstance) {
    match sources.iter_mut().find(|s| s.name == name) {
        Some(entry) => entry.instances.push(instance),
        None => sources.push(SourceEntry {
            name: name.to_string(),
            instances: vec![instance],
        }),
    }
}

fn merge_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[async_trait::async_trait]
impl SignatureService for MemorySignatureService {
    async fn list_signatures(&self, query: &ListQuery) -> ListPage {
        let snapshot = self.inner.read().await;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<&Signature> = snapshot
            .signatures
            .iter()
            .filter(|s| match &needle {
                Some(q) => {
                    s.title.to_lowercase().contains(q) || s.description.to_lowercase().contains(q)
                }
                None => true,
            })
            .collect();

        matched.sort_by(|a, b| {
            let ord = match query.sort {
                SortField::Title => a.title.cmp(&b.title),
                SortField::DataType => a.data_type.cmp(&b.data_type),
                SortField::Version => a.version.cmp(&b.version),
                SortField::Created => a.created.cmp(&b.created),
                SortField::Modified => a.modified.cmp(&b.modified),
            };
            if query.descending {
                ord.reverse()
            } else {
                ord
            }
        });

        let total = matched.len();
        let signatures = matched
            .into_iter()
            .skip(query.start)
            .take(query.page_size)
            .cloned()
            .collect();
        ListPage { signatures, total }
    }

    async fn all_signatures(&self) -> Vec<Signature> {
        self.inner.read().await.signatures.clone()
    }

    async fn update_signature_type(
        &self,
        id: &str,
        data_type: &str,
        analyst: &str,
    ) -> JsonStatus {
        let result = self
            .commit(|s| {
                if s.find(id).is_none() {
                    return Err("Signature not found".to_string());
                }
                if !s.is_active_type(data_type) {
                    return Err("Invalid data type".to_string());
                }
                if let Some(sig) = s.signatures.iter_mut().find(|sig| sig.id == id) {
                    sig.data_type = data_type.to_string();
                    sig.modified = now();
                }
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(id, data_type, analyst, "シグネチャ種別を変更しました");
                JsonStatus::ok()
            }
            Err(message) => JsonStatus::failure(message),
        }
    }

    async fn generate_signature_versions(&self, id: &str) -> Vec<VersionEntry> {
        let snapshot = self.inner.read().await;
        match snapshot.find(id) {
            Some(sig) => snapshot
                .link_versions(&sig.link_id)
                .into_iter()
                .map(version_entry)
                .collect(),
            None => Vec::new(),
        }
    }

    async fn get_signature_details(&self, id: &str, analyst: &str) -> DetailPage {
        let snapshot = self.inner.read().await;
        let Some(signature) = snapshot.find(id) else {
            tracing::debug!(id, analyst, "シグネチャが見つかりません");
            return DetailPage::Error("Signature not found".to_string());
        };

        let versions = snapshot
            .link_versions(&signature.link_id)
            .into_iter()
            .map(version_entry)
            .collect();
        DetailPage::Found(SignatureDetail {
            signature: signature.clone(),
            versions,
        })
    }

    async fn get_id_from_link_and_version(&self, link_id: &str, version: u32) -> Option<String> {
        self.inner
            .read()
            .await
            .signatures
            .iter()
            .find(|s| s.link_id == link_id && s.version == version)
            .map(|s| s.id.clone())
    }

    async fn handle_signature_file(&self, new: NewSignature) -> UploadStatus {
        if new.data.is_empty() {
            return upload_failure("No data object passed in");
        }
        if new.source.trim().is_empty() {
            return upload_failure("No source provided");
        }
        if new.title.trim().is_empty() {
            return upload_failure("No title provided");
        }

        let sha256 = sha256_hex(&new.data);
        let result = self
            .commit(|s| {
                if !s.is_active_type(&new.data_type) {
                    return Err("Invalid data type passed in".to_string());
                }

                let timestamp = now();
                let instance = SourceInstance {
                    method: new.method.clone(),
                    reference: new.reference.clone(),
                    analyst: new.analyst.clone(),
                    date: timestamp,
                };

                let (link_id, version, relationships) = match &new.link_id {
                    Some(link_id) => {
                        let versions = s.link_versions(link_id);
                        let Some(latest) = versions.last() else {
                            return Err(format!("No signature found for link id {link_id}"));
                        };
                        let relationships = if new.copy_rels {
                            latest.relationships.clone()
                        } else {
                            Vec::new()
                        };
                        (link_id.clone(), latest.version + 1, relationships)
                    }
                    None => (uuid::Uuid::new_v4().to_string(), 1, Vec::new()),
                };

                // リンク確認後、同一本文・同一種別は既存文書にソース情報をマージする
                if let Some(existing) = s
                    .signatures
                    .iter_mut()
                    .find(|sig| sig.sha256 == sha256 && sig.data_type == new.data_type)
                {
                    add_source_instance(&mut existing.sources, &new.source, instance);
                    merge_unique(&mut existing.bucket_list, new.bucket_list.clone());
                    merge_unique(&mut existing.tickets, new.ticket.clone());
                    existing.modified = timestamp;
                    return Ok((existing.id.clone(), false));
                }

                let mut sources = Vec::new();
                add_source_instance(&mut sources, &new.source, instance);

                let id = uuid::Uuid::new_v4().to_string();
                s.signatures.push(Signature {
                    id: id.clone(),
                    link_id,
                    version,
                    title: new.title.clone(),
                    description: new.description.clone(),
                    data: new.data.clone(),
                    data_type: new.data_type.clone(),
                    sha256: sha256.clone(),
                    sources,
                    bucket_list: new.bucket_list.clone(),
                    tickets: new.ticket.clone().into_iter().collect(),
                    relationships,
                    status: "New".to_string(),
                    analyst: new.analyst.clone(),
                    created: timestamp,
                    modified: timestamp,
                });
                Ok((id, true))
            })
            .await;

        match result {
            Ok((id, created)) => {
                tracing::info!(
                    id = %id,
                    created,
                    analyst = %new.analyst,
                    "シグネチャを登録しました"
                );
                let message = if created {
                    "Signature uploaded"
                } else {
                    "Signature already exists; source information merged"
                };
                UploadStatus {
                    success: true,
                    id: Some(id),
                    message: message.to_string(),
                }
            }
            Err(message) => upload_failure(message),
        }
    }

    async fn delete_signature(&self, id: &str, analyst: &str) -> bool {
        let result = self
            .commit(|s| {
                let before = s.signatures.len();
                s.signatures.retain(|sig| sig.id != id);
                if s.signatures.len() == before {
                    return Err("Signature not found".to_string());
                }
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(id, analyst, "シグネチャを削除しました");
                true
            }
            Err(message) => {
                tracing::warn!(id, analyst, %message, "シグネチャの削除に失敗");
                false
            }
        }
    }

    async fn add_new_signature_type(&self, name: &str, analyst: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let result = self
            .commit(|s| {
                if s.types.iter().any(|t| t.name == name) {
                    return Err(format!("Signature type {name} already exists"));
                }
                s.types.push(SignatureType {
                    name: name.to_string(),
                    active: true,
                });
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(name, analyst, "シグネチャ種別を追加しました");
                true
            }
            Err(message) => {
                tracing::debug!(%message, "シグネチャ種別を追加できません");
                false
            }
        }
    }

    async fn signature_type_names(&self) -> Vec<String> {
        let snapshot = self.inner.read().await;
        let mut names: Vec<String> = snapshot
            .types
            .iter()
            .filter(|t| t.active)
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }
}

fn upload_failure(message: impl Into<String>) -> UploadStatus {
    UploadStatus {
        success: false,
        id: None,
        message: message.into(),
    }
}
