//! # テスト用共通ヘルパー
//!
//! メタデータサービス・所有者判定サービスのモックサーバー起動と、
//! オーケストレータテストで共有するモック実装群。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exporter_types::{AccessRights, DatasetRecord, EditionRecord};

use crate::auth::{BearerToken, OwnerAuthorizer};
use crate::error::ExporterError;
use crate::metadata::MetadataClient;
use crate::storage::{KeyPage, ObjectStore};

/// 任意のルーターでモックHTTPサーバーを起動し、ポート番号を返す。
pub async fn start_mock_server(app: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}

/// テスト用データセットレコード。
pub fn dataset(id: &str, access_rights: AccessRights) -> DatasetRecord {
    DatasetRecord {
        id: id.to_string(),
        access_rights,
        parent_id: None,
    }
}

/// テスト用エディションレコード。
pub fn edition(id: &str) -> EditionRecord {
    let self_link = match id.split('/').collect::<Vec<_>>().as_slice() {
        [d, v, e] => format!("/datasets/{d}/versions/{v}/editions/{e}"),
        _ => format!("/datasets/{id}"),
    };
    EditionRecord {
        id: id.to_string(),
        self_link,
    }
}

/// メモリ内のメタデータ。
pub struct MockMetadata {
    /// データセット取得結果（`None` は404）
    pub dataset: Option<DatasetRecord>,
    /// エディション取得結果（`None` は404）
    pub edition: Option<EditionRecord>,
    /// ディストリビューションの有無
    pub has_distributions: bool,
    /// データセット取得時に返す上流エラー（ステータス, ボディ）
    pub dataset_failure: Option<(u16, serde_json::Value)>,
    /// 受け取った認証情報（呼び出し順）
    pub seen_credentials: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockMetadata {
    /// データセット・エディションが存在し、ディストリビューションもある状態。
    pub fn new(dataset: DatasetRecord, edition: EditionRecord) -> Self {
        Self {
            dataset: Some(dataset),
            edition: Some(edition),
            has_distributions: true,
            dataset_failure: None,
            seen_credentials: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, credential: Option<&BearerToken>) {
        self.seen_credentials
            .lock()
            .unwrap()
            .push(credential.map(|c| c.as_str().to_string()));
    }
}

#[async_trait::async_trait]
impl MetadataClient for MockMetadata {
    async fn get_dataset(
        &self,
        _dataset_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<DatasetRecord, ExporterError> {
        self.record(credential);
        if let Some((status, body)) = &self.dataset_failure {
            return Err(ExporterError::Upstream {
                status: *status,
                body: body.clone(),
            });
        }
        self.dataset.clone().ok_or(ExporterError::DatasetNotFound)
    }

    async fn get_edition(
        &self,
        _dataset_id: &str,
        _version: &str,
        _edition_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<EditionRecord, ExporterError> {
        self.record(credential);
        self.edition.clone().ok_or(ExporterError::EditionNotFound)
    }

    async fn has_distributions(
        &self,
        _edition: &EditionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<bool, ExporterError> {
        self.record(credential);
        Ok(self.has_distributions)
    }
}

/// 呼び出し回数を記録する所有者判定。
pub struct MockAuthorizer {
    /// 返す判定
    pub verdict: bool,
    /// 呼び出し回数
    pub calls: Arc<AtomicUsize>,
}

impl MockAuthorizer {
    /// 固定の判定を返すモック。
    pub fn new(verdict: bool) -> Self {
        Self {
            verdict,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl OwnerAuthorizer for MockAuthorizer {
    async fn is_owner(
        &self,
        _credential: &BearerToken,
        _dataset_id: &str,
    ) -> Result<bool, ExporterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict)
    }
}

/// メモリ内のオブジェクトストア。
///
/// キーは辞書順で保持し、`page_size` 件ごとにページ分割して返す。
pub struct MockObjectStore {
    /// 格納キー
    pub keys: Vec<String>,
    /// 1ページあたりの件数
    pub page_size: usize,
    /// 一覧取得の呼び出し回数
    pub list_calls: Arc<AtomicUsize>,
    /// 署名の呼び出し回数
    pub presign_calls: Arc<AtomicUsize>,
    /// 署名時に受け取った有効期限
    pub expiries: Mutex<HashMap<String, u32>>,
}

impl MockObjectStore {
    /// キー一覧からストアを作る。
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        Self {
            keys,
            page_size: 1000,
            list_calls: Arc::new(AtomicUsize::new(0)),
            presign_calls: Arc::new(AtomicUsize::new(0)),
            expiries: Mutex::new(HashMap::new()),
        }
    }

    /// ページサイズを変更する。
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<KeyPage, ExporterError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let start: usize = match continuation {
            Some(token) => token
                .parse()
                .map_err(|_| ExporterError::Storage(format!("不正な継続トークン: {token}")))?,
            None => 0,
        };
        let matching: Vec<&String> = self.keys.iter().filter(|k| k.starts_with(prefix)).collect();
        let end = (start + self.page_size).min(matching.len());
        let keys = matching[start.min(end)..end]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let next = (end < matching.len()).then(|| end.to_string());
        Ok(KeyPage { keys, next })
    }

    async fn presign_get(&self, key: &str, expiry_secs: u32) -> Result<String, ExporterError> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        self.expiries
            .lock()
            .unwrap()
            .insert(key.to_string(), expiry_secs);
        Ok(format!("http://mock-storage/{key}?X-Amz-Expires={expiry_secs}&sig=test"))
    }
}
