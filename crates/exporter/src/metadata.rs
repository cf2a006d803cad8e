//! # メタデータサービスクライアント
//!
//! データセット・エディション・ディストリビューションの取得。
//! 呼び出し元のトークンは引数で明示的に受け取り、そのまま転送する。

use axum::http::StatusCode;
use exporter_types::{DatasetRecord, EditionRecord};
use reqwest::Url;

use crate::auth::BearerToken;
use crate::error::ExporterError;

/// ベースURLの末尾にパス要素を追加したURLを作る。
///
/// 各要素は1セグメントとしてパーセントエンコードされ、`/` や `?` を含んでも
/// 別のパスやクエリとして解釈されない。
pub(crate) fn append_segments(base_url: &str, segments: &[&str]) -> Result<Url, ExporterError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ExporterError::Internal(format!("不正なURL ({base_url}): {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ExporterError::Internal(format!("パスを持てないURLです: {base_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// メタデータサービスの抽象インターフェース。
#[async_trait::async_trait]
pub trait MetadataClient: Send + Sync {
    /// データセットを取得する。存在しなければ `DatasetNotFound`。
    async fn get_dataset(
        &self,
        dataset_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<DatasetRecord, ExporterError>;

    /// エディションを取得する。存在しなければ `EditionNotFound`。
    async fn get_edition(
        &self,
        dataset_id: &str,
        version: &str,
        edition_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<EditionRecord, ExporterError>;

    /// エディションに1件以上のディストリビューションがあるか。
    async fn has_distributions(
        &self,
        edition: &EditionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<bool, ExporterError>;
}

/// HTTP経由のメタデータサービスクライアント。
pub struct HttpMetadataClient {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// メタデータサービスのベースURL（末尾スラッシュ無し）
    base_url: String,
}

impl HttpMetadataClient {
    /// 新しいHttpMetadataClientを作成する。
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// 相対リンクはベースURLに連結し、絶対URLはそのまま使う。
    fn resolve_link(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{}", self.base_url, link)
        }
    }

    /// `{base_url}/datasets/...` のURLを作る。
    fn datasets_url(&self, segments: &[&str]) -> Result<Url, ExporterError> {
        let mut all = vec!["datasets"];
        all.extend_from_slice(segments);
        append_segments(&self.base_url, &all)
    }

    /// JSONを取得する。404は `Ok(None)`、その他の失敗ステータスは `Upstream`。
    async fn get_json(
        &self,
        url: Url,
        credential: Option<&BearerToken>,
    ) -> Result<Option<serde_json::Value>, ExporterError> {
        let mut request = self.http_client.get(url.clone());
        if let Some(token) = credential {
            request = request.bearer_auth(token.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExporterError::Internal(format!("メタデータ取得の送信失敗 ({url}): {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(url = %url, "メタデータが見つかりません");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExporterError::Internal(format!("メタデータ読み取り失敗 ({url}): {e}")))?;

        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "メタデータサービスがエラーを返しました");
            // JSONでなければ文字列として中継する
            let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
            return Err(ExporterError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ExporterError::Internal(format!("メタデータのパースに失敗 ({url}): {e}")))
    }
}

#[async_trait::async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn get_dataset(
        &self,
        dataset_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<DatasetRecord, ExporterError> {
        let url = self.datasets_url(&[dataset_id])?;
        let value = self
            .get_json(url, credential)
            .await?
            .ok_or(ExporterError::DatasetNotFound)?;
        Ok(DatasetRecord::from_json(value)?)
    }

    async fn get_edition(
        &self,
        dataset_id: &str,
        version: &str,
        edition_id: &str,
        credential: Option<&BearerToken>,
    ) -> Result<EditionRecord, ExporterError> {
        let url = self.datasets_url(&[dataset_id, "versions", version, "editions", edition_id])?;
        let value = self
            .get_json(url, credential)
            .await?
            .ok_or(ExporterError::EditionNotFound)?;
        Ok(EditionRecord::from_json(value)?)
    }

    async fn has_distributions(
        &self,
        edition: &EditionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<bool, ExporterError> {
        let url = append_segments(&self.resolve_link(&edition.self_link), &["distributions"])?;
        let Some(value) = self.get_json(url, credential).await? else {
            return Ok(false);
        };
        match value {
            serde_json::Value::Array(items) => Ok(!items.is_empty()),
            other => Err(ExporterError::Internal(format!(
                "ディストリビューション一覧が配列ではありません: {other}"
            ))),
        }
    }
}
