//! # 呼び出し元認証
//!
//! リクエストヘッダからのBearerトークン抽出と、
//! 外部の所有者判定サービスへの問い合わせ。
//! トークンはリクエストの寿命を超えて保持しない。

use axum::http::{header, HeaderMap, StatusCode};
use serde::Deserialize;

use crate::error::ExporterError;
use crate::metadata::append_segments;

/// 呼び出し元のBearerトークン。
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// 空でなければトークンを作る。
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// `Authorization` ヘッダからトークンを取り出す。
    ///
    /// `Bearer <token>` のほか、スキーム無しの生トークンも受け付ける。
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let mut parts = value.split_whitespace();
        let first = parts.next()?;
        match parts.next() {
            Some(token) if first.eq_ignore_ascii_case("bearer") => Self::new(token),
            Some(_) => None,
            None if first.eq_ignore_ascii_case("bearer") => None,
            None => Self::new(first),
        }
    }

    /// トークン文字列。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// 「呼び出し元はデータセットXの所有者か」を判定するインターフェース。
#[async_trait::async_trait]
pub trait OwnerAuthorizer: Send + Sync {
    /// 呼び出し元が `dataset_id` の所有者なら `true` を返す。
    async fn is_owner(
        &self,
        credential: &BearerToken,
        dataset_id: &str,
    ) -> Result<bool, ExporterError>;
}

/// 所有者判定サービスのレスポンス。
#[derive(Debug, Deserialize)]
struct AccessResponse {
    access: bool,
}

/// HTTP経由の所有者判定。
///
/// `GET {base_url}/{dataset_id}` に呼び出し元のトークンを転送し、
/// `{"access": true}` なら所有者とみなす。
pub struct HttpAuthorizer {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// 所有者判定サービスのベースURL
    base_url: String,
}

impl HttpAuthorizer {
    /// 新しいHttpAuthorizerを作成する。
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl OwnerAuthorizer for HttpAuthorizer {
    async fn is_owner(
        &self,
        credential: &BearerToken,
        dataset_id: &str,
    ) -> Result<bool, ExporterError> {
        let url = append_segments(&self.base_url, &[dataset_id])?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|e| ExporterError::Internal(format!("所有者判定の送信失敗: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(false);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExporterError::Internal(format!("所有者判定レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            return Err(ExporterError::Internal(format!(
                "所有者判定サービスがエラーを返しました: HTTP {} - {}",
                status, body
            )));
        }

        let access: AccessResponse = serde_json::from_str(&body)
            .map_err(|e| ExporterError::Internal(format!("所有者判定レスポンスのパースに失敗: {e}")))?;
        Ok(access.access)
    }
}
