//! # S3互換 オブジェクトストア実装
//!
//! AWS S3, MinIO 等のS3互換APIを使用するオブジェクトストア実装。

use super::{KeyPage, ObjectStore};
use crate::error::ExporterError;

/// 非AWSエンドポイントでリージョンを検出できない場合の既定値。
const DEFAULT_REGION: &str = "eu-west-1";

/// S3互換ストレージによるオブジェクトストア実装。
pub struct S3ObjectStore {
    /// 内部通信用バケット（一覧取得）
    bucket_internal: s3::Bucket,
    /// クライアント向けバケット（署名付きURL生成用）。
    /// 内部ホスト名と外部ホスト名が異なる場合に使用。
    /// Noneの場合はbucket_internalを使用する。
    bucket_public: Option<s3::Bucket>,
}

/// AWS S3エンドポイント（s3.REGION.amazonaws.com）からリージョンを取り出す。
fn detect_region(endpoint: &str) -> Option<String> {
    let start = endpoint.find("s3.")?;
    let rest = &endpoint[start + 3..];
    let end = rest.find(".amazonaws.com")?;
    let region = &rest[..end];
    (!region.is_empty()).then(|| region.to_string())
}

impl S3ObjectStore {
    /// S3互換バケットからObjectStoreを構築する。
    pub fn new(bucket_internal: s3::Bucket, bucket_public: Option<s3::Bucket>) -> Self {
        Self {
            bucket_internal,
            bucket_public,
        }
    }

    /// S3互換バケットを初期化する。
    fn init_bucket(
        endpoint: &str,
        region_override: Option<&str>,
        credentials: &s3::creds::Credentials,
        bucket_name: &str,
    ) -> anyhow::Result<s3::Bucket> {
        let region = region_override
            .map(str::to_string)
            .or_else(|| detect_region(endpoint))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let region = s3::Region::Custom {
            region,
            endpoint: endpoint.to_string(),
        };

        let bucket =
            s3::Bucket::new(bucket_name, region, credentials.clone())?.with_path_style();

        Ok(*bucket)
    }

    /// 環境変数から構築する。
    pub fn from_env(bucket_name: &str) -> anyhow::Result<Self> {
        let endpoint = std::env::var("S3_ENDPOINT")
            .unwrap_or_else(|_| format!("https://s3.{DEFAULT_REGION}.amazonaws.com"));
        let region_override = std::env::var("S3_REGION").ok();
        let access_key = std::env::var("S3_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
            .map_err(|_| anyhow::anyhow!("S3_ACCESS_KEYが設定されていません"))?;
        let secret_key = std::env::var("S3_SECRET_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
            .map_err(|_| anyhow::anyhow!("S3_SECRET_KEYが設定されていません"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        let credentials = s3::creds::Credentials::new(
            Some(&access_key),
            Some(&secret_key),
            None,
            session_token.as_deref(),
            None,
        )?;

        let bucket_internal = Self::init_bucket(
            &endpoint,
            region_override.as_deref(),
            &credentials,
            bucket_name,
        )?;

        let bucket_public = std::env::var("S3_PUBLIC_ENDPOINT")
            .ok()
            .map(|public_ep| {
                tracing::info!(
                    s3_public_endpoint = %public_ep,
                    "クライアント向けS3エンドポイントを設定"
                );
                Self::init_bucket(
                    &public_ep,
                    region_override.as_deref(),
                    &credentials,
                    bucket_name,
                )
            })
            .transpose()?;

        tracing::info!(s3_endpoint = %endpoint, s3_bucket = %bucket_name, "S3オブジェクトストアを設定");

        Ok(Self::new(bucket_internal, bucket_public))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<KeyPage, ExporterError> {
        let (result, _status) = self
            .bucket_internal
            .list_page(prefix.to_string(), None, continuation, None, None)
            .await
            .map_err(|e| ExporterError::Storage(format!("オブジェクト一覧の取得失敗 ({prefix}): {e}")))?;

        let next = if result.is_truncated {
            result.next_continuation_token
        } else {
            None
        };

        Ok(KeyPage {
            keys: result.contents.into_iter().map(|object| object.key).collect(),
            next,
        })
    }

    async fn presign_get(&self, key: &str, expiry_secs: u32) -> Result<String, ExporterError> {
        let public_bucket = self.bucket_public.as_ref().unwrap_or(&self.bucket_internal);

        public_bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| ExporterError::Storage(format!("署名付きダウンロードURL生成失敗 ({key}): {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_region() {
        assert_eq!(
            detect_region("https://s3.eu-north-1.amazonaws.com").as_deref(),
            Some("eu-north-1")
        );
        assert_eq!(detect_region("http://localhost:9000"), None);
        assert_eq!(detect_region("https://s3..amazonaws.com"), None);
    }

    fn test_store(public_endpoint: Option<&str>) -> S3ObjectStore {
        let credentials = s3::creds::Credentials::new(
            Some("minioadmin"),
            Some("minioadmin"),
            None,
            None,
            None,
        )
        .unwrap();
        let internal =
            S3ObjectStore::init_bucket("http://minio:9000", None, &credentials, "exports")
                .unwrap();
        let public = public_endpoint.map(|ep| {
            S3ObjectStore::init_bucket(ep, None, &credentials, "exports").unwrap()
        });
        S3ObjectStore::new(internal, public)
    }

    /// 署名付きURLはローカルで生成され、キーと有効期限を含むことを確認
    #[tokio::test]
    async fn test_presign_get_embeds_key_and_expiry() {
        let store = test_store(None);
        let url = store
            .presign_get("processed/green/pop-proj/version=1/edition=20191003/0.json", 300)
            .await
            .unwrap();

        assert!(url.starts_with("http://minio:9000/exports/processed/green/pop-proj/"));
        assert!(url.contains("0.json"));
        assert!(url.contains("X-Amz-Expires=300"));
        assert!(url.contains("X-Amz-Signature="));
    }

    /// 外部エンドポイントが設定されている場合はそちらで署名する
    #[tokio::test]
    async fn test_presign_get_uses_public_endpoint() {
        let store = test_store(Some("https://files.example.com"));
        let url = store.presign_get("processed/green/a/0.json", 300).await.unwrap();
        assert!(url.starts_with("https://files.example.com/exports/"));
    }
}
