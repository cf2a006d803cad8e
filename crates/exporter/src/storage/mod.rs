//! # オブジェクトストア
//!
//! エクスポート対象オブジェクトの一覧取得と署名付きダウンロードURL生成の
//! 抽象インターフェース。S3互換ストレージ実装は `s3` サブモジュールを参照。
//! どちらの操作も読み取り専用で、ストレージを変更しない。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use s3::S3ObjectStore;

use crate::error::ExporterError;

/// キー一覧の1ページ分。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// このページのキー（辞書順）
    pub keys: Vec<String>,
    /// 続きがある場合の継続トークン
    pub next: Option<String>,
}

/// オブジェクトストアの抽象インターフェース。
///
/// 運用者はS3互換ストレージ（AWS S3, MinIO等）や
/// その他のストレージバックエンドを実装として選択できる。
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// `prefix` で始まるキーを1ページ分取得する。
    /// `continuation` には前ページの `next` を渡す。
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<KeyPage, ExporterError>;

    /// 署名付きダウンロードURL（GET）を生成する。
    async fn presign_get(&self, key: &str, expiry_secs: u32) -> Result<String, ExporterError>;
}
