//! # Exporter設定・共有状態
//!
//! 環境変数からの設定読み込みとExporterの共有状態の定義。
//! 設定は起動時に一度だけ構築し、ポリシー・プレフィックス解決には引数で渡す。

use crate::auth::OwnerAuthorizer;
use crate::metadata::MetadataClient;
use crate::policy::AccessPolicy;
use crate::storage::ObjectStore;

/// 署名付きURLの有効期限（秒）。運用ポリシー上の固定値。
pub const LINK_TTL_SECS: u32 = 300;

/// 起動時に環境変数から読み込む設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// エクスポート対象オブジェクトのバケット名
    pub bucket: String,
    /// メタデータサービスのベースURL
    pub metadata_api: String,
    /// 所有者判定サービスのベースURL
    pub authorizer_api: Option<String>,
    /// 非公開データセットの所有者チェックを有効にするか
    pub enable_auth: bool,
    /// 待ち受けアドレス
    pub bind_addr: String,
}

impl ExporterConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bucket = lookup("BUCKET").ok_or_else(|| anyhow::anyhow!("BUCKETが設定されていません"))?;
        let metadata_api = lookup("METADATA_API")
            .ok_or_else(|| anyhow::anyhow!("METADATA_APIが設定されていません"))?
            .trim_end_matches('/')
            .to_string();
        let authorizer_api = lookup("AUTHORIZER_API").map(|s| s.trim_end_matches('/').to_string());
        let enable_auth = lookup("ENABLE_AUTH").as_deref() == Some("true");
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        if enable_auth && authorizer_api.is_none() {
            anyhow::bail!("ENABLE_AUTH=trueの場合はAUTHORIZER_APIが必要です");
        }

        Ok(Self {
            bucket,
            metadata_api,
            authorizer_api,
            enable_auth,
            bind_addr,
        })
    }
}

/// Exporterの共有状態。
/// 起動後は不変で、リクエスト間で共有される。
pub struct ExporterState {
    /// メタデータサービスクライアント
    pub metadata: Box<dyn MetadataClient>,
    /// 所有者判定（所有者チェック無効時は `None` でもよい）
    pub authorizer: Option<Box<dyn OwnerAuthorizer>>,
    /// オブジェクトストア（S3互換等、トレイトで抽象化）
    pub object_store: Box<dyn ObjectStore>,
    /// アクセスポリシー
    pub policy: AccessPolicy,
    /// 署名付きURLの有効期限（秒）
    pub link_ttl_secs: u32,
}
