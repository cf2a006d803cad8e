//! # Data Exporter
//!
//! データセットのエディション単位で、オブジェクトストア上のファイルの
//! 有効期限付き署名付きダウンロードURLを発行するゲートウェイ。
//!
//! ## 役割
//! - メタデータサービスからのデータセット・エディション情報の取得（呼び出し元トークンを転送）
//! - アクセス権と所有者判定によるダウンロード可否の判定
//! - キープレフィックス配下の全オブジェクトの署名付きURL発行
//!
//! ## API エンドポイント
//! - `GET /{dataset}/{version}/{edition}`: 認証付き署名付きリンク発行
//! - `GET /public/{dataset}/{version}/{edition}`: 公開データセットの署名付きリンク発行

mod auth;
mod config;
mod endpoints;
mod error;
mod links;
mod metadata;
mod policy;
mod prefix;
mod storage;

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::routing::get;

use crate::auth::{HttpAuthorizer, OwnerAuthorizer};
use crate::config::{ExporterConfig, ExporterState, LINK_TTL_SECS};
use crate::metadata::HttpMetadataClient;
use crate::policy::AccessPolicy;
use crate::storage::ObjectStore;

// ---------------------------------------------------------------------------
// ルーター
// ---------------------------------------------------------------------------

/// 全レスポンスにCORSヘッダを付与する。
async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// axumルーターを構築する。
fn build_router(state: Arc<ExporterState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/{dataset}/{version}/{edition}",
            get(endpoints::handle_export),
        )
        .route(
            "/public/{dataset}/{version}/{edition}",
            get(endpoints::handle_export_public),
        )
        .layer(axum::middleware::map_response(allow_any_origin))
        .with_state(state)
}

#[cfg(feature = "vendor-aws")]
fn build_object_store(config: &ExporterConfig) -> anyhow::Result<Box<dyn ObjectStore>> {
    Ok(Box::new(storage::S3ObjectStore::from_env(&config.bucket)?))
}

#[cfg(not(feature = "vendor-aws"))]
fn build_object_store(_config: &ExporterConfig) -> anyhow::Result<Box<dyn ObjectStore>> {
    anyhow::bail!("オブジェクトストア実装が無効です（vendor-aws featureが必要）")
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // 設定は起動時に一度だけ読み込む
    let config = ExporterConfig::from_env()?;

    let http_client = reqwest::Client::new();
    let metadata = HttpMetadataClient::new(http_client.clone(), config.metadata_api.clone());
    let authorizer = config.authorizer_api.as_ref().map(|base_url| {
        Box::new(HttpAuthorizer::new(http_client.clone(), base_url.clone()))
            as Box<dyn OwnerAuthorizer>
    });
    let object_store = build_object_store(&config)?;

    let policy = AccessPolicy::new(config.enable_auth);
    if !policy.enforces_ownership() {
        tracing::warn!("ENABLE_AUTHが無効です。非公開データセットの所有者チェックを行いません（検証環境用）");
    }

    tracing::info!(
        metadata_api = %config.metadata_api,
        bucket = %config.bucket,
        enable_auth = config.enable_auth,
        "Exporter設定"
    );

    let state = Arc::new(ExporterState {
        metadata: Box::new(metadata),
        authorizer,
        object_store,
        policy,
        link_ttl_secs: LINK_TTL_SECS,
    });

    let app = build_router(state);

    tracing::info!("Exporterを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
