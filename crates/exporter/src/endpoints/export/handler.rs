use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use exporter_types::{DatasetRecord, EditionRecord, SignedLink};
use serde::Deserialize;
use tracing::Instrument;

use crate::auth::BearerToken;
use crate::config::ExporterState;
use crate::error::ExporterError;
use crate::links::issue_links;
use crate::policy::{require_distributions, AccessPolicy, Decision};
use crate::prefix::{self, EditionParts};

/// パスパラメータ `/{dataset}/{version}/{edition}`。
#[derive(Debug, Clone, Deserialize)]
pub struct EditionPath {
    /// データセットID
    pub dataset: String,
    /// バージョン
    pub version: String,
    /// エディションID
    pub edition: String,
}

/// エントリポイントの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// 認証付き（所有者チェックを含むポリシー判定）
    Authenticated,
    /// 公開（公開データセットのみ、所有者判定は行わない）
    Public,
}

/// GET /{dataset}/{version}/{edition}: 認証付き署名付きリンク発行。
///
/// トークンが無い場合でも公開データセットは発行できる。
pub async fn handle_export(
    State(state): State<Arc<ExporterState>>,
    Path(path): Path<EditionPath>,
    headers: HeaderMap,
) -> Result<Json<Vec<SignedLink>>, ExporterError> {
    let credential = BearerToken::from_headers(&headers);
    let span = request_span(&path, EntryPoint::Authenticated);
    let links = run_export(&state, &path, credential.as_ref(), EntryPoint::Authenticated)
        .instrument(span)
        .await?;
    Ok(Json(links))
}

/// GET /public/{dataset}/{version}/{edition}: 公開データセットの署名付きリンク発行。
///
/// メタデータは未認証で参照し、公開データセット以外は403。
pub async fn handle_export_public(
    State(state): State<Arc<ExporterState>>,
    Path(path): Path<EditionPath>,
) -> Result<Json<Vec<SignedLink>>, ExporterError> {
    let span = request_span(&path, EntryPoint::Public);
    let links = run_export(&state, &path, None, EntryPoint::Public)
        .instrument(span)
        .await?;
    Ok(Json(links))
}

fn request_span(path: &EditionPath, entry: EntryPoint) -> tracing::Span {
    tracing::info_span!(
        "export",
        request_id = %uuid::Uuid::new_v4(),
        entry = ?entry,
        dataset_id = %path.dataset,
        version = %path.version,
        edition = %path.edition,
    )
}

/// リクエスト1件分の処理。
///
/// メタデータ取得 → ディストリビューション確認 → ポリシー判定 →
/// プレフィックス解決 → リンク発行 の順に進み、途中の失敗はそのまま返す。
pub(crate) async fn run_export(
    state: &ExporterState,
    path: &EditionPath,
    credential: Option<&BearerToken>,
    entry: EntryPoint,
) -> Result<Vec<SignedLink>, ExporterError> {
    // データセットとエディションは独立した読み取りなので並行に取得する。
    // エラーはデータセット側を優先して返す。
    let (dataset, edition) = tokio::join!(
        state.metadata.get_dataset(&path.dataset, credential),
        state
            .metadata
            .get_edition(&path.dataset, &path.version, &path.edition, credential),
    );
    let dataset = dataset.inspect_err(|e| tracing::info!(error = %e, "データセット取得失敗"))?;
    let edition = edition.inspect_err(|e| tracing::info!(error = %e, "エディション取得失敗"))?;
    ensure_requested(path, &dataset, &edition)?;

    tracing::info!(
        access_rights = %dataset.access_rights,
        edition_id = %edition.id,
        "メタデータを取得"
    );

    let has_distributions = state.metadata.has_distributions(&edition, credential).await?;
    require_distributions(&edition, has_distributions)
        .inspect_err(|_| tracing::info!("ディストリビューションがありません"))?;

    let decision = match entry {
        EntryPoint::Public => AccessPolicy::decide_public(dataset.access_rights),
        EntryPoint::Authenticated => {
            let caller_is_owner = if state.policy.requires_owner_check(dataset.access_rights) {
                owner_verdict(state, credential, &path.dataset).await?
            } else {
                false
            };
            state.policy.decide(dataset.access_rights, caller_is_owner)
        }
    };

    if decision == Decision::Deny {
        tracing::info!(
            access_rights = %dataset.access_rights,
            authenticated = credential.is_some(),
            "ポリシーにより拒否"
        );
        return Err(ExporterError::Forbidden);
    }

    let prefix = prefix::resolve(&dataset, &edition)?;
    tracing::info!(s3_prefix = %prefix, "キープレフィックスを解決");

    let links = issue_links(state.object_store.as_ref(), &prefix, state.link_ttl_secs).await?;
    tracing::info!(links = links.len(), "署名付きリンクを発行");

    Ok(links)
}

/// 取得したレコードがリクエストされたパスのものであることを確認する。
///
/// IDが食い違うレコードは存在しないものとして扱う。
fn ensure_requested(
    path: &EditionPath,
    dataset: &DatasetRecord,
    edition: &EditionRecord,
) -> Result<(), ExporterError> {
    if dataset.id != path.dataset {
        tracing::warn!(found = %dataset.id, "リクエストと異なるデータセットが返されました");
        return Err(ExporterError::DatasetNotFound);
    }
    let parts = EditionParts::parse(&edition.id)?;
    if !parts.matches(&path.dataset, &path.version, &path.edition) {
        tracing::warn!(found = %edition.id, "リクエストと異なるエディションが返されました");
        return Err(ExporterError::EditionNotFound);
    }
    Ok(())
}

/// 所有者判定。トークンが無ければ判定サービスを呼ばずに `false`。
async fn owner_verdict(
    state: &ExporterState,
    credential: Option<&BearerToken>,
    dataset_id: &str,
) -> Result<bool, ExporterError> {
    let Some(credential) = credential else {
        return Ok(false);
    };
    let authorizer = state.authorizer.as_ref().ok_or_else(|| {
        ExporterError::Internal("所有者判定サービスが設定されていません".to_string())
    })?;
    let is_owner = authorizer.is_owner(credential, dataset_id).await?;
    tracing::info!(is_owner, "所有者判定");
    Ok(is_owner)
}
