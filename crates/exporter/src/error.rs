//! # Exporter エラー型
//!
//! 全エンドポイントで共通のエラー型。
//! レスポンスは `{"message": ...}` エンベロープに統一する。

use axum::http::StatusCode;
use axum::Json;
use exporter_types::{ErrorBody, RecordError};

/// 想定外の失敗時にクライアントへ返す固定メッセージ。
pub const GENERIC_FAILURE: &str = "Could not complete request, please try again later";

/// Exporterエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// データセットが存在しない
    #[error("Could not find dataset")]
    DatasetNotFound,
    /// バージョン・エディションが存在しない
    #[error("Could not find version/edition")]
    EditionNotFound,
    /// エディションにディストリビューションが無い
    #[error("Missing data for {0}")]
    MissingData(String),
    /// ポリシーによる拒否（理由は返さない）
    #[error("Forbidden")]
    Forbidden,
    /// メタデータサービスが404以外の失敗ステータスを返した
    #[error("上流サービスがエラーを返しました: HTTP {status} - {body}")]
    Upstream {
        /// 上流のHTTPステータス
        status: u16,
        /// 上流のレスポンスボディ
        body: serde_json::Value,
    },
    /// エディションIDが `<dataset>/<version>/<edition>` に分割できない
    #[error("不正なエディションID: {0}")]
    MalformedEdition(String),
    /// メタデータレコードの正規化に失敗
    #[error("不正なメタデータ: {0}")]
    Metadata(#[from] RecordError),
    /// ストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl ExporterError {
    /// 想定外の失敗として500を返す。詳細はログにのみ出す。
    fn internal_response(&self) -> (StatusCode, ErrorBody) {
        tracing::error!(error = %self, "リクエスト処理に失敗");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::text(GENERIC_FAILURE),
        )
    }
}

impl axum::response::IntoResponse for ExporterError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            ExporterError::DatasetNotFound
            | ExporterError::EditionNotFound
            | ExporterError::MissingData(_) => {
                (StatusCode::NOT_FOUND, ErrorBody::text(self.to_string()))
            }
            ExporterError::Forbidden => (StatusCode::FORBIDDEN, ErrorBody::text("Forbidden")),
            ExporterError::Upstream { status, body } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() || code.is_server_error() => {
                    tracing::warn!(upstream_status = %code, "上流サービスのエラーを中継");
                    (
                        code,
                        ErrorBody {
                            message: body.clone(),
                        },
                    )
                }
                _ => self.internal_response(),
            },
            ExporterError::MalformedEdition(_)
            | ExporterError::Metadata(_)
            | ExporterError::Storage(_)
            | ExporterError::Internal(_) => self.internal_response(),
        };
        (status, Json(body)).into_response()
    }
}
