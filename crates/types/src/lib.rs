//! # Data Exporter 共有型定義
//!
//! メタデータサービスが返すデータセット・エディションのレコードと、
//! エクスポートAPIのレスポンス型をRust構造体として提供する。
//!
//! ## 正規化規則
//! - メタデータサービスのJSON（`Id`, `accessRights`, `_links` 等）は
//!   `*Metadata` 構造体で受け取り、`*Record` に正規化してから使う。
//! - 旧形式の `confidentiality`（green/yellow/red）は `AccessRights` に読み替える。

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// アクセス権
// ---------------------------------------------------------------------------

/// データセットのアクセス権。
///
/// `restricted` と `non-public` はダウンロード可否の判定上は同一に扱われるが、
/// オブジェクトストアのキー階層（tier）は異なる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessRights {
    /// 公開データセット（認証不要）
    Public,
    /// 制限付きデータセット
    Restricted,
    /// 非公開データセット
    NonPublic,
}

impl AccessRights {
    /// `accessRights` の値をパースする。
    pub fn from_access_rights(value: &str) -> Result<Self, RecordError> {
        match value {
            "public" => Ok(Self::Public),
            "restricted" => Ok(Self::Restricted),
            "non-public" => Ok(Self::NonPublic),
            other => Err(RecordError::UnknownAccessRights(other.to_string())),
        }
    }

    /// 旧形式の `confidentiality` の値をパースする。
    pub fn from_confidentiality(value: &str) -> Result<Self, RecordError> {
        match value {
            "green" => Ok(Self::Public),
            "yellow" => Ok(Self::Restricted),
            "red" => Ok(Self::NonPublic),
            other => Err(RecordError::UnknownAccessRights(other.to_string())),
        }
    }

    /// オブジェクトストアのキー階層で使うtierタグ。
    pub fn tier(self) -> &'static str {
        match self {
            Self::Public => "green",
            Self::Restricted => "yellow",
            Self::NonPublic => "red",
        }
    }

    /// 公開データセットかどうか。
    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl std::fmt::Display for AccessRights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
            Self::NonPublic => "non-public",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// 正規化エラー
// ---------------------------------------------------------------------------

/// メタデータレコードの正規化エラー。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// `accessRights` も `confidentiality` も存在しない
    #[error("データセット {0} にアクセス権が設定されていません")]
    MissingAccessRights(String),
    /// 未知のアクセス権値
    #[error("未知のアクセス権: {0}")]
    UnknownAccessRights(String),
    /// JSONの構造が不正
    #[error("メタデータのデコードに失敗: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// データセット
// ---------------------------------------------------------------------------

/// メタデータサービスが返すデータセットJSON（必要なフィールドのみ）。
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetMetadata {
    /// データセットID
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    /// アクセス権（public / restricted / non-public）
    #[serde(rename = "accessRights", default)]
    pub access_rights: Option<String>,
    /// 旧形式の機密区分（green / yellow / red）
    #[serde(default)]
    pub confidentiality: Option<String>,
    /// 派生データセットの親ID
    #[serde(rename = "parent_id", alias = "parentId", default)]
    pub parent_id: Option<String>,
}

/// 正規化済みデータセットレコード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    /// データセットID
    pub id: String,
    /// アクセス権
    pub access_rights: AccessRights,
    /// 親データセットID（空文字列は `None` に正規化）
    pub parent_id: Option<String>,
}

impl DatasetRecord {
    /// メタデータサービスのJSONから正規化済みレコードを構築する。
    pub fn from_json(value: serde_json::Value) -> Result<Self, RecordError> {
        let metadata: DatasetMetadata =
            serde_json::from_value(value).map_err(|e| RecordError::Decode(e.to_string()))?;
        Self::try_from(metadata)
    }
}

impl TryFrom<DatasetMetadata> for DatasetRecord {
    type Error = RecordError;

    fn try_from(metadata: DatasetMetadata) -> Result<Self, Self::Error> {
        // accessRightsを優先し、無い場合のみconfidentialityを見る
        let access_rights = match (&metadata.access_rights, &metadata.confidentiality) {
            (Some(value), _) => AccessRights::from_access_rights(value)?,
            (None, Some(value)) => AccessRights::from_confidentiality(value)?,
            (None, None) => return Err(RecordError::MissingAccessRights(metadata.id)),
        };

        Ok(Self {
            id: metadata.id,
            access_rights,
            parent_id: metadata.parent_id.filter(|p| !p.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// エディション
// ---------------------------------------------------------------------------

/// HALリンク。
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    /// リンク先
    pub href: String,
}

/// エディションJSONの `_links`。
#[derive(Debug, Clone, Deserialize)]
pub struct EditionLinks {
    /// 自身へのリンク
    #[serde(rename = "self")]
    pub self_link: Link,
}

/// メタデータサービスが返すエディションJSON（必要なフィールドのみ）。
#[derive(Debug, Clone, Deserialize)]
pub struct EditionMetadata {
    /// `<datasetId>/<version>/<editionId>` 形式のID
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    /// HALリンク
    #[serde(rename = "_links")]
    pub links: EditionLinks,
}

/// 正規化済みエディションレコード。
///
/// `id` の3分割はキープレフィックス解決時に検証する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionRecord {
    /// `<datasetId>/<version>/<editionId>` 形式のID
    pub id: String,
    /// ディストリビューション探索に使う自己リンク
    pub self_link: String,
}

impl EditionRecord {
    /// メタデータサービスのJSONから正規化済みレコードを構築する。
    pub fn from_json(value: serde_json::Value) -> Result<Self, RecordError> {
        let metadata: EditionMetadata =
            serde_json::from_value(value).map_err(|e| RecordError::Decode(e.to_string()))?;
        Ok(Self::from(metadata))
    }
}

impl From<EditionMetadata> for EditionRecord {
    fn from(metadata: EditionMetadata) -> Self {
        Self {
            id: metadata.id,
            self_link: metadata.links.self_link.href,
        }
    }
}

// ---------------------------------------------------------------------------
// レスポンス
// ---------------------------------------------------------------------------

/// 署名付きダウンロードリンク。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLink {
    /// オブジェクトキー
    pub key: String,
    /// 有効期限付きの署名付きURL（GET）
    pub url: String,
}

/// エラーレスポンスの共通エンベロープ。
///
/// `message` は固定文字列か、上流サービスのエラーボディそのもの。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// エラーメッセージ
    pub message: serde_json::Value,
}

impl ErrorBody {
    /// 文字列メッセージのエンベロープを作る。
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: serde_json::Value::String(message.into()),
        }
    }
}
