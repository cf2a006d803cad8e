//! # キープレフィックス解決
//!
//! データセット・エディションからオブジェクトストアのキープレフィックスを導出する。
//!
//! 形式: `processed/<tier>/[<parentId>/]<datasetId>/version=<version>/edition=<editionId>/`
//!
//! プレフィックスは一覧取得時の単純な前方一致にのみ使う。

use exporter_types::{DatasetRecord, EditionRecord};

use crate::error::ExporterError;

/// エクスポート対象オブジェクトのルート階層。
const PROCESSED_ROOT: &str = "processed";

/// エディションIDの構成要素。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditionParts<'a> {
    /// データセットID
    pub dataset_id: &'a str,
    /// バージョン
    pub version: &'a str,
    /// エディションID
    pub edition_id: &'a str,
}

impl<'a> EditionParts<'a> {
    /// `<datasetId>/<version>/<editionId>` を3つの空でない要素に分割する。
    pub fn parse(id: &'a str) -> Result<Self, ExporterError> {
        let mut parts = id.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(dataset_id), Some(version), Some(edition_id), None)
                if !dataset_id.is_empty() && !version.is_empty() && !edition_id.is_empty() =>
            {
                Ok(Self {
                    dataset_id,
                    version,
                    edition_id,
                })
            }
            _ => Err(ExporterError::MalformedEdition(id.to_string())),
        }
    }

    /// リクエストされた `dataset/version/edition` と一致するか。
    pub fn matches(&self, dataset_id: &str, version: &str, edition_id: &str) -> bool {
        self.dataset_id == dataset_id && self.version == version && self.edition_id == edition_id
    }
}

/// データセット・エディションからキープレフィックスを導出する。
pub fn resolve(dataset: &DatasetRecord, edition: &EditionRecord) -> Result<String, ExporterError> {
    let parts = EditionParts::parse(&edition.id)?;
    let tier = dataset.access_rights.tier();

    let dataset_path = match dataset.parent_id.as_deref().filter(|p| !p.is_empty()) {
        Some(parent_id) => format!("{}/{}", parent_id, parts.dataset_id),
        None => parts.dataset_id.to_string(),
    };

    Ok(format!(
        "{PROCESSED_ROOT}/{tier}/{dataset_path}/version={}/edition={}/",
        parts.version, parts.edition_id
    ))
}
