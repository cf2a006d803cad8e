//! # アクセスポリシー
//!
//! 署名付きリンクを発行してよいかの判定。I/Oは行わない。
//!
//! ## 判定順序
//! 1. ディストリビューションが無ければ404（呼び出し元に関係なく同じ結果）
//! 2. 公開データセットなら許可
//! 3. 所有者チェック無効なら許可
//! 4. 所有者なら許可、それ以外は拒否
//!
//! `restricted` と `non-public` は区別しない。

use exporter_types::{AccessRights, EditionRecord};

use crate::error::ExporterError;

/// ポリシーの判定結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 発行を許可
    Allow,
    /// 発行を拒否
    Deny,
}

/// デプロイ設定に基づくアクセスポリシー。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// 非公開データセットに所有者チェックを課すか
    enforce_ownership: bool,
}

impl AccessPolicy {
    /// 新しいポリシーを作成する。
    pub fn new(enforce_ownership: bool) -> Self {
        Self { enforce_ownership }
    }

    /// 所有者チェックが有効か。
    pub fn enforces_ownership(&self) -> bool {
        self.enforce_ownership
    }

    /// 所有者判定の結果が判定に影響するか。
    /// `false` の場合は所有者判定サービスを呼ばない。
    pub fn requires_owner_check(&self, access_rights: AccessRights) -> bool {
        !access_rights.is_public() && self.enforce_ownership
    }

    /// 認証付きエントリポイントの判定。
    pub fn decide(&self, access_rights: AccessRights, caller_is_owner: bool) -> Decision {
        if access_rights.is_public() || !self.enforce_ownership || caller_is_owner {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    /// 公開エントリポイントの判定。公開データセットのみ許可する。
    pub fn decide_public(access_rights: AccessRights) -> Decision {
        if access_rights.is_public() {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// ディストリビューションの存在を前提条件として確認する。
pub fn require_distributions(
    edition: &EditionRecord,
    has_distributions: bool,
) -> Result<(), ExporterError> {
    if has_distributions {
        Ok(())
    } else {
        Err(ExporterError::MissingData(edition.id.clone()))
    }
}
