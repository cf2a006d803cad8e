//! # 署名付きリンク発行
//!
//! プレフィックス配下のキーを全ページ分一覧し、キーごとに
//! 有効期限付きの署名付きダウンロードURLを生成する。

use exporter_types::SignedLink;

use crate::error::ExporterError;
use crate::storage::ObjectStore;

/// `prefix` 配下の全オブジェクトの署名付きリンクを発行する。
///
/// 一覧の順序（キーの辞書順）を保ったままページを連結する。
/// 該当キーが無い場合は空の一覧を返す。
pub async fn issue_links(
    store: &dyn ObjectStore,
    prefix: &str,
    ttl_secs: u32,
) -> Result<Vec<SignedLink>, ExporterError> {
    let mut keys = Vec::new();
    let mut continuation = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_page(prefix, continuation.take()).await?;
        pages += 1;
        keys.extend(page.keys);
        match page.next {
            Some(next) => continuation = Some(next),
            None => break,
        }
    }

    tracing::debug!(prefix = %prefix, pages, objects = keys.len(), "オブジェクト一覧を取得");

    let mut links = Vec::with_capacity(keys.len());
    for key in keys {
        let url = store.presign_get(&key, ttl_secs).await?;
        links.push(SignedLink { key, url });
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::config::LINK_TTL_SECS;
    use crate::endpoints::test_helpers::MockObjectStore;

    const PREFIX: &str = "processed/green/pop-proj/version=1/edition=20191003/";

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{PREFIX}{i}.json")).collect()
    }

    /// N件のオブジェクトからN件のリンクが発行され、各URLが対応するキーを指すことを確認
    #[tokio::test]
    async fn test_one_link_per_object() {
        let mut stored = keys(10);
        stored.push("processed/green/pop-proj/version=1/edition=20191004/0.json".to_string());
        stored.push("processed/red/pop-proj/version=1/edition=20191003/0.json".to_string());
        let store = MockObjectStore::new(stored);

        let links = issue_links(&store, PREFIX, LINK_TTL_SECS).await.unwrap();

        assert_eq!(links.len(), 10);
        for link in &links {
            assert!(link.key.starts_with(PREFIX));
            assert!(link.url.contains(&link.key));
        }
        assert!(links[0].key.ends_with("0.json"));
        assert_eq!(store.presign_calls.load(Ordering::SeqCst), 10);
        assert!(store
            .expiries
            .lock()
            .unwrap()
            .values()
            .all(|ttl| *ttl == LINK_TTL_SECS));
    }

    /// 複数ページにまたがる一覧が順序を保って連結されることを確認
    #[tokio::test]
    async fn test_pagination_is_aggregated_in_order() {
        let mut stored = keys(25);
        stored.sort();
        let store = MockObjectStore::new(stored.clone()).with_page_size(10);

        let links = issue_links(&store, PREFIX, 60).await.unwrap();

        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);
        let got: Vec<String> = links.into_iter().map(|l| l.key).collect();
        assert_eq!(got, stored);
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let store = MockObjectStore::new(Vec::new());
        let links = issue_links(&store, PREFIX, LINK_TTL_SECS).await.unwrap();
        assert!(links.is_empty());
        assert_eq!(store.presign_calls.load(Ordering::SeqCst), 0);
    }
}
