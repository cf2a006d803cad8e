//! # 署名付きリンク発行エンドポイント
//!
//! ## 処理フロー
//! 1. パスから dataset / version / edition、ヘッダからトークンを取得
//! 2. データセット・エディションをメタデータサービスから取得
//! 3. 取得したレコードのIDがパスと一致しなければ404
//! 4. ディストリビューションが無ければ404
//! 5. アクセスポリシー判定（公開エントリポイントは公開データセットのみ）
//! 6. キープレフィックスを解決し、配下の全オブジェクトの署名付きURLを発行
//!
//! ## エラー
//! - データセット/エディション無し: 404（固定メッセージ）
//! - ポリシー拒否: 403 "Forbidden"（理由は返さない）
//! - 上流エラー: 上流のステータスとボディを中継
//! - その他: 500（詳細はログのみ）

mod handler;


pub use handler::{handle_export, handle_export_public};
