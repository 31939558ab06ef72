/// 定期実行トリガー機能モジュール
///
/// 外部スケジューラからの認証付きHTTP呼び出しを受け付け、
/// 課金サイクルを起動します。認証は共有シークレットの
/// Bearerトークンで行います。
pub mod server;

pub use server::serve;
