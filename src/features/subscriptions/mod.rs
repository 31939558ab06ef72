/// サブスクリプション機能モジュール
///
/// このモジュールは、定期課金の定義に関連する機能を提供します：
/// - サブスクリプションの作成（開始日が到来済みなら初回課金も同一トランザクションで実行）
/// - 有効/無効の切り替え（物理削除はしない）
/// - 期日到来分・期日間近分の解決クエリ
/// - 課金処理後の次回発生日の前進
pub mod models;
pub mod repository;

pub use models::{CreateSubscriptionDto, DueSubscription, Subscription, TimeUnit};
