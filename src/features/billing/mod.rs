/// 課金実行機能モジュール
///
/// このモジュールは、定期課金エンジンの中核を提供します：
/// - 次回発生日の計算（カレンダー準拠、単一の正となる実装）
/// - 期日到来分の課金処理（経費の挿入と次回発生日の前進を1トランザクションで実行）
/// - 課金サイクルのオーケストレーション（件単位の失敗隔離と実行レポート）
pub mod materializer;
pub mod orchestrator;
pub mod recurrence;
pub mod report;


pub use orchestrator::{run_billing_cycle, REMINDER_LEAD_DAYS};
pub use report::{FailedCharge, RunReport};
