use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::NaiveDate;

/// 通知チャネルの抽象
///
/// 実装は送信失敗をErrで返すだけでよい。失敗の握りつぶしと
/// ログ記録は呼び出し側のディスパッチャが引き受ける。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 課金確定メッセージを送信する
    async fn send_charged(
        &self,
        chat_id: &str,
        name: &str,
        amount: f64,
        next_date: NaiveDate,
    ) -> AppResult<()>;

    /// 期日間近のリマインドメッセージを送信する
    async fn send_upcoming(
        &self,
        chat_id: &str,
        name: &str,
        amount: f64,
        due_date: NaiveDate,
    ) -> AppResult<()>;
}

/// コミット後に配信する通知ジョブ
///
/// 課金ループの最中には一切送信せず、トランザクションの確定後に
/// まとめて配信する。これにより「通知の失敗が確定済みの課金を
/// 巻き戻さない」契約が構造的に保証される。
#[derive(Debug, Clone)]
pub enum NotificationJob {
    /// 課金確定の通知
    Charged {
        chat_id: String,
        name: String,
        amount: f64,
        next_date: NaiveDate,
    },
    /// 期日間近のリマインド
    Upcoming {
        chat_id: String,
        name: String,
        amount: f64,
        due_date: NaiveDate,
    },
}
