use super::models::{NotificationJob, Notifier};
use futures::future::join_all;

/// 収集済みの通知ジョブをすべて配信する
///
/// # 引数
/// * `notifier` - 通知クライアント
/// * `jobs` - コミット後に収集された通知ジョブ
///
/// # 戻り値
/// 送信失敗の概要（情報提供のみで、課金結果の成否には影響しない）
///
/// 各ジョブは並行に送信され、失敗はログに記録して続行する。
/// リトライは行わない。取りこぼした通知は同じ周期について
/// 再送されない（許容されたデータ損失）。
pub async fn dispatch_all<N: Notifier>(notifier: &N, jobs: Vec<NotificationJob>) -> Vec<String> {
    let sends = jobs.into_iter().map(|job| dispatch_one(notifier, job));

    join_all(sends).await.into_iter().flatten().collect()
}

/// 通知ジョブを1件配信する
async fn dispatch_one<N: Notifier>(notifier: &N, job: NotificationJob) -> Option<String> {
    let (result, name) = match job {
        NotificationJob::Charged {
            chat_id,
            name,
            amount,
            next_date,
        } => (
            notifier
                .send_charged(&chat_id, &name, amount, next_date)
                .await,
            name,
        ),
        NotificationJob::Upcoming {
            chat_id,
            name,
            amount,
            due_date,
        } => (
            notifier
                .send_upcoming(&chat_id, &name, amount, due_date)
                .await,
            name,
        ),
    };

    match result {
        Ok(()) => None,
        Err(e) => {
            log::warn!("通知の送信に失敗しました（課金結果には影響しません）: {name} ({e})");
            Some(format!("❌ Notify failed: {name}"))
        }
    }
}
