use super::recurrence;
use crate::features::expenses::models::NewExpense;
use crate::features::expenses::repository as expenses_repository;
use crate::features::subscriptions::models::DueSubscription;
use crate::features::subscriptions::repository as subscriptions_repository;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use crate::shared::errors::AppResult;

/// 期日到来サブスクリプション1件を課金処理する
///
/// # 引数
/// * `conn` - データベース接続
/// * `subscription` - find_due_nowで取得した課金対象
/// * `now` - 基準時刻（処理時刻として記録される）
///
/// # 戻り値
/// 新しい次回発生日、または失敗時はエラー
///
/// # 処理内容
/// 1つのトランザクション内で
/// 1. 経費レコードを挿入する。expense_dateは支払対象の周期日
///    （subscription.next_run）であり「今日」ではない。
/// 2. 次回発生日を再計算してサブスクリプションを前進させる。
/// 両方が確定するか、どちらも確定しないかのいずれかになる。途中で
/// 失敗した場合、サブスクリプションは期日到来のまま残り、次回の
/// 実行で自動的に再試行される。
pub fn materialize(
    conn: &Connection,
    subscription: &DueSubscription,
    now: DateTime<Utc>,
) -> AppResult<NaiveDate> {
    let new_next_run = recurrence::next_occurrence_from_raw(
        &subscription.time_unit,
        subscription.frequency_value,
        subscription.next_run,
    );

    let tx = conn.unchecked_transaction()?;

    expenses_repository::insert(
        &tx,
        &NewExpense {
            user_id: subscription.user_id.clone(),
            concept: format!("🔄 {}", subscription.name),
            amount: subscription.amount,
            category: subscription.category.clone(),
            expense_date: subscription.next_run,
            is_recurring: true,
        },
        now,
    )?;

    subscriptions_repository::advance(&tx, subscription.id, new_next_run, now)?;

    tx.commit()?;

    Ok(new_next_run)
}
