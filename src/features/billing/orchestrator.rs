use super::materializer;
use super::report::{FailedCharge, RunReport};
use crate::features::notifications::dispatcher;
use crate::features::notifications::models::{NotificationJob, Notifier};
use crate::features::subscriptions::models::DueSubscription;
use crate::features::subscriptions::repository as subscriptions_repository;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::Connection;
use std::sync::Mutex;

use crate::shared::errors::{AppError, AppResult};

/// リマインド通知を送る先行日数（固定ポリシー）
pub const REMINDER_LEAD_DAYS: u64 = 2;

/// 課金サイクルを1回実行する
///
/// # 引数
/// * `db` - データベース接続（排他ロック付き）
/// * `notifier` - 通知クライアント
/// * `now` - 基準時刻。再現可能でテスト可能な実行のため、エンジン内部では
///   システム時計を読まず、必ず外部から注入する。
///
/// # 戻り値
/// 実行レポート、またはインフラ由来の失敗時はエラー
///
/// # 処理内容
/// 1. 期日到来分を解決し、1件ずつ課金処理する（失敗は件単位で隔離され、
///    残りの処理は続行する）
/// 2. 先行日数後に期日を迎える分のリマインドを収集する（状態変更なし）
/// 3. コミット済みの変更に対してのみ、通知をまとめて配信する
///
/// # エラー
/// due 解決のクエリ失敗などインフラ由来の失敗のみがErrになる。
/// 件単位の課金失敗はレポートに記録され、next_runが前進しないため
/// 次回の外部トリガーで自動的に再試行される。リマインド対象の取得に
/// 失敗した場合もErrになるが、確定済みの課金に対する通知は
/// エラーを返す前に配信する。
pub async fn run_billing_cycle<N: Notifier>(
    db: &Mutex<Connection>,
    notifier: &N,
    now: DateTime<Utc>,
) -> AppResult<RunReport> {
    // DB作業と通知配信を分離する。ロックは配信前に必ず手放す。
    let (report, jobs, reminder_error) = {
        let conn = db.lock().map_err(|e| {
            AppError::concurrency(format!("データベースロックの取得に失敗しました: {e}"))
        })?;

        let (mut report, mut jobs) = charge_due(&conn, now)?;

        let target_day = now.date_naive() + Days::new(REMINDER_LEAD_DAYS);
        let reminder_error = match collect_reminders(&conn, target_day) {
            Ok((reminded, reminder_jobs)) => {
                report.reminded = reminded;
                jobs.extend(reminder_jobs);
                None
            }
            Err(e) => Some(e),
        };

        (report, jobs, reminder_error)
    };

    dispatch_and_report(notifier, report, jobs, reminder_error).await
}

/// 期日到来分を1件ずつ課金処理する
///
/// 通知ジョブは返すだけで送信しない。送信はすべての
/// トランザクションが確定した後に呼び出し元が行う。
fn charge_due(
    conn: &Connection,
    now: DateTime<Utc>,
) -> AppResult<(RunReport, Vec<NotificationJob>)> {
    let today = now.date_naive();
    let mut report = RunReport::default();
    let mut jobs = Vec::new();

    let due = subscriptions_repository::find_due_now(conn, today)?;
    log::info!("期日到来のサブスクリプション: {}件", due.len());

    for subscription in due {
        match materializer::materialize(conn, &subscription, now) {
            Ok(new_next_run) => {
                if let Some(chat_id) = &subscription.telegram_chat_id {
                    jobs.push(NotificationJob::Charged {
                        chat_id: chat_id.clone(),
                        name: subscription.name.clone(),
                        amount: subscription.amount,
                        next_date: new_next_run,
                    });
                }
                report.charged.push(subscription.name);
            }
            Err(e) => {
                // 件単位の失敗は隔離し、残りの処理を続行する
                log::error!(
                    "サブスクリプションの課金処理に失敗しました: {} ({})",
                    subscription.name,
                    e
                );
                report.failed.push(FailedCharge {
                    subscription_id: subscription.id,
                    name: subscription.name,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok((report, jobs))
}

/// 指定日に期日を迎える分のリマインド対象を収集する（状態変更なし）
fn collect_reminders(
    conn: &Connection,
    target_day: NaiveDate,
) -> AppResult<(Vec<String>, Vec<NotificationJob>)> {
    let upcoming = subscriptions_repository::find_due_soon(conn, target_day)?;

    let mut reminded = Vec::new();
    let mut jobs = Vec::new();

    for subscription in upcoming {
        if let Some(chat_id) = &subscription.telegram_chat_id {
            jobs.push(upcoming_job(&subscription, chat_id));
            reminded.push(subscription.name);
        }
    }

    Ok((reminded, jobs))
}

fn upcoming_job(subscription: &DueSubscription, chat_id: &str) -> NotificationJob {
    NotificationJob::Upcoming {
        chat_id: chat_id.to_string(),
        name: subscription.name.clone(),
        amount: subscription.amount,
        due_date: subscription.next_run,
    }
}

/// 収集済みの通知ジョブを配信し、実行結果を確定させる
///
/// リマインド対象の取得に失敗していた場合でも、確定済みの課金に
/// 対する通知ジョブは先に配信してからエラーを返す。課金の確定と
/// その通知の試行は切り離さない。
async fn dispatch_and_report<N: Notifier>(
    notifier: &N,
    mut report: RunReport,
    jobs: Vec<NotificationJob>,
    reminder_error: Option<AppError>,
) -> AppResult<RunReport> {
    report.notes = dispatcher::dispatch_all(notifier, jobs).await;

    if let Some(e) = reminder_error {
        log::error!("リマインド対象の取得に失敗しました（課金済み分の通知は配信済み）: {e}");
        return Err(e);
    }

    log::info!(
        "課金サイクルが完了しました: 課金={}件, リマインド={}件, 失敗={}件",
        report.charged.len(),
        report.reminded.len(),
        report.failed.len()
    );

    Ok(report)
}
