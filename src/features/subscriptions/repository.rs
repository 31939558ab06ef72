use super::models::{CreateSubscriptionDto, DueSubscription, Subscription, TimeUnit};
use crate::features::billing::recurrence;
use crate::features::expenses::models::NewExpense;
use crate::features::expenses::repository as expenses_repository;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::audit_timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

/// サブスクリプションを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - サブスクリプション作成用DTO
/// * `now` - 基準時刻（外部から注入する）
///
/// # 戻り値
/// 作成されたサブスクリプション、または失敗時はエラー
///
/// # 処理内容
/// 開始日が当日以前の場合は初回の経費レコードを即時に作成し、
/// 次回発生日を1周期先に設定する。開始日が未来の場合は経費を作らず、
/// 次回発生日を開始日そのものにする。どちらの場合も経費の挿入と
/// サブスクリプションの挿入は1つのトランザクションで確定する。
pub fn create(
    conn: &Connection,
    dto: CreateSubscriptionDto,
    now: DateTime<Utc>,
) -> AppResult<Subscription> {
    validate_create_dto(&dto)?;

    let today = now.date_naive();
    let starts_at = dto.starts_at.unwrap_or(today);
    let should_charge_now = starts_at <= today;

    let timestamp = audit_timestamp(now);
    let tx = conn.unchecked_transaction()?;

    let next_run = if should_charge_now {
        // 初回分を即時課金してから、開始日を起点に1周期先へ進める
        expenses_repository::insert(
            &tx,
            &NewExpense {
                user_id: dto.user_id.clone(),
                concept: format!("🔄 {}", dto.name),
                amount: dto.amount,
                category: dto.category.clone(),
                expense_date: starts_at,
                is_recurring: true,
            },
            now,
        )?;

        recurrence::next_occurrence_from_raw(&dto.time_unit, dto.frequency_value, starts_at)
    } else {
        starts_at
    };

    tx.execute(
        "INSERT INTO subscriptions
            (user_id, name, amount, category, frequency_value, time_unit,
             next_run, starts_at, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)",
        params![
            dto.user_id,
            dto.name,
            dto.amount,
            dto.category,
            dto.frequency_value,
            dto.time_unit,
            next_run,
            starts_at,
            timestamp,
            timestamp
        ],
    )?;

    let id = tx.last_insert_rowid();
    tx.commit()?;

    find_by_id(conn, id)
}

/// IDでサブスクリプションを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - サブスクリプションID
///
/// # 戻り値
/// サブスクリプション、または失敗時はエラー
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Subscription> {
    conn.query_row(
        "SELECT id, user_id, name, amount, category, frequency_value, time_unit,
                next_run, starts_at, is_active, created_at, updated_at
         FROM subscriptions WHERE id = ?1",
        params![id],
        map_subscription_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::NotFound(format!("ID {id} のサブスクリプションが見つかりません"))
        }
        _ => AppError::Database(e),
    })
}

/// ユーザーのサブスクリプション一覧を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - 所有ユーザーID
/// * `active_only` - アクティブなサブスクリプションのみを取得するか
///
/// # 戻り値
/// サブスクリプションのリスト、または失敗時はエラー
pub fn find_all(
    conn: &Connection,
    user_id: &str,
    active_only: bool,
) -> AppResult<Vec<Subscription>> {
    let query = if active_only {
        "SELECT id, user_id, name, amount, category, frequency_value, time_unit,
                next_run, starts_at, is_active, created_at, updated_at
         FROM subscriptions WHERE user_id = ?1 AND is_active = 1 ORDER BY name"
    } else {
        "SELECT id, user_id, name, amount, category, frequency_value, time_unit,
                next_run, starts_at, is_active, created_at, updated_at
         FROM subscriptions WHERE user_id = ?1 ORDER BY name"
    };

    let mut stmt = conn.prepare(query)?;
    let subscriptions = stmt.query_map(params![user_id], map_subscription_row)?;

    subscriptions
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// サブスクリプションのアクティブ状態を切り替える
///
/// 履歴となる経費から参照され得るため物理削除はせず、
/// 一時停止/再開はこの切り替えで表現する。
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - サブスクリプションID
/// * `now` - 基準時刻
///
/// # 戻り値
/// 更新されたサブスクリプション、または失敗時はエラー
pub fn toggle_status(conn: &Connection, id: i64, now: DateTime<Utc>) -> AppResult<Subscription> {
    let rows_affected = conn.execute(
        "UPDATE subscriptions SET is_active = NOT is_active, updated_at = ?1 WHERE id = ?2",
        params![audit_timestamp(now), id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のサブスクリプションが見つかりません"
        )));
    }

    find_by_id(conn, id)
}

/// 期日が到来したサブスクリプションを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `today` - 基準日（この日以前のnext_runが期日扱い、境界を含む）
///
/// # 戻り値
/// 課金処理に必要な情報をすべて含むビューのリスト、または失敗時はエラー
pub fn find_due_now(conn: &Connection, today: NaiveDate) -> AppResult<Vec<DueSubscription>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.user_id, s.name, s.amount, s.category,
                s.frequency_value, s.time_unit, s.next_run, u.telegram_chat_id
         FROM subscriptions s
         LEFT JOIN users u ON u.id = s.user_id
         WHERE s.is_active = 1 AND s.next_run <= ?1",
    )?;

    let due = stmt.query_map(params![today], map_due_subscription_row)?;

    due.collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// 指定日に期日を迎えるサブスクリプションを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `target_day` - 対象日
///
/// # 戻り値
/// ビューのリスト、または失敗時はエラー
///
/// 単日の正確なウィンドウで取得するため、リマインドは周期ごとに
/// ちょうど1回だけ送られる。next_runは日付単位で格納しているので、
/// 当日開始〜当日終了のウィンドウは等価比較になる。
pub fn find_due_soon(conn: &Connection, target_day: NaiveDate) -> AppResult<Vec<DueSubscription>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.user_id, s.name, s.amount, s.category,
                s.frequency_value, s.time_unit, s.next_run, u.telegram_chat_id
         FROM subscriptions s
         LEFT JOIN users u ON u.id = s.user_id
         WHERE s.is_active = 1 AND s.next_run = ?1",
    )?;

    let upcoming = stmt.query_map(params![target_day], map_due_subscription_row)?;

    upcoming
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// サブスクリプションの次回発生日を前進させる
///
/// 課金処理のトランザクション内で経費の挿入と組み合わせて使用する。
///
/// # 引数
/// * `conn` - データベース接続（通常はトランザクション）
/// * `id` - サブスクリプションID
/// * `new_next_run` - 新しい次回発生日
/// * `now` - 基準時刻
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn advance(
    conn: &Connection,
    id: i64,
    new_next_run: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let rows_affected = conn.execute(
        "UPDATE subscriptions SET next_run = ?1, updated_at = ?2 WHERE id = ?3",
        params![new_next_run, audit_timestamp(now), id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のサブスクリプションが見つかりません"
        )));
    }

    Ok(())
}

/// 作成用DTOを検証する
///
/// 未知の間隔単位は作成時点で拒否する。計算時の30日フォールバックは
/// 既存データの不正な値に対する縮退動作であり、新規作成の入り口では
/// 使わない。
fn validate_create_dto(dto: &CreateSubscriptionDto) -> AppResult<()> {
    if dto.name.trim().is_empty() {
        return Err(AppError::validation("サブスクリプション名が空です"));
    }
    if dto.amount <= 0.0 {
        return Err(AppError::validation("金額は0より大きい必要があります"));
    }
    if dto.frequency_value < 1 {
        return Err(AppError::validation("間隔値は1以上である必要があります"));
    }
    if TimeUnit::parse(&dto.time_unit).is_none() {
        return Err(AppError::validation(format!(
            "未知の間隔単位です: {}",
            dto.time_unit
        )));
    }

    Ok(())
}

/// 行をSubscriptionにマッピングする
fn map_subscription_row(row: &Row<'_>) -> Result<Subscription, rusqlite::Error> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        frequency_value: row.get(5)?,
        time_unit: row.get(6)?,
        next_run: row.get(7)?,
        starts_at: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// 行をDueSubscriptionにマッピングする
fn map_due_subscription_row(row: &Row<'_>) -> Result<DueSubscription, rusqlite::Error> {
    Ok(DueSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        frequency_value: row.get(5)?,
        time_unit: row.get(6)?,
        next_run: row.get(7)?,
        telegram_chat_id: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_tables;
    use chrono::TimeZone;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, name, telegram_chat_id) VALUES ('user-1', 'テストユーザー', '12345')",
            [],
        )
        .unwrap();
        conn
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn dto(name: &str, starts_at: Option<NaiveDate>) -> CreateSubscriptionDto {
        CreateSubscriptionDto {
            user_id: "user-1".to_string(),
            name: name.to_string(),
            amount: 9.99,
            category: "エンタメ".to_string(),
            frequency_value: 1,
            time_unit: "month".to_string(),
            starts_at,
        }
    }

    #[test]
    fn test_create_with_immediate_charge() {
        let conn = setup();

        // 開始日が当日の場合、初回の経費が即時に作成される
        let sub = create(&conn, dto("Netflix", None), now()).unwrap();

        assert_eq!(sub.next_run, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert!(sub.is_active);

        let expense_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(expense_count, 1, "初回の経費が作成されていません");

        let (concept, is_recurring): (String, i64) = conn
            .query_row(
                "SELECT concept, is_recurring FROM expenses LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(concept, "🔄 Netflix");
        assert_eq!(is_recurring, 1);
    }

    #[test]
    fn test_create_with_deferred_start() {
        let conn = setup();

        // 開始日が未来の場合、経費は作られず次回発生日は開始日になる
        let starts_at = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let sub = create(&conn, dto("Spotify", Some(starts_at)), now()).unwrap();

        assert_eq!(sub.next_run, starts_at);

        let expense_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(expense_count, 0, "未来開始なのに経費が作成されています");
    }

    #[test]
    fn test_create_rejects_invalid_dto() {
        let conn = setup();

        let mut invalid = dto("", None);
        assert!(matches!(
            create(&conn, invalid, now()),
            Err(AppError::Validation(_))
        ));

        invalid = dto("Netflix", None);
        invalid.amount = 0.0;
        assert!(matches!(
            create(&conn, invalid, now()),
            Err(AppError::Validation(_))
        ));

        invalid = dto("Netflix", None);
        invalid.frequency_value = 0;
        assert!(matches!(
            create(&conn, invalid, now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_create_rejects_unknown_time_unit() {
        let conn = setup();

        // 未知の間隔単位は作成時点で拒否され、一切の書き込みが起きない
        let mut invalid = dto("Netflix", None);
        invalid.time_unit = "fortnight".to_string();
        assert!(matches!(
            create(&conn, invalid, now()),
            Err(AppError::Validation(_))
        ));

        let subscription_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(subscription_count, 0, "不正な単位のサブスクリプションが作成されています");

        let expense_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(expense_count, 0, "不正な単位なのに経費が作成されています");
    }

    #[test]
    fn test_find_due_now_filters() {
        let conn = setup();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        // 期日到来（当日）、期日超過、未来、非アクティブの4件を用意する
        conn.execute_batch(
            "INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '当日', 9.99, 'c', 1, 'month', '2024-03-01', '2024-01-01', 1, 't', 't');
             INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '超過', 5.00, 'c', 1, 'month', '2024-02-15', '2024-01-01', 1, 't', 't');
             INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '未来', 3.00, 'c', 1, 'month', '2024-03-02', '2024-01-01', 1, 't', 't');
             INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '停止中', 7.00, 'c', 1, 'month', '2024-02-01', '2024-01-01', 0, 't', 't');",
        )
        .unwrap();

        let due = find_due_now(&conn, today).unwrap();
        let names: Vec<&str> = due.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(due.len(), 2);
        assert!(names.contains(&"当日"));
        assert!(names.contains(&"超過"));

        // ビューが通知先チャットIDまで含んでいることを確認
        assert_eq!(due[0].telegram_chat_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_find_due_soon_exact_window() {
        let conn = setup();
        let target = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        // 対象日ちょうど、前日、翌日の3件を用意する
        conn.execute_batch(
            "INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '対象日', 9.99, 'c', 1, 'month', '2024-03-03', '2024-01-01', 1, 't', 't');
             INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '前日', 5.00, 'c', 1, 'month', '2024-03-02', '2024-01-01', 1, 't', 't');
             INSERT INTO subscriptions (user_id, name, amount, category, frequency_value, time_unit, next_run, starts_at, is_active, created_at, updated_at)
             VALUES ('user-1', '翌日', 3.00, 'c', 1, 'month', '2024-03-04', '2024-01-01', 1, 't', 't');",
        )
        .unwrap();

        let upcoming = find_due_soon(&conn, target).unwrap();

        assert_eq!(upcoming.len(), 1, "単日ウィンドウが正確ではありません");
        assert_eq!(upcoming[0].name, "対象日");
    }

    #[test]
    fn test_toggle_status() {
        let conn = setup();
        let sub = create(&conn, dto("Netflix", None), now()).unwrap();

        let paused = toggle_status(&conn, sub.id, now()).unwrap();
        assert!(!paused.is_active);

        // 停止中は期日到来扱いにならない
        let due = find_due_now(&conn, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap();
        assert!(due.is_empty());

        let resumed = toggle_status(&conn, sub.id, now()).unwrap();
        assert!(resumed.is_active);
    }

    #[test]
    fn test_advance() {
        let conn = setup();
        let sub = create(&conn, dto("Netflix", None), now()).unwrap();

        let new_next_run = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        advance(&conn, sub.id, new_next_run, now()).unwrap();

        let updated = find_by_id(&conn, sub.id).unwrap();
        assert_eq!(updated.next_run, new_next_run);
    }

    #[test]
    fn test_advance_missing_subscription() {
        let conn = setup();

        let result = advance(
            &conn,
            999,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            now(),
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
