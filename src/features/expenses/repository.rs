use super::models::{Expense, NewExpense};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::audit_timestamp;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

/// 経費を挿入する
///
/// # 引数
/// * `conn` - データベース接続（課金処理ではトランザクションを渡す）
/// * `new_expense` - 経費作成用データ
/// * `now` - 基準時刻（処理時刻として記録される）
///
/// # 戻り値
/// 挿入された経費のID、または失敗時はエラー
pub fn insert(conn: &Connection, new_expense: &NewExpense, now: DateTime<Utc>) -> AppResult<i64> {
    let timestamp = audit_timestamp(now);

    conn.execute(
        "INSERT INTO expenses
            (user_id, concept, amount, category, date, expense_date, is_recurring, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new_expense.user_id,
            new_expense.concept,
            new_expense.amount,
            new_expense.category,
            timestamp,
            new_expense.expense_date,
            new_expense.is_recurring as i64,
            timestamp
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// IDで経費を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - 経費ID
///
/// # 戻り値
/// 経費、または失敗時はエラー
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Expense> {
    conn.query_row(
        "SELECT id, user_id, concept, amount, category, date, expense_date, is_recurring, created_at
         FROM expenses WHERE id = ?1",
        params![id],
        map_expense_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found("経費"),
        _ => AppError::Database(e),
    })
}

/// ユーザーの経費一覧を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - 所有ユーザーID
///
/// # 戻り値
/// 発生日の降順で並んだ経費のリスト、または失敗時はエラー
pub fn find_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, concept, amount, category, date, expense_date, is_recurring, created_at
         FROM expenses WHERE user_id = ?1 ORDER BY expense_date DESC",
    )?;

    let expenses = stmt.query_map(params![user_id], map_expense_row)?;

    expenses
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::Database)
}

/// 行をExpenseにマッピングする
fn map_expense_row(row: &Row<'_>) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        concept: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        expense_date: row.get(6)?,
        is_recurring: row.get::<_, i64>(7)? != 0,
        created_at: row.get(8)?,
    })
}
