use crate::shared::config::environment::{get_database_filename, Environment};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::PathBuf;

/// データベース接続を初期化する
///
/// # 引数
/// * `env` - 実行環境
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. アプリケーションデータディレクトリの確保
/// 2. データベースファイルパスの決定
/// 3. データベース接続の開設
/// 4. テーブル作成の実行
pub fn initialize_database(env: &Environment) -> AppResult<Connection> {
    let database_path = get_database_path(env)?;

    let conn = Connection::open(&database_path)?;

    create_tables(&conn)?;

    log::info!("データベースを初期化しました: {:?}", database_path);

    Ok(conn)
}

/// アプリデータディレクトリ内のデータベースファイルパスを取得する
///
/// # 引数
/// * `env` - 実行環境
///
/// # 戻り値
/// データベースファイルのパス、または失敗時はエラー
pub fn get_database_path(env: &Environment) -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::configuration("データディレクトリの取得に失敗しました"))?
        .join("subscription-billing");

    // ディレクトリが存在しない場合は作成
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            AppError::configuration(format!("データディレクトリの作成に失敗: {e}"))
        })?;
        log::info!("アプリケーションデータディレクトリを作成: {:?}", data_dir);
    }

    Ok(data_dir.join(get_database_filename(env)))
}

/// データベーステーブルを作成する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    create_users_table(conn)?;
    create_subscriptions_table(conn)?;
    create_expenses_table(conn)?;
    create_indexes(conn)?;

    Ok(())
}

/// ユーザーテーブルを作成する
///
/// telegram_chat_id は通知チャネルの識別子で、未設定を許容する。
fn create_users_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            telegram_chat_id TEXT
        )",
        [],
    )
    .map_err(AppError::Database)?;

    Ok(())
}

/// サブスクリプションテーブルを作成する
///
/// time_unit に CHECK 制約は付けない。新規作成はリポジトリ側で検証し、
/// 既存データの不正な値は次回発生日の計算時にフォールバックで処理する。
fn create_subscriptions_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            frequency_value INTEGER NOT NULL DEFAULT 1,
            time_unit TEXT NOT NULL,
            next_run TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(AppError::Database)?;

    Ok(())
}

/// 経費テーブルを作成する
///
/// expense_date は支払対象の周期日（経済的な発生日）、
/// date は実際に処理した時刻を表す。
fn create_expenses_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            concept TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            expense_date TEXT NOT NULL,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(AppError::Database)?;

    Ok(())
}

/// インデックスを作成する
fn create_indexes(conn: &Connection) -> AppResult<()> {
    // due 解決クエリ用の複合インデックス
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_due
         ON subscriptions(is_active, next_run)",
        [],
    )
    .map_err(AppError::Database)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id)",
        [],
    )
    .map_err(AppError::Database)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_expense_date ON expenses(expense_date)",
        [],
    )
    .map_err(AppError::Database)?;

    Ok(())
}
