pub mod features;
pub mod shared;

use features::notifications::telegram::TelegramNotifier;
use rusqlite::Connection;
use shared::config::environment::AppConfig;
use std::sync::Mutex;

/// アプリケーション状態（データベース接続と通知クライアントを保持）
pub struct AppState {
    pub db: Mutex<Connection>,
    pub notifier: TelegramNotifier,
    pub config: AppConfig,
}
